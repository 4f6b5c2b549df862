use super::card::{Card, Color};
use super::player::{InputSource, TurnView};
use std::io::{self, BufRead, BufReader, Write};
use std::sync::{Arc, Mutex};

/// A line reader several console seats can take turns on.
pub type SharedInput = Arc<Mutex<Box<dyn BufRead + Send>>>;

/// Terminal input for a local human. End of input counts as leaving.
pub struct ConsoleUI {
    input: SharedInput,
    output: Box<dyn Write + Send>,
}

impl Default for ConsoleUI {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleUI {
    pub fn new() -> Self {
        Self::sharing(Self::stdin_input(), Box::new(io::stdout()))
    }

    /// One buffered reader over stdin. Hand clones of it to every console
    /// seat so piped input is read line by line in turn order.
    pub fn stdin_input() -> SharedInput {
        let reader: Box<dyn BufRead + Send> = Box::new(BufReader::new(io::stdin()));
        Arc::new(Mutex::new(reader))
    }

    pub fn sharing(input: SharedInput, output: Box<dyn Write + Send>) -> Self {
        Self { input, output }
    }

    pub fn with_streams(input: Box<dyn BufRead + Send>, output: Box<dyn Write + Send>) -> Self {
        Self::sharing(Arc::new(Mutex::new(input)), output)
    }

    fn read_line(&mut self) -> Option<String> {
        let _ = self.output.flush();
        let mut line = String::new();
        let Ok(mut input) = self.input.lock() else {
            return None;
        };
        match input.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim().to_string()),
        }
    }

    pub fn display_table(&mut self, view: &TurnView<'_>) {
        let table = view.table;
        let _ = writeln!(self.output, "\n--- {}'s turn ---", view.me().name);
        let _ = writeln!(self.output, "Direction: {:?}", table.direction());
        match table.indicated_color() {
            Some(color) => {
                let _ = writeln!(self.output, "Current card: {} (color {})", table.current_card(), color);
            }
            None => {
                let _ = writeln!(self.output, "Current card: {}", table.current_card());
            }
        }
        if view.mode.forward_count() > 0 {
            let _ = writeln!(
                self.output,
                "You must play a DRAW_2 or draw {} cards!",
                view.mode.forward_count()
            );
        }
        for player in table.players() {
            let _ = writeln!(
                self.output,
                "  {:<12} {:>2} cards {:>4} points",
                player.name,
                player.hand.len(),
                table.score(&player.name)
            );
        }
        self.display_player_hand(&view.me().name, &view.me().hand);
    }

    pub fn display_player_hand(&mut self, player_name: &str, hand: &[Card]) {
        let _ = writeln!(self.output, "\nPlayer {}'s hand:", player_name);
        for (i, card) in hand.iter().enumerate() {
            let _ = writeln!(self.output, "{}. {}", i, card);
        }
    }
}

impl InputSource for ConsoleUI {
    fn next_move(&mut self, view: &TurnView<'_>) -> String {
        self.display_table(view);
        let _ = write!(
            self.output,
            "Enter a card index (add 'uno' when it leaves you one card), 'draw', 'skip', 'challenge' or 'leave': "
        );
        self.read_line().unwrap_or_else(|| "leave".to_string())
    }

    fn pick_color(&mut self, _view: &TurnView<'_>) -> String {
        loop {
            let _ = writeln!(self.output, "Choose a color:");
            let _ = writeln!(self.output, "1. Red");
            let _ = writeln!(self.output, "2. Green");
            let _ = writeln!(self.output, "3. Blue");
            let _ = writeln!(self.output, "4. Yellow");
            let _ = write!(self.output, "Enter your choice: ");

            let Some(choice) = self.read_line() else {
                return "leave".to_string();
            };
            let color = match choice.as_str() {
                "1" => Color::Red,
                "2" => Color::Green,
                "3" => Color::Blue,
                "4" => Color::Yellow,
                other => match other.parse::<Color>() {
                    Ok(color) if color != Color::Wild => color,
                    _ => {
                        let _ = writeln!(self.output, "Invalid choice. Please enter 1, 2, 3, or 4.");
                        continue;
                    }
                },
            };
            return color.to_string();
        }
    }

    fn choose_swap_target(&mut self, view: &TurnView<'_>) -> String {
        let _ = writeln!(self.output, "Swap hands with:");
        for (i, player) in view.table.players().iter().enumerate() {
            if i != view.seat {
                let _ = writeln!(self.output, "  {} ({} cards)", player.name, player.hand.len());
            }
        }
        let _ = write!(self.output, "Enter a nickname: ");
        self.read_line().unwrap_or_else(|| "leave".to_string())
    }

    fn retain_drawn_card(&mut self, _view: &TurnView<'_>, card: &Card) -> String {
        loop {
            let _ = write!(self.output, "You drew {}. Play it now? (yes/no): ", card);
            let Some(answer) = self.read_line() else {
                return "skip".to_string();
            };
            match answer.to_lowercase().as_str() {
                "yes" | "y" => return "proceed".to_string(),
                "no" | "n" => return "skip".to_string(),
                _ => {
                    let _ = writeln!(self.output, "Please answer yes or no.");
                }
            }
        }
    }
}
