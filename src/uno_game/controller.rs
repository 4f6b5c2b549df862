use super::config::MatchConfig;
use super::events::{Broadcaster, LogBroadcaster};
use super::game::{GameEngine, GameError, Participant};
use super::player::PlayerKind;
use super::ui::ConsoleUI;
use log::info;
use std::io;
use std::sync::Arc;

/// Runs a match in this process: humans at the terminal, computers in-line.
pub struct GameController {
    engine: GameEngine,
}

impl GameController {
    /// Humans are seated first, in the order given, then the computers.
    pub fn new(
        config: MatchConfig,
        humans: Vec<String>,
        computers: Vec<String>,
    ) -> Result<Self, GameError> {
        let mut participants = Vec::with_capacity(humans.len() + computers.len());
        let stdin = ConsoleUI::stdin_input();
        for nickname in humans {
            participants.push(Participant::new(
                nickname,
                PlayerKind::Human,
                Box::new(ConsoleUI::sharing(stdin.clone(), Box::new(io::stdout()))),
            ));
        }
        participants.extend(computers.into_iter().map(Participant::computer));

        let broadcaster: Arc<dyn Broadcaster> = Arc::new(LogBroadcaster);
        let engine = GameEngine::new(config, participants, broadcaster)?;
        Ok(GameController { engine })
    }

    pub fn engine(&self) -> &GameEngine {
        &self.engine
    }

    pub fn run(&mut self) -> Option<String> {
        println!("Welcome to Uno!");
        let winner = self.engine.run();
        match &winner {
            Some(name) => println!("\n{} has won the game!", name),
            None => println!("\nNobody is left at the table."),
        }
        info!("Local match finished");
        winner
    }
}
