use super::card::{Card, CardType, Color};
use super::events::GameEvent;
use super::game::GameError;
use super::table::Table;
use clap::ValueEnum;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Rule set a match is played under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModeKind {
    #[default]
    #[serde(alias = "normal")]
    #[value(alias = "normal")]
    Standard,
    /// Draw-two cards can be stacked onto the next player.
    #[serde(alias = "progressive")]
    #[value(alias = "progressive")]
    Stacking,
    /// ZERO rotates every hand, SEVEN swaps hands with a chosen player.
    #[serde(alias = "sevenZero", alias = "sevenzero")]
    #[value(alias = "sevenZero")]
    Rotation,
}

impl fmt::Display for ModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModeKind::Standard => "standard",
            ModeKind::Stacking => "stacking",
            ModeKind::Rotation => "rotation",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for ModeKind {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "standard" | "normal" => Ok(ModeKind::Standard),
            "stacking" | "progressive" => Ok(ModeKind::Stacking),
            "rotation" | "sevenzero" => Ok(ModeKind::Rotation),
            _ => Err(GameError::InvalidToken(s.to_string())),
        }
    }
}

/// Everything a playing mode may need to ask of the participants or tell
/// them while it resolves an effect. Implemented by the engine's seats.
pub trait Prompter {
    /// Blocks until `seat` names a color.
    fn pick_color(&mut self, table: &Table, mode: PlayingMode, seat: usize) -> Color;

    /// Blocks until `seat` names another seated player; returns their seat.
    fn choose_swap_target(&mut self, table: &Table, mode: PlayingMode, seat: usize) -> usize;

    /// Sends an event to every seat.
    fn notify(&mut self, event: GameEvent);

    /// Sends an event to one player.
    fn tell(&mut self, nickname: &str, event: GameEvent);
}

/// Legality rules and card effects for one match. `forward_count` only
/// changes under [`ModeKind::Stacking`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayingMode {
    kind: ModeKind,
    forward_count: u32,
}

impl PlayingMode {
    pub fn new(kind: ModeKind) -> Self {
        Self {
            kind,
            forward_count: 0,
        }
    }

    pub fn kind(&self) -> ModeKind {
        self.kind
    }

    /// Pending forced draws while a draw-two chain is open.
    pub fn forward_count(&self) -> u32 {
        self.forward_count
    }

    pub fn set_forward_count(&mut self, count: u32) {
        self.forward_count = count;
    }

    /// Whether `card` may be played onto the table right now.
    pub fn valid_move(&self, card: &Card, table: &Table) -> bool {
        if self.kind == ModeKind::Stacking && self.forward_count > 0 {
            return card.card_type == CardType::DrawTwo;
        }
        if let Some(color) = table.indicated_color() {
            return card.color == color;
        }
        let top = table.current_card();
        if card.is_wild() {
            return !top.is_wild();
        }
        card.color == top.color || card.card_type == top.card_type
    }

    /// Applies the effect of `card`, just played by the current player.
    pub fn perform_card_action(&mut self, card: Card, table: &mut Table, prompter: &mut dyn Prompter) {
        let actor = table.current_turn();
        let next = table.next_player_index();

        match (card.card_type, self.kind) {
            (CardType::DrawTwo, ModeKind::Stacking) => self.forward_draw_two(table, prompter, next),
            (CardType::DrawTwo, _) => {
                force_draw(table, prompter, next, 2);
                table.skip();
            }
            (CardType::WildDrawFour, _) => {
                if table.has_winner() {
                    return;
                }
                self.choose_color(table, prompter, actor);
                let drawn = force_draw(table, prompter, next, 4);
                table.draw_four_eligibility(actor);
                table.open_challenge(actor, next, drawn);
            }
            (CardType::Skip, _) => {
                let player = table.players()[next].name.clone();
                table.skip();
                prompter.notify(GameEvent::TurnSkipped { player });
            }
            (CardType::Wild, _) => {
                if table.has_winner() {
                    return;
                }
                self.choose_color(table, prompter, actor);
            }
            (CardType::Reverse, _) => {
                table.reverse_players();
                prompter.notify(GameEvent::DirectionReversed {
                    clockwise: table.direction() == super::table::Direction::Clockwise,
                });
            }
            (CardType::Number(0), ModeKind::Rotation) => {
                table.pass_down_hands();
                prompter.notify(GameEvent::HandsRotated);
            }
            (CardType::Number(7), ModeKind::Rotation) => {
                if table.has_winner() {
                    return;
                }
                let target = prompter.choose_swap_target(table, *self, actor);
                table.swap_hands(actor, target);
                prompter.notify(GameEvent::HandsSwapped {
                    player: table.players()[actor].name.clone(),
                    target: table.players()[target].name.clone(),
                });
            }
            (CardType::Number(_), _) => {}
        }
    }

    /// Applies the first card of a round to the first player, once, before
    /// normal play begins.
    pub fn adjust_to_first_card(&mut self, table: &mut Table, prompter: &mut dyn Prompter) {
        let first = table.current_turn();
        let mut card = table.current_card();

        // A DRAW_FOUR is never left face up: it goes under the pile and the
        // next card is turned up in its place.
        while card.card_type == CardType::WildDrawFour {
            let Some(replacement) = table.deck_mut().turn_up() else {
                break;
            };
            if let Some(buried) = table.deck_mut().take_top_discard() {
                table.deck_mut().put_under(buried);
            }
            table.deck_mut().discard(replacement);
            table.set_current_card(replacement);
            debug!("Replaced first card {} with {}", card, replacement);
            card = replacement;
        }

        match (card.card_type, self.kind) {
            (CardType::DrawTwo, ModeKind::Stacking) if holds_draw_two(table, first) => {
                self.forward_count += 2;
                prompter.tell(&table.players()[first].name.clone(), stack_hint());
            }
            (CardType::DrawTwo, _) => {
                force_draw(table, prompter, first, 2 + self.forward_count as usize);
                self.forward_count = 0;
                prompter.tell(
                    &table.players()[first].name.clone(),
                    GameEvent::GameMessage {
                        text: "Unfortunately you've been punished with two cards at the very beginning"
                            .to_string(),
                    },
                );
                table.skip();
            }
            (CardType::Skip, _) => {
                let player = table.players()[first].name.clone();
                table.skip();
                prompter.notify(GameEvent::TurnSkipped { player });
            }
            (CardType::Wild, _) => self.choose_color(table, prompter, first),
            (CardType::Reverse, _) => {
                // The dealer starts and play runs the other way.
                let dealer = table.previous_player_index();
                table.flip_direction();
                table.set_current_turn(dealer);
                prompter.notify(GameEvent::DirectionReversed {
                    clockwise: table.direction() == super::table::Direction::Clockwise,
                });
            }
            (CardType::Number(0), ModeKind::Rotation) => {
                table.pass_down_hands();
                prompter.notify(GameEvent::HandsRotated);
            }
            (CardType::Number(7), ModeKind::Rotation) => {
                let target = prompter.choose_swap_target(table, *self, first);
                table.swap_hands(first, target);
                prompter.notify(GameEvent::HandsSwapped {
                    player: table.players()[first].name.clone(),
                    target: table.players()[target].name.clone(),
                });
            }
            _ => {}
        }
    }

    fn forward_draw_two(&mut self, table: &mut Table, prompter: &mut dyn Prompter, next: usize) {
        if holds_draw_two(table, next) {
            self.forward_count += 2;
            prompter.tell(&table.players()[next].name.clone(), stack_hint());
        } else {
            force_draw(table, prompter, next, self.forward_count as usize + 2);
            self.forward_count = 0;
            table.skip();
        }
    }

    fn choose_color(&self, table: &mut Table, prompter: &mut dyn Prompter, seat: usize) {
        let color = prompter.pick_color(table, *self, seat);
        table.set_indicated_color(color);
        prompter.notify(GameEvent::ColorChanged { color });
    }
}

fn holds_draw_two(table: &Table, seat: usize) -> bool {
    table.players()[seat]
        .hand
        .iter()
        .any(|card| card.card_type == CardType::DrawTwo)
}

fn stack_hint() -> GameEvent {
    GameEvent::GameMessage {
        text: "You can forward drawing two cards, by placing your draw two card.".to_string(),
    }
}

/// Returns how many cards were actually drawn.
fn force_draw(table: &mut Table, prompter: &mut dyn Prompter, seat: usize, amount: usize) -> usize {
    let count = table.draw(seat, amount).len();
    prompter.notify(GameEvent::CardDrawn {
        player: table.players()[seat].name.clone(),
        count,
    });
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uno_game::deck::Deck;
    use crate::uno_game::player::{Player, PlayerKind};
    use crate::uno_game::table::Direction;

    /// Answers every prompt with a fixed choice and records what it was told.
    struct Scripted {
        color: Color,
        target: usize,
        events: Vec<GameEvent>,
    }

    impl Scripted {
        fn new() -> Self {
            Self {
                color: Color::Green,
                target: 1,
                events: Vec::new(),
            }
        }
    }

    impl Prompter for Scripted {
        fn pick_color(&mut self, _table: &Table, _mode: PlayingMode, _seat: usize) -> Color {
            self.color
        }

        fn choose_swap_target(&mut self, _table: &Table, _mode: PlayingMode, _seat: usize) -> usize {
            self.target
        }

        fn notify(&mut self, event: GameEvent) {
            self.events.push(event);
        }

        fn tell(&mut self, _nickname: &str, event: GameEvent) {
            self.events.push(event);
        }
    }

    fn table(n: usize) -> Table {
        let players = (0..n)
            .map(|i| Player::new(format!("p{}", i), PlayerKind::Computer))
            .collect();
        Table::new(players, Deck::new(5), 7).unwrap()
    }

    fn card(color: Color, card_type: CardType) -> Card {
        Card::new(color, card_type)
    }

    /// Plays `index` from the current player's hand the way the engine does.
    fn play(mode: &mut PlayingMode, table: &mut Table, prompter: &mut Scripted, index: usize) {
        let seat = table.current_turn();
        let played = table.place_card(seat, index).unwrap();
        table.reset_indicated_color();
        mode.perform_card_action(played, table, prompter);
        table.next_turn();
    }

    #[test]
    fn test_valid_move_with_indicated_color() {
        let mode = PlayingMode::new(ModeKind::Standard);
        let mut table = table(2);
        table.set_current_card(card(Color::Yellow, CardType::Number(5)));
        let blue_seven = card(Color::Blue, CardType::Number(7));
        assert!(!mode.valid_move(&blue_seven, &table));
        table.set_indicated_color(Color::Blue);
        assert!(mode.valid_move(&blue_seven, &table));
        assert!(!mode.valid_move(&card(Color::Yellow, CardType::Number(5)), &table));
    }

    #[test]
    fn test_wild_on_wild_is_illegal() {
        let mode = PlayingMode::new(ModeKind::Standard);
        let mut table = table(2);
        table.set_current_card(card(Color::Wild, CardType::Wild));
        assert!(!mode.valid_move(&card(Color::Wild, CardType::WildDrawFour), &table));
        assert!(!mode.valid_move(&card(Color::Wild, CardType::Wild), &table));
    }

    #[test]
    fn test_color_or_value_match() {
        let mode = PlayingMode::new(ModeKind::Rotation);
        let mut table = table(2);
        table.set_current_card(card(Color::Red, CardType::Skip));
        assert!(mode.valid_move(&card(Color::Red, CardType::Number(3)), &table));
        assert!(mode.valid_move(&card(Color::Blue, CardType::Skip), &table));
        assert!(mode.valid_move(&card(Color::Wild, CardType::Wild), &table));
        assert!(!mode.valid_move(&card(Color::Blue, CardType::Number(3)), &table));
    }

    #[test]
    fn test_stacking_only_allows_draw_two_while_chain_open() {
        let mut mode = PlayingMode::new(ModeKind::Stacking);
        let mut table = table(2);
        table.set_current_card(card(Color::Red, CardType::DrawTwo));
        mode.set_forward_count(2);
        assert!(mode.valid_move(&card(Color::Blue, CardType::DrawTwo), &table));
        assert!(!mode.valid_move(&card(Color::Red, CardType::Number(4)), &table));
        mode.set_forward_count(0);
        assert!(mode.valid_move(&card(Color::Red, CardType::Number(4)), &table));
    }

    #[test]
    fn test_stacking_chain_raises_forward_count() {
        let mut mode = PlayingMode::new(ModeKind::Stacking);
        let mut prompter = Scripted::new();
        let mut table = table(3);
        table.set_current_card(card(Color::Red, CardType::Number(4)));
        for p in table.players_mut() {
            p.hand = vec![
                card(Color::Red, CardType::DrawTwo),
                card(Color::Red, CardType::DrawTwo),
                card(Color::Blue, CardType::Number(1)),
            ];
        }

        assert_eq!(mode.forward_count(), 0);
        play(&mut mode, &mut table, &mut prompter, 0);
        assert_eq!(mode.forward_count(), 2);
        assert_eq!(table.current_turn(), 1);
        play(&mut mode, &mut table, &mut prompter, 0);
        assert_eq!(mode.forward_count(), 4);
        assert_eq!(table.current_turn(), 2);
        play(&mut mode, &mut table, &mut prompter, 0);
        assert_eq!(mode.forward_count(), 6);
        assert_eq!(table.current_turn(), 0);
    }

    #[test]
    fn test_stacking_chain_ends_on_player_without_draw_two() {
        let mut mode = PlayingMode::new(ModeKind::Stacking);
        let mut prompter = Scripted::new();
        let mut table = table(3);
        table.set_current_card(card(Color::Red, CardType::Number(4)));
        table.players_mut()[0].hand = vec![card(Color::Red, CardType::DrawTwo), card(Color::Red, CardType::Number(1))];
        table.players_mut()[1].hand = vec![card(Color::Blue, CardType::Number(1))];
        mode.set_forward_count(4);

        play(&mut mode, &mut table, &mut prompter, 0);
        assert_eq!(table.players()[1].hand.len(), 7);
        assert_eq!(mode.forward_count(), 0);
        assert_eq!(table.current_turn(), 2);
    }

    #[test]
    fn test_standard_draw_two_skips_next_player() {
        let mut mode = PlayingMode::new(ModeKind::Standard);
        let mut prompter = Scripted::new();
        let mut table = table(3);
        table.set_current_card(card(Color::Red, CardType::Number(4)));
        table.players_mut()[0].hand = vec![card(Color::Red, CardType::DrawTwo), card(Color::Red, CardType::Number(1))];

        play(&mut mode, &mut table, &mut prompter, 0);
        assert_eq!(table.players()[1].hand.len(), 9);
        assert_eq!(table.current_turn(), 2);
        assert!(prompter.events.contains(&GameEvent::CardDrawn {
            player: "p1".to_string(),
            count: 2
        }));
    }

    #[test]
    fn test_draw_four_picks_color_and_opens_challenge() {
        let mut mode = PlayingMode::new(ModeKind::Standard);
        let mut prompter = Scripted::new();
        let mut table = table(3);
        table.set_current_card(card(Color::Red, CardType::Number(4)));
        table.deck_mut().discard(card(Color::Red, CardType::Number(4)));
        table.players_mut()[0].hand = vec![
            card(Color::Wild, CardType::WildDrawFour),
            card(Color::Red, CardType::Number(1)),
        ];

        play(&mut mode, &mut table, &mut prompter, 0);
        assert_eq!(table.indicated_color(), Some(Color::Green));
        assert_eq!(table.players()[1].hand.len(), 11);
        assert_eq!(table.current_turn(), 1);
        assert!(!table.is_draw_four_playable());
        let challenge = table.challenge().unwrap();
        assert_eq!(challenge.offender, "p0");
        assert_eq!(challenge.challenger, "p1");
    }

    #[test]
    fn test_skip_broadcasts_skipped_player() {
        let mut mode = PlayingMode::new(ModeKind::Standard);
        let mut prompter = Scripted::new();
        let mut table = table(3);
        table.set_current_card(card(Color::Red, CardType::Number(4)));
        table.players_mut()[0].hand = vec![card(Color::Red, CardType::Skip), card(Color::Red, CardType::Number(1))];

        play(&mut mode, &mut table, &mut prompter, 0);
        assert_eq!(table.current_turn(), 2);
        assert_eq!(
            prompter.events,
            vec![GameEvent::TurnSkipped {
                player: "p1".to_string()
            }]
        );
    }

    #[test]
    fn test_reverse_with_two_players_gives_actor_another_turn() {
        let mut mode = PlayingMode::new(ModeKind::Standard);
        let mut prompter = Scripted::new();
        let mut table = table(2);
        table.set_current_card(card(Color::Red, CardType::Number(4)));
        table.players_mut()[0].hand = vec![card(Color::Red, CardType::Reverse), card(Color::Red, CardType::Number(1))];

        play(&mut mode, &mut table, &mut prompter, 0);
        assert_eq!(table.current_turn(), 0);
        assert_eq!(table.next_player_index(), 1);
    }

    #[test]
    fn test_rotation_zero_passes_hands() {
        let mut mode = PlayingMode::new(ModeKind::Rotation);
        let mut prompter = Scripted::new();
        let mut table = table(3);
        table.set_current_card(card(Color::Red, CardType::Number(4)));
        table.players_mut()[0].hand = vec![card(Color::Red, CardType::Number(0)), card(Color::Red, CardType::Number(1))];
        let h1 = vec![card(Color::Red, CardType::Number(1))];
        let h2 = table.players()[1].hand.clone();
        let h3 = table.players()[2].hand.clone();

        play(&mut mode, &mut table, &mut prompter, 0);
        assert_eq!(table.players()[0].hand, h3);
        assert_eq!(table.players()[1].hand, h1);
        assert_eq!(table.players()[2].hand, h2);
        assert!(prompter.events.contains(&GameEvent::HandsRotated));
    }

    #[test]
    fn test_zero_has_no_effect_outside_rotation() {
        let mut mode = PlayingMode::new(ModeKind::Standard);
        let mut prompter = Scripted::new();
        let mut table = table(3);
        table.set_current_card(card(Color::Red, CardType::Number(4)));
        table.players_mut()[0].hand = vec![card(Color::Red, CardType::Number(0)), card(Color::Red, CardType::Number(1))];
        let h2 = table.players()[1].hand.clone();

        play(&mut mode, &mut table, &mut prompter, 0);
        assert_eq!(table.players()[1].hand, h2);
        assert!(prompter.events.is_empty());
    }

    #[test]
    fn test_rotation_seven_swaps_with_target() {
        let mut mode = PlayingMode::new(ModeKind::Rotation);
        let mut prompter = Scripted::new();
        prompter.target = 2;
        let mut table = table(3);
        table.set_current_card(card(Color::Red, CardType::Number(4)));
        table.players_mut()[0].hand = vec![card(Color::Red, CardType::Number(7)), card(Color::Red, CardType::Number(1))];
        let h3 = table.players()[2].hand.clone();

        play(&mut mode, &mut table, &mut prompter, 0);
        assert_eq!(table.players()[0].hand, h3);
        assert_eq!(table.players()[2].hand, vec![card(Color::Red, CardType::Number(1))]);
    }

    #[test]
    fn test_first_card_skip_skips_first_player() {
        let mut mode = PlayingMode::new(ModeKind::Standard);
        let mut prompter = Scripted::new();
        let mut table = table(3);
        table.set_current_card(card(Color::Blue, CardType::Skip));
        mode.adjust_to_first_card(&mut table, &mut prompter);
        assert_eq!(table.current_turn(), 1);
    }

    #[test]
    fn test_first_card_reverse_lets_dealer_start() {
        let mut mode = PlayingMode::new(ModeKind::Standard);
        let mut prompter = Scripted::new();
        let mut table = table(4);
        table.set_current_turn(2);
        table.set_current_card(card(Color::Blue, CardType::Reverse));
        mode.adjust_to_first_card(&mut table, &mut prompter);
        assert_eq!(table.current_turn(), 1);
        assert_eq!(table.direction(), Direction::CounterClockwise);
    }

    #[test]
    fn test_first_card_pick_asks_first_player() {
        let mut mode = PlayingMode::new(ModeKind::Standard);
        let mut prompter = Scripted::new();
        prompter.color = Color::Red;
        let mut table = table(3);
        table.set_current_card(card(Color::Wild, CardType::Wild));
        mode.adjust_to_first_card(&mut table, &mut prompter);
        assert_eq!(table.indicated_color(), Some(Color::Red));
        assert_eq!(table.current_turn(), 0);
    }

    #[test]
    fn test_first_card_draw_four_is_replaced() {
        let mut mode = PlayingMode::new(ModeKind::Standard);
        let mut prompter = Scripted::new();
        let mut table = table(3);
        let draw_four = card(Color::Wild, CardType::WildDrawFour);
        table.deck_mut().take_top_discard();
        table.deck_mut().discard(draw_four);
        table.set_current_card(draw_four);

        mode.adjust_to_first_card(&mut table, &mut prompter);
        assert_ne!(table.current_card().card_type, CardType::WildDrawFour);
        assert_eq!(table.deck().top_discard(), Some(&table.current_card()));
        assert_eq!(table.card_count(), 108);
    }

    #[test]
    fn test_mode_aliases() {
        assert_eq!("normal".parse::<ModeKind>().unwrap(), ModeKind::Standard);
        assert_eq!("progressive".parse::<ModeKind>().unwrap(), ModeKind::Stacking);
        assert_eq!("sevenZero".parse::<ModeKind>().unwrap(), ModeKind::Rotation);
        assert!("blitz".parse::<ModeKind>().is_err());
        let kind: ModeKind = serde_json::from_str("\"sevenZero\"").unwrap();
        assert_eq!(kind, ModeKind::Rotation);
    }
}
