use super::card::{Card, Color};
use super::game::GameError;
use super::mode::PlayingMode;
use super::table::Table;
use serde::{Deserialize, Serialize};

/// Color picked when a hand holds no colored card at all.
pub const FALLBACK_COLOR: Color = Color::Yellow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerKind {
    Human,
    Computer,
    Remote,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub name: String,
    pub kind: PlayerKind,
    pub hand: Vec<Card>,
}

impl Player {
    pub fn new(name: impl Into<String>, kind: PlayerKind) -> Self {
        Self {
            name: name.into(),
            kind,
            hand: Vec::new(),
        }
    }

    /// Adds a card to the player's hand.
    pub fn add_card(&mut self, card: Card) {
        self.hand.push(card);
    }

    /// Removes a card from the player's hand at the specified index.
    /// Returns `Err(GameError::CardNotInHand)` if the index is out of bounds.
    pub fn remove_card(&mut self, card_index: usize) -> Result<Card, GameError> {
        if card_index < self.hand.len() {
            Ok(self.hand.remove(card_index))
        } else {
            Err(GameError::CardNotInHand)
        }
    }

    /// Checks if the player has won (i.e., their hand is empty).
    pub fn has_won(&self) -> bool {
        self.hand.is_empty()
    }
}

/// What an input source gets to look at while it decides.
pub struct TurnView<'a> {
    pub table: &'a Table,
    pub mode: PlayingMode,
    pub seat: usize,
}

impl<'a> TurnView<'a> {
    pub fn new(table: &'a Table, mode: PlayingMode, seat: usize) -> Self {
        Self { table, mode, seat }
    }

    pub fn me(&self) -> &'a Player {
        &self.table.players()[self.seat]
    }

    /// Hand indices that are legal to play right now.
    pub fn legal_moves(&self) -> Vec<usize> {
        self.me()
            .hand
            .iter()
            .enumerate()
            .filter(|(_, card)| self.mode.valid_move(card, self.table))
            .map(|(i, _)| i)
            .collect()
    }
}

/// Where a participant's decisions come from. Every method may block the
/// engine thread until the participant answers; the engine validates the
/// returned token and asks again if it is unusable.
pub trait InputSource: Send {
    /// A move token: `draw`, `skip`, `challenge`, `leave`, `<index>` or `<index> uno`.
    fn next_move(&mut self, view: &TurnView<'_>) -> String;

    /// A color name after a wild card.
    fn pick_color(&mut self, view: &TurnView<'_>) -> String;

    /// The nickname of the player to swap hands with.
    fn choose_swap_target(&mut self, view: &TurnView<'_>) -> String;

    /// `proceed` to play the card just drawn, `skip` to keep it.
    fn retain_drawn_card(&mut self, view: &TurnView<'_>, card: &Card) -> String;
}

/// Deterministic local opponent. Never blocks.
#[derive(Debug, Default)]
pub struct ComputerInput;

impl ComputerInput {
    pub fn new() -> Self {
        Self
    }
}

impl InputSource for ComputerInput {
    fn next_move(&mut self, view: &TurnView<'_>) -> String {
        let legal = view.legal_moves();
        let hand = &view.me().hand;
        match determine_best_move(hand, &legal) {
            None if view.mode.forward_count() > 0 => "skip".to_string(),
            None => "draw".to_string(),
            Some(index) if hand.len() == 2 => format!("{} uno", index),
            Some(index) => index.to_string(),
        }
    }

    fn pick_color(&mut self, view: &TurnView<'_>) -> String {
        most_common_color(&view.me().hand).to_string()
    }

    fn choose_swap_target(&mut self, view: &TurnView<'_>) -> String {
        first_other_player(view.table, view.seat).unwrap_or_default()
    }

    fn retain_drawn_card(&mut self, _view: &TurnView<'_>, _card: &Card) -> String {
        "skip".to_string()
    }
}

/// Picks among `legal` hand indices. Keeps overwriting its choice while
/// scanning, so the last legal non-wild card wins; falls back to the first
/// legal index when every legal card is wild.
pub fn determine_best_move(hand: &[Card], legal: &[usize]) -> Option<usize> {
    let mut best = *legal.first()?;
    for &index in legal {
        if !hand[index].is_wild() {
            best = index;
        }
    }
    Some(best)
}

/// Most frequent non-wild color in `hand`. Ties go to the earlier color in
/// enumeration order.
pub fn most_common_color(hand: &[Card]) -> Color {
    let mut best = FALLBACK_COLOR;
    let mut best_count = 0;
    for color in Color::PLAYABLE {
        let count = hand.iter().filter(|card| card.color == color).count();
        if count > best_count {
            best = color;
            best_count = count;
        }
    }
    best
}

/// Nickname of the first seated player other than `seat`.
pub fn first_other_player(table: &Table, seat: usize) -> Option<String> {
    table
        .players()
        .iter()
        .enumerate()
        .find(|(i, _)| *i != seat)
        .map(|(_, p)| p.name.clone())
}
