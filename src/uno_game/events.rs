use super::card::{Card, Color};
use super::table::Direction;
use log::{debug, info};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    RoundStarted {
        dealer: String,
        first_card: Card,
    },
    CardPlayed {
        player: String,
        card: Card,
    },
    CardDrawn {
        player: String,
        count: usize,
    },
    TurnSkipped {
        player: String,
    },
    DirectionReversed {
        clockwise: bool,
    },
    PlayerLeft {
        player: String,
    },
    ColorChanged {
        color: Color,
    },
    HandsRotated,
    HandsSwapped {
        player: String,
        target: String,
    },
    ChallengeResolved {
        challenger: String,
        succeeded: bool,
    },
    RoundEnded {
        winner: String,
    },
    GameEnded {
        winner: String,
    },
    GameMessage {
        text: String,
    },
    // Prompts, sent to one player only.
    ColorRequested {
        player: String,
    },
    SwapTargetRequested {
        player: String,
    },
    DrewPlayableCard {
        player: String,
        card: Card,
    },
    InvalidMove {
        player: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatSummary {
    pub nickname: String,
    pub hand_size: usize,
    pub score: u32,
}

/// What one seat sees before each move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnSnapshot {
    pub top_card: Card,
    pub indicated_color: Option<Color>,
    pub direction: Direction,
    pub hand: Vec<Card>,
    pub players: Vec<SeatSummary>,
    pub your_turn: bool,
}

/// Outbound side of a match. Called synchronously from the engine thread.
pub trait Broadcaster: Send + Sync {
    /// Event for every seat.
    fn broadcast(&self, event: &GameEvent);

    /// Event for a single player.
    fn send(&self, nickname: &str, event: &GameEvent);

    /// Per-turn view for a single player.
    fn snapshot(&self, nickname: &str, snapshot: &TurnSnapshot);
}

/// Writes every event to the log. Used for local matches.
#[derive(Debug, Default)]
pub struct LogBroadcaster;

impl Broadcaster for LogBroadcaster {
    fn broadcast(&self, event: &GameEvent) {
        info!("{}", describe(event));
    }

    fn send(&self, nickname: &str, event: &GameEvent) {
        info!("[to {}] {}", nickname, describe(event));
    }

    fn snapshot(&self, nickname: &str, snapshot: &TurnSnapshot) {
        debug!(
            "[to {}] top card {}, {} cards in hand{}",
            nickname,
            snapshot.top_card,
            snapshot.hand.len(),
            if snapshot.your_turn { ", your turn" } else { "" }
        );
    }
}

/// One-line human readable rendering of an event.
pub fn describe(event: &GameEvent) -> String {
    match event {
        GameEvent::RoundStarted { dealer, first_card } => {
            format!("New round: {} deals, first card {}", dealer, first_card)
        }
        GameEvent::CardPlayed { player, card } => format!("{} played {}", player, card),
        GameEvent::CardDrawn { player, count } => format!("{} drew {} card(s)", player, count),
        GameEvent::TurnSkipped { player } => format!("{} was skipped", player),
        GameEvent::DirectionReversed { clockwise } => format!(
            "Direction reversed, now {}",
            if *clockwise { "clockwise" } else { "counter-clockwise" }
        ),
        GameEvent::PlayerLeft { player } => format!("{} left the game", player),
        GameEvent::ColorChanged { color } => format!("Color is now {}", color),
        GameEvent::HandsRotated => "Hands have been passed in the order of play".to_string(),
        GameEvent::HandsSwapped { player, target } => {
            format!("{} swapped hands with {}", player, target)
        }
        GameEvent::ChallengeResolved {
            challenger,
            succeeded,
        } => format!(
            "{}'s challenge {}",
            challenger,
            if *succeeded { "succeeded" } else { "failed" }
        ),
        GameEvent::RoundEnded { winner } => format!("{} won the round", winner),
        GameEvent::GameEnded { winner } => format!("{} won the game", winner),
        GameEvent::GameMessage { text } => text.clone(),
        GameEvent::ColorRequested { player } => format!("{}, pick a color", player),
        GameEvent::SwapTargetRequested { player } => {
            format!("{}, pick a player to swap hands with", player)
        }
        GameEvent::DrewPlayableCard { player, card } => {
            format!("{} drew a playable {}", player, card)
        }
        GameEvent::InvalidMove { player, reason } => {
            format!("Invalid move by {}: {}", player, reason)
        }
    }
}
