use super::game::GameError;
use super::mode::ModeKind;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const MIN_PLAYERS: usize = 2;
pub const MAX_PLAYERS: usize = 10;
pub const DEFAULT_WINNING_SCORE: u32 = 500;
pub const DEFAULT_HAND_SIZE: usize = 7;

/// Match-wide settings fixed at setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub mode: ModeKind,
    pub winning_score: u32,
    pub hand_size: usize,
    /// Makes deck order and dealer selection reproducible.
    pub seed: Option<u64>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            mode: ModeKind::Standard,
            winning_score: DEFAULT_WINNING_SCORE,
            hand_size: DEFAULT_HAND_SIZE,
            seed: None,
        }
    }
}

impl MatchConfig {
    pub fn with_mode(mode: ModeKind) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn seeded(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Every seat must be dealt at least one card.
pub fn validate_hand_size(hand_size: usize) -> Result<(), GameError> {
    if hand_size == 0 {
        return Err(GameError::Other("hand size must be at least 1".to_string()));
    }
    Ok(())
}

/// Checks a seating list: 2 to 10 players, nicknames non-empty and unique.
pub fn validate_nicknames<'a>(nicknames: impl IntoIterator<Item = &'a str>) -> Result<(), GameError> {
    let mut seen = HashSet::new();
    for nickname in nicknames {
        if nickname.trim().is_empty() {
            return Err(GameError::InvalidToken(nickname.to_string()));
        }
        if !seen.insert(nickname) {
            return Err(GameError::DuplicateNickname(nickname.to_string()));
        }
    }
    if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&seen.len()) {
        return Err(GameError::PlayerCount(seen.len()));
    }
    Ok(())
}
