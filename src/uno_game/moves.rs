use super::game::GameError;
use std::str::FromStr;

/// A decoded move token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    Draw,
    /// Pass the turn, decline a drawn card, or accept a stacked draw penalty.
    Skip,
    Challenge,
    Leave,
    /// Play the card just drawn.
    Proceed,
    Play { index: usize, uno: bool },
}

impl FromStr for Move {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        let mut parts = lowered.split_whitespace();
        let invalid = || GameError::InvalidToken(s.trim().to_string());

        let first = parts.next().ok_or_else(invalid)?;
        let second = parts.next();
        if parts.next().is_some() {
            return Err(invalid());
        }

        match (first, second) {
            ("draw", None) => Ok(Move::Draw),
            ("skip", None) => Ok(Move::Skip),
            ("challenge", None) => Ok(Move::Challenge),
            ("leave", None) => Ok(Move::Leave),
            ("proceed", None) => Ok(Move::Proceed),
            (index, uno) => {
                let index = index.parse::<usize>().map_err(|_| invalid())?;
                match uno {
                    None => Ok(Move::Play { index, uno: false }),
                    Some("uno") => Ok(Move::Play { index, uno: true }),
                    Some(_) => Err(invalid()),
                }
            }
        }
    }
}
