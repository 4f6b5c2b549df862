use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::game::GameError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Color {
    Blue,
    Green,
    Yellow,
    Red,
    Wild,
}

impl Color {
    /// The four colors a player may pick after a wild card, in enumeration order.
    pub const PLAYABLE: [Color; 4] = [Color::Blue, Color::Green, Color::Yellow, Color::Red];
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Color::Blue => "BLUE",
            Color::Green => "GREEN",
            Color::Yellow => "YELLOW",
            Color::Red => "RED",
            Color::Wild => "WILD",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Color {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BLUE" => Ok(Color::Blue),
            "GREEN" => Ok(Color::Green),
            "YELLOW" => Ok(Color::Yellow),
            "RED" => Ok(Color::Red),
            "WILD" => Ok(Color::Wild),
            _ => Err(GameError::InvalidToken(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardType {
    Number(u8),
    Skip,
    Reverse,
    DrawTwo,
    /// Wild "pick color".
    Wild,
    WildDrawFour,
}

impl CardType {
    /// Position of the value in the dealing order. Action and wild cards rank
    /// 0 to 4, numerals rank 5 and up, so `rank() > 4` means "is a numeral".
    pub fn rank(&self) -> u8 {
        match self {
            CardType::DrawTwo => 0,
            CardType::Skip => 1,
            CardType::Reverse => 2,
            CardType::WildDrawFour => 3,
            CardType::Wild => 4,
            CardType::Number(n) => 5 + n,
        }
    }
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardType::Number(n) => write!(f, "{}", n),
            CardType::Skip => write!(f, "SKIP"),
            CardType::Reverse => write!(f, "REVERSE"),
            CardType::DrawTwo => write!(f, "DRAW_2"),
            CardType::Wild => write!(f, "PICK"),
            CardType::WildDrawFour => write!(f, "DRAW_FOUR"),
        }
    }
}

impl FromStr for CardType {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "SKIP" => Ok(CardType::Skip),
            "REVERSE" => Ok(CardType::Reverse),
            "DRAW_2" | "DRAW_TWO" => Ok(CardType::DrawTwo),
            "PICK" | "PICK_COLOR" => Ok(CardType::Wild),
            "DRAW_FOUR" | "DRAW_4" => Ok(CardType::WildDrawFour),
            other => match other.parse::<u8>() {
                Ok(n) if n <= 9 => Ok(CardType::Number(n)),
                _ => Err(GameError::InvalidToken(s.to_string())),
            },
        }
    }
}

/// Immutable card value. Duplicates are interchangeable and compared by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub color: Color,
    pub card_type: CardType,
}

impl Card {
    pub const fn new(color: Color, card_type: CardType) -> Self {
        Self { color, card_type }
    }

    pub fn is_wild(&self) -> bool {
        self.color == Color::Wild
    }

    /// Points this card is worth to the round winner when left in a losing hand.
    pub fn points(&self) -> u32 {
        match self.card_type {
            CardType::Wild | CardType::WildDrawFour => 50,
            CardType::DrawTwo | CardType::Skip | CardType::Reverse => 20,
            CardType::Number(n) => n as u32,
        }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.color, self.card_type)
    }
}

impl FromStr for Card {
    type Err = GameError;

    /// Parses the display form, e.g. `RED 7` or `WILD DRAW_FOUR`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let (Some(color), Some(card_type), None) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(GameError::InvalidToken(s.to_string()));
        };
        Ok(Card::new(color.parse()?, card_type.parse()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_display_round_trips_through_parse() {
        let cards = [
            Card::new(Color::Red, CardType::Number(7)),
            Card::new(Color::Green, CardType::DrawTwo),
            Card::new(Color::Wild, CardType::WildDrawFour),
            Card::new(Color::Wild, CardType::Wild),
        ];
        for card in cards {
            assert_eq!(card.to_string().parse::<Card>().unwrap(), card);
        }
        assert_eq!(Card::new(Color::Green, CardType::DrawTwo).to_string(), "GREEN DRAW_2");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("PURPLE 3".parse::<Card>().is_err());
        assert!("RED 10".parse::<Card>().is_err());
        assert!("RED".parse::<Card>().is_err());
        assert!("RED 1 2".parse::<Card>().is_err());
    }

    #[test]
    fn test_color_parse_is_case_insensitive() {
        assert_eq!("blue".parse::<Color>().unwrap(), Color::Blue);
        assert_eq!(" Yellow ".parse::<Color>().unwrap(), Color::Yellow);
    }

    #[test]
    fn test_points() {
        let hand = [
            Card::new(Color::Wild, CardType::WildDrawFour),
            Card::new(Color::Green, CardType::DrawTwo),
            Card::new(Color::Red, CardType::Skip),
            Card::new(Color::Yellow, CardType::Number(6)),
            Card::new(Color::Blue, CardType::Number(4)),
        ];
        assert_eq!(hand.iter().map(Card::points).sum::<u32>(), 100);
    }

    #[test]
    fn test_rank_separates_numerals_from_actions() {
        assert!(CardType::Number(0).rank() > 4);
        assert!(CardType::Wild.rank() <= 4);
        assert!(CardType::Number(9).rank() > CardType::Number(8).rank());
    }
}
