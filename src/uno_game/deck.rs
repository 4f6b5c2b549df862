use super::card::{Card, CardType, Color};
use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

const SHUFFLE_PASSES: usize = 4;

/// Draw pile and discard pile. The top of either pile is the last element.
#[derive(Debug)]
pub struct Deck {
    draw_pile: Vec<Card>,
    discard_pile: Vec<Card>,
    rng: StdRng,
}

impl Deck {
    /// Fresh 108-card deck, shuffled.
    pub fn new(seed: u64) -> Self {
        let mut deck = Self::from_cards(Self::generate(), seed);
        for _ in 0..SHUFFLE_PASSES {
            deck.draw_pile.shuffle(&mut deck.rng);
        }
        deck
    }

    /// Deck whose draw pile is exactly `cards`, top of the pile last.
    pub fn from_cards(cards: Vec<Card>, seed: u64) -> Self {
        Self {
            draw_pile: cards,
            discard_pile: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Unshuffled full set: one zero and two of every other colored value per
    /// color, plus four of each wild.
    pub fn generate() -> Vec<Card> {
        let mut cards = Vec::with_capacity(108);

        for &color in &Color::PLAYABLE {
            cards.push(Card::new(color, CardType::Number(0)));

            for _ in 0..2 {
                for number in 1..=9 {
                    cards.push(Card::new(color, CardType::Number(number)));
                }
                cards.push(Card::new(color, CardType::Skip));
                cards.push(Card::new(color, CardType::Reverse));
                cards.push(Card::new(color, CardType::DrawTwo));
            }
        }

        for _ in 0..4 {
            cards.push(Card::new(Color::Wild, CardType::Wild));
            cards.push(Card::new(Color::Wild, CardType::WildDrawFour));
        }

        cards
    }

    pub fn draw_pile(&self) -> &[Card] {
        &self.draw_pile
    }

    pub fn discard_pile(&self) -> &[Card] {
        &self.discard_pile
    }

    pub fn top_discard(&self) -> Option<&Card> {
        self.discard_pile.last()
    }

    /// Draws up to `amount` cards. Reshuffles the discard pile in when the draw
    /// pile is short; if that still isn't enough, returns what there is.
    pub fn draw(&mut self, amount: usize) -> Vec<Card> {
        if amount > self.draw_pile.len() {
            self.reshuffle();
        }
        let take = amount.min(self.draw_pile.len());
        let split = self.draw_pile.len() - take;
        let mut drawn = self.draw_pile.split_off(split);
        drawn.reverse();
        drawn
    }

    /// Takes one card off the draw pile without reshuffling.
    pub fn turn_up(&mut self) -> Option<Card> {
        self.draw_pile.pop()
    }

    pub fn discard(&mut self, card: Card) {
        self.discard_pile.push(card);
    }

    /// Removes and returns the top card of the discard pile.
    pub fn take_top_discard(&mut self) -> Option<Card> {
        self.discard_pile.pop()
    }

    /// Puts a card at the bottom of the draw pile.
    pub fn put_under(&mut self, card: Card) {
        self.draw_pile.insert(0, card);
    }

    /// Returns cards to the draw pile and shuffles it.
    pub fn return_cards(&mut self, cards: impl IntoIterator<Item = Card>) {
        self.draw_pile.extend(cards);
        self.draw_pile.shuffle(&mut self.rng);
    }

    /// Everything but the top two discards is shuffled under the remaining draw
    /// pile; the top two stay as the new discard pile.
    pub fn reshuffle(&mut self) {
        if self.discard_pile.len() <= 2 {
            return;
        }
        let keep = self.discard_pile.split_off(self.discard_pile.len() - 2);
        let mut recycled = std::mem::replace(&mut self.discard_pile, keep);
        recycled.shuffle(&mut self.rng);
        debug!("Reshuffled {} discarded cards into the draw pile", recycled.len());
        recycled.append(&mut self.draw_pile);
        self.draw_pile = recycled;
    }

    pub fn len(&self) -> usize {
        self.draw_pile.len() + self.discard_pile.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
