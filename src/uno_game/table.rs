use super::card::{Card, Color};
use super::deck::Deck;
use super::events::{SeatSummary, TurnSnapshot};
use super::game::GameError;
use super::player::Player;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Represents the direction of play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Clockwise,
    CounterClockwise,
}

impl Direction {
    pub fn reverse(&self) -> Self {
        match self {
            Direction::Clockwise => Direction::CounterClockwise,
            Direction::CounterClockwise => Direction::Clockwise,
        }
    }
}

/// An open challenge window after a DRAW_FOUR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub offender: String,
    pub challenger: String,
    /// Cards the challenger actually drew; fewer than four on a short deck.
    pub drawn: usize,
}

/// Seats, turn pointer and everything that lives for one round, plus the
/// scoreboard which lives for the whole match.
#[derive(Debug)]
pub struct Table {
    players: Vec<Player>,
    scoreboard: HashMap<String, u32>,
    deck: Deck,
    current_turn: usize,
    direction: Direction,
    current_card: Card,
    indicated_color: Option<Color>,
    draw_four_playable: bool,
    challenge: Option<Challenge>,
    round_winner: Option<String>,
    hand_size: usize,
}

impl Table {
    pub fn new(players: Vec<Player>, deck: Deck, hand_size: usize) -> Result<Self, GameError> {
        let scoreboard = players.iter().map(|p| (p.name.clone(), 0)).collect();
        let mut table = Self {
            players,
            scoreboard,
            deck: Deck::from_cards(Vec::new(), 0),
            current_turn: 0,
            direction: Direction::Clockwise,
            current_card: Card::new(Color::Wild, super::card::CardType::Wild),
            indicated_color: None,
            draw_four_playable: true,
            challenge: None,
            round_winner: None,
            hand_size,
        };
        table.setup_round(deck)?;
        Ok(table)
    }

    /// Resets every round-scoped field: turns up the first card, deals hands.
    /// The scoreboard is kept.
    pub fn setup_round(&mut self, deck: Deck) -> Result<(), GameError> {
        self.deck = deck;
        self.current_card = self.deck.turn_up().ok_or(GameError::EmptyDeck)?;
        self.deck.discard(self.current_card);
        self.indicated_color = None;
        self.draw_four_playable = true;
        self.challenge = None;
        self.round_winner = None;
        self.direction = Direction::Clockwise;
        self.distribute_hands()
    }

    /// Deals `hand_size` cards to every seat.
    pub fn distribute_hands(&mut self) -> Result<(), GameError> {
        for player in self.players.iter_mut() {
            player.hand = self.deck.draw(self.hand_size);
            if player.hand.len() < self.hand_size {
                return Err(GameError::EmptyDeck);
            }
        }
        Ok(())
    }

    /// Updates the current turn based on the direction of play.
    pub fn next_turn(&mut self) {
        self.current_turn = self.next_player_index();
    }

    /// Skips the player whose turn it would be next.
    pub fn skip(&mut self) {
        self.next_turn();
    }

    /// Reverses the direction of play. With two players this acts as a skip.
    pub fn reverse_players(&mut self) {
        if self.players.len() == 2 {
            self.next_turn();
        }
        self.direction = self.direction.reverse();
    }

    /// Flips the direction without moving the turn pointer.
    pub fn flip_direction(&mut self) {
        self.direction = self.direction.reverse();
    }

    pub fn next_player_index(&self) -> usize {
        let n = self.players.len();
        match self.direction {
            Direction::Clockwise => (self.current_turn + 1) % n,
            Direction::CounterClockwise => (self.current_turn + n - 1) % n,
        }
    }

    pub fn previous_player_index(&self) -> usize {
        let n = self.players.len();
        match self.direction {
            Direction::Clockwise => (self.current_turn + n - 1) % n,
            Direction::CounterClockwise => (self.current_turn + 1) % n,
        }
    }

    /// Draws up to `amount` cards into a player's hand and returns them.
    pub fn draw(&mut self, seat: usize, amount: usize) -> Vec<Card> {
        let cards = self.deck.draw(amount);
        if cards.len() < amount {
            debug!(
                "Deck exhausted: {} wanted {} cards, got {}",
                self.players[seat].name,
                amount,
                cards.len()
            );
        }
        self.players[seat].hand.extend(cards.iter().copied());
        cards
    }

    /// Puts the last `amount` cards of a hand back into the draw pile.
    pub fn return_last_cards(&mut self, seat: usize, amount: usize) -> usize {
        let hand = &mut self.players[seat].hand;
        let keep = hand.len() - amount.min(hand.len());
        let returned = hand.split_off(keep);
        let count = returned.len();
        self.deck.return_cards(returned);
        count
    }

    /// Moves a card from a hand onto the discard pile. Emptying the hand ends
    /// the round and scores it for that player.
    pub fn place_card(&mut self, seat: usize, card_index: usize) -> Result<Card, GameError> {
        let card = self.players[seat].remove_card(card_index)?;
        self.draw_four_playable = true;
        self.current_card = card;
        self.deck.discard(card);
        if self.players[seat].has_won() {
            self.round_winner = Some(self.players[seat].name.clone());
            self.calculate_scores(seat);
        }
        Ok(card)
    }

    pub fn reset_indicated_color(&mut self) {
        self.indicated_color = None;
    }

    pub fn set_indicated_color(&mut self, color: Color) {
        self.indicated_color = Some(color);
    }

    /// Re-evaluates whether the DRAW_FOUR just played by `seat` was legal: it
    /// isn't if that hand still holds a card of the color underneath it.
    pub fn draw_four_eligibility(&mut self, seat: usize) -> bool {
        let discards = self.deck.discard_pile();
        if discards.len() < 2 {
            return self.draw_four_playable;
        }
        let previous = discards[discards.len() - 2].color;
        if self.players[seat]
            .hand
            .iter()
            .any(|card| !card.is_wild() && card.color == previous)
        {
            self.draw_four_playable = false;
        }
        self.draw_four_playable
    }

    pub fn is_draw_four_playable(&self) -> bool {
        self.draw_four_playable
    }

    pub fn set_draw_four_playable(&mut self, playable: bool) {
        self.draw_four_playable = playable;
    }

    pub fn open_challenge(&mut self, offender: usize, challenger: usize, drawn: usize) {
        self.challenge = Some(Challenge {
            offender: self.players[offender].name.clone(),
            challenger: self.players[challenger].name.clone(),
            drawn,
        });
    }

    pub fn challenge(&self) -> Option<&Challenge> {
        self.challenge.as_ref()
    }

    pub fn close_challenge(&mut self) -> Option<Challenge> {
        self.challenge.take()
    }

    /// Adds the value of every losing hand to the winner's score and returns
    /// the points gained.
    pub fn calculate_scores(&mut self, winner: usize) -> u32 {
        let points: u32 = self
            .players
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != winner)
            .flat_map(|(_, p)| p.hand.iter())
            .map(Card::points)
            .sum();
        *self
            .scoreboard
            .entry(self.players[winner].name.clone())
            .or_insert(0) += points;
        points
    }

    /// Swaps the entire hands of two seats.
    pub fn swap_hands(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        let hand = std::mem::take(&mut self.players[a].hand);
        self.players[a].hand = std::mem::replace(&mut self.players[b].hand, hand);
    }

    /// Every player receives the hand of the player behind them in the
    /// current direction of play.
    pub fn pass_down_hands(&mut self) {
        let mut hands: Vec<Vec<Card>> = self
            .players
            .iter_mut()
            .map(|p| std::mem::take(&mut p.hand))
            .collect();
        match self.direction {
            Direction::Clockwise => hands.rotate_right(1),
            Direction::CounterClockwise => hands.rotate_left(1),
        }
        for (player, hand) in self.players.iter_mut().zip(hands) {
            player.hand = hand;
        }
    }

    /// Unseats a player. Their hand is shuffled back into the draw pile, their
    /// score is dropped, and the turn passes to whoever would have been next.
    pub fn remove_player(&mut self, seat: usize) -> Player {
        let was_current = seat == self.current_turn;
        let mut player = self.players.remove(seat);
        self.deck.return_cards(player.hand.drain(..));
        self.scoreboard.remove(&player.name);

        let n = self.players.len();
        if n == 0 {
            self.current_turn = 0;
        } else if was_current {
            self.current_turn = match self.direction {
                Direction::Clockwise => seat % n,
                Direction::CounterClockwise => (seat + n - 1) % n,
            };
        } else if seat < self.current_turn {
            self.current_turn -= 1;
        }
        if let Some(challenge) = &self.challenge {
            if challenge.offender == player.name || challenge.challenger == player.name {
                self.challenge = None;
            }
        }
        player
    }

    /// Per-seat view broadcast before every move.
    pub fn snapshot(&self, seat: usize) -> TurnSnapshot {
        TurnSnapshot {
            top_card: self.current_card,
            indicated_color: self.indicated_color,
            direction: self.direction,
            hand: self.players[seat].hand.clone(),
            players: self
                .players
                .iter()
                .map(|p| SeatSummary {
                    nickname: p.name.clone(),
                    hand_size: p.hand.len(),
                    score: self.score(&p.name),
                })
                .collect(),
            your_turn: seat == self.current_turn,
        }
    }

    /// Cards in the deck plus cards in hands. Always 108 during a round.
    pub fn card_count(&self) -> usize {
        self.deck.len() + self.players.iter().map(|p| p.hand.len()).sum::<usize>()
    }

    pub fn seat_of(&self, name: &str) -> Option<usize> {
        self.players.iter().position(|p| p.name == name)
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn players_mut(&mut self) -> &mut [Player] {
        &mut self.players
    }

    pub fn current_player(&self) -> &Player {
        &self.players[self.current_turn]
    }

    pub fn current_turn(&self) -> usize {
        self.current_turn
    }

    pub fn set_current_turn(&mut self, seat: usize) {
        self.current_turn = seat % self.players.len();
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn current_card(&self) -> Card {
        self.current_card
    }

    pub fn set_current_card(&mut self, card: Card) {
        self.current_card = card;
    }

    pub fn indicated_color(&self) -> Option<Color> {
        self.indicated_color
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn deck_mut(&mut self) -> &mut Deck {
        &mut self.deck
    }

    pub fn scoreboard(&self) -> &HashMap<String, u32> {
        &self.scoreboard
    }

    pub fn score(&self, name: &str) -> u32 {
        self.scoreboard.get(name).copied().unwrap_or(0)
    }

    pub fn set_score(&mut self, name: &str, points: u32) {
        if let Some(score) = self.scoreboard.get_mut(name) {
            *score = points;
        }
    }

    pub fn has_winner(&self) -> bool {
        self.round_winner.is_some()
    }

    pub fn round_winner(&self) -> Option<&str> {
        self.round_winner.as_deref()
    }
}
