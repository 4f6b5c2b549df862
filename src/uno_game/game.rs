use super::card::{Card, Color};
use super::config::{validate_hand_size, validate_nicknames, MatchConfig};
use super::deck::Deck;
use super::events::{Broadcaster, GameEvent};
use super::mode::{PlayingMode, Prompter};
use super::moves::Move;
use super::player::{
    first_other_player, most_common_color, ComputerInput, InputSource, Player, PlayerKind,
    TurnView,
};
use super::table::Table;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    InvalidMove,
    CardNotInHand,
    InvalidToken(String),
    NoChallengePending,
    UnknownPlayer(String),
    DuplicateNickname(String),
    PlayerCount(usize),
    MailboxClosed,
    GameAlreadyOver,
    EmptyDeck,
    Other(String),
}

impl std::fmt::Display for GameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameError::InvalidMove => write!(f, "Invalid move"),
            GameError::CardNotInHand => write!(f, "Card not in hand"),
            GameError::InvalidToken(token) => write!(f, "Invalid input: {:?}", token),
            GameError::NoChallengePending => write!(f, "There is no draw four to challenge"),
            GameError::UnknownPlayer(name) => write!(f, "Unknown player: {}", name),
            GameError::DuplicateNickname(name) => write!(f, "Nickname already taken: {}", name),
            GameError::PlayerCount(n) => write!(f, "A match needs 2 to 10 players, got {}", n),
            GameError::MailboxClosed => write!(f, "Player is no longer seated"),
            GameError::GameAlreadyOver => write!(f, "Game is already over"),
            GameError::EmptyDeck => write!(f, "Deck is empty"),
            GameError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for GameError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingMove,
    ResolvingEffect,
    RoundOver,
    GameOver,
}

/// What the engine does after a move was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The turn is over.
    Advance,
    /// The same player moves again.
    Again,
    /// The player left; the turn pointer already names the next player.
    Removed,
}

/// A seat to be filled at match setup.
pub struct Participant {
    pub nickname: String,
    pub kind: PlayerKind,
    pub input: Box<dyn InputSource>,
}

impl Participant {
    pub fn new(nickname: impl Into<String>, kind: PlayerKind, input: Box<dyn InputSource>) -> Self {
        Self {
            nickname: nickname.into(),
            kind,
            input,
        }
    }

    pub fn computer(nickname: impl Into<String>) -> Self {
        Self::new(nickname, PlayerKind::Computer, Box::new(ComputerInput::new()))
    }
}

/// Input sources keyed by nickname plus the outbound side. A participant
/// whose input is gone, or who answered `leave`, gets the computer's answer
/// to any prompt still pending.
pub struct Seats {
    inputs: HashMap<String, Box<dyn InputSource>>,
    broadcaster: Arc<dyn Broadcaster>,
}

impl Seats {
    fn ask(
        &mut self,
        table: &Table,
        mode: PlayingMode,
        seat: usize,
        ask: impl FnOnce(&mut dyn InputSource, &TurnView<'_>) -> String,
    ) -> String {
        let view = TurnView::new(table, mode, seat);
        match self.inputs.get_mut(&view.me().name) {
            Some(input) => ask(input.as_mut(), &view),
            None => "leave".to_string(),
        }
    }

    fn reject(&self, nickname: &str, reason: impl ToString) {
        self.broadcaster.send(
            nickname,
            &GameEvent::InvalidMove {
                player: nickname.to_string(),
                reason: reason.to_string(),
            },
        );
    }

    pub fn next_move(&mut self, table: &Table, mode: PlayingMode, seat: usize) -> String {
        self.ask(table, mode, seat, |input, view| input.next_move(view))
    }

    /// Asks whether a playable card that was just drawn should be played.
    pub fn retain_drawn_card(&mut self, table: &Table, mode: PlayingMode, seat: usize, card: Card) -> bool {
        let nickname = table.players()[seat].name.clone();
        loop {
            self.broadcaster.send(
                &nickname,
                &GameEvent::DrewPlayableCard {
                    player: nickname.clone(),
                    card,
                },
            );
            let answer = self.ask(table, mode, seat, |input, view| input.retain_drawn_card(view, &card));
            match answer.parse::<Move>() {
                Ok(Move::Proceed) => return true,
                Ok(Move::Skip) | Ok(Move::Leave) => return false,
                _ => self.reject(&nickname, "answer proceed or skip"),
            }
        }
    }

    pub fn remove(&mut self, nickname: &str) {
        self.inputs.remove(nickname);
    }

    fn snapshots(&self, table: &Table) {
        for (seat, player) in table.players().iter().enumerate() {
            self.broadcaster.snapshot(&player.name, &table.snapshot(seat));
        }
    }
}

impl Prompter for Seats {
    fn pick_color(&mut self, table: &Table, mode: PlayingMode, seat: usize) -> Color {
        let nickname = table.players()[seat].name.clone();
        loop {
            self.broadcaster.send(
                &nickname,
                &GameEvent::ColorRequested {
                    player: nickname.clone(),
                },
            );
            let answer = self.ask(table, mode, seat, |input, view| input.pick_color(view));
            if answer.trim().eq_ignore_ascii_case("leave") {
                return most_common_color(&table.players()[seat].hand);
            }
            match answer.parse::<Color>() {
                Ok(color) if color != Color::Wild => return color,
                _ => self.reject(&nickname, format!("{:?} is not a color", answer.trim())),
            }
        }
    }

    fn choose_swap_target(&mut self, table: &Table, mode: PlayingMode, seat: usize) -> usize {
        let nickname = table.players()[seat].name.clone();
        loop {
            self.broadcaster.send(
                &nickname,
                &GameEvent::SwapTargetRequested {
                    player: nickname.clone(),
                },
            );
            let answer = self.ask(table, mode, seat, |input, view| input.choose_swap_target(view));
            let answer = answer.trim();
            if answer.eq_ignore_ascii_case("leave") {
                return first_other_player(table, seat)
                    .and_then(|name| table.seat_of(&name))
                    .unwrap_or(seat);
            }
            match table.seat_of(answer) {
                Some(target) if target != seat => return target,
                _ => self.reject(&nickname, format!("{:?} is not another player", answer)),
            }
        }
    }

    fn notify(&mut self, event: GameEvent) {
        self.broadcaster.broadcast(&event);
    }

    fn tell(&mut self, nickname: &str, event: GameEvent) {
        self.broadcaster.send(nickname, &event);
    }
}

/// Runs one match: turns, rounds, and game end.
pub struct GameEngine {
    table: Table,
    mode: PlayingMode,
    seats: Seats,
    phase: Phase,
    config: MatchConfig,
    rng: StdRng,
}

impl GameEngine {
    pub fn new(
        config: MatchConfig,
        participants: Vec<Participant>,
        broadcaster: Arc<dyn Broadcaster>,
    ) -> Result<Self, GameError> {
        validate_nicknames(participants.iter().map(|p| p.nickname.as_str()))?;
        validate_hand_size(config.hand_size)?;

        let mut rng = StdRng::seed_from_u64(config.seed.unwrap_or_else(rand::random));
        let mut players = Vec::with_capacity(participants.len());
        let mut inputs = HashMap::new();
        for participant in participants {
            players.push(Player::new(participant.nickname.clone(), participant.kind));
            inputs.insert(participant.nickname, participant.input);
        }
        let table = Table::new(players, Deck::new(rng.random()), config.hand_size)?;

        Ok(Self {
            table,
            mode: PlayingMode::new(config.mode),
            seats: Seats {
                inputs,
                broadcaster,
            },
            phase: Phase::AwaitingMove,
            config,
            rng,
        })
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut Table {
        &mut self.table
    }

    pub fn mode(&self) -> PlayingMode {
        self.mode
    }

    pub fn mode_mut(&mut self) -> &mut PlayingMode {
        &mut self.mode
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Plays the match to the end and returns the winner's nickname, or
    /// `None` if nobody is left at the table.
    pub fn run(&mut self) -> Option<String> {
        info!(
            "Starting {} match with {} players",
            self.mode.kind(),
            self.table.players().len()
        );
        self.start_round();
        loop {
            if self.table.players().len() <= 1 || self.game_winner().is_some() {
                return self.end_game();
            }
            self.play_turn();
            if self.table.has_winner() {
                if let Err(e) = self.finish_round() {
                    warn!("Could not set up the next round: {}", e);
                    return self.end_game();
                }
            }
        }
    }

    /// Picks a dealer, gives the first turn to the seat after them and
    /// applies the first card.
    pub fn start_round(&mut self) {
        let dealer = self.choose_dealer();
        self.table.set_current_turn(dealer + 1);
        info!(
            "{} deals, {} starts, first card is {}",
            self.table.players()[dealer].name,
            self.table.current_player().name,
            self.table.current_card()
        );
        self.seats.notify(GameEvent::RoundStarted {
            dealer: self.table.players()[dealer].name.clone(),
            first_card: self.table.current_card(),
        });
        self.phase = Phase::ResolvingEffect;
        self.mode
            .adjust_to_first_card(&mut self.table, &mut self.seats);
        self.phase = Phase::AwaitingMove;
    }

    /// One card per seat from a fresh deck until somebody draws a numeral.
    fn choose_dealer(&mut self) -> usize {
        loop {
            let mut deck = Deck::new(self.rng.random());
            let dealt = deck.draw(self.table.players().len());
            for (player, card) in self.table.players().iter().zip(&dealt) {
                debug!("{} drew {} for the deal", player.name, card);
            }
            if let Some(dealer) = find_dealer(&dealt) {
                return dealer;
            }
            debug!("No numeral was dealt, dealing again");
        }
    }

    /// Asks the current player for moves until one ends their turn.
    pub fn play_turn(&mut self) {
        self.phase = Phase::AwaitingMove;
        self.seats.snapshots(&self.table);
        loop {
            let seat = self.table.current_turn();
            let nickname = self.table.current_player().name.clone();
            let token = self.seats.next_move(&self.table, self.mode, seat);
            match self.apply(&token) {
                Ok(MoveOutcome::Advance) | Ok(MoveOutcome::Removed) => return,
                Ok(MoveOutcome::Again) => self.seats.snapshots(&self.table),
                Err(e) => {
                    debug!("Rejected {:?} from {}: {}", token, nickname, e);
                    self.seats.reject(&nickname, e);
                }
            }
        }
    }

    /// Applies a move of the current player and, if it ends the turn, passes
    /// the turn on.
    pub fn apply(&mut self, token: &str) -> Result<MoveOutcome, GameError> {
        if self.phase == Phase::GameOver {
            return Err(GameError::GameAlreadyOver);
        }
        let outcome = self.handle_move(token)?;
        if outcome == MoveOutcome::Advance {
            self.table.next_turn();
        }
        self.phase = Phase::AwaitingMove;
        Ok(outcome)
    }

    /// Applies a move of the current player without touching the turn
    /// pointer. Errors leave the table unchanged.
    pub fn handle_move(&mut self, token: &str) -> Result<MoveOutcome, GameError> {
        let seat = self.table.current_turn();
        let mv: Move = token.parse()?;

        if self.mode.forward_count() > 0 {
            return match mv {
                Move::Skip | Move::Draw => {
                    let amount = self.mode.forward_count() as usize;
                    self.mode.set_forward_count(0);
                    self.draw_cards(seat, amount);
                    Ok(MoveOutcome::Advance)
                }
                Move::Play { index, uno } => self.play(seat, index, uno),
                Move::Leave => Ok(self.leave(seat)),
                Move::Challenge | Move::Proceed => Err(GameError::InvalidMove),
            };
        }

        match mv {
            Move::Draw => {
                self.forfeit_challenge(seat);
                self.draw_one(seat);
                Ok(MoveOutcome::Advance)
            }
            Move::Skip => {
                self.forfeit_challenge(seat);
                Ok(MoveOutcome::Advance)
            }
            Move::Challenge => self.challenge(seat),
            Move::Play { index, uno } => self.play(seat, index, uno),
            Move::Leave => Ok(self.leave(seat)),
            Move::Proceed => Err(GameError::InvalidMove),
        }
    }

    fn play(&mut self, seat: usize, index: usize, uno: bool) -> Result<MoveOutcome, GameError> {
        let hand = &self.table.players()[seat].hand;
        let card = *hand.get(index).ok_or(GameError::CardNotInHand)?;
        let hand_size = hand.len();
        if !self.mode.valid_move(&card, &self.table) {
            return Err(GameError::InvalidMove);
        }
        self.forfeit_challenge(seat);
        self.place(seat, index, hand_size == 2 && !uno)?;
        Ok(MoveOutcome::Advance)
    }

    /// Plays a card and resolves its effect. A player who goes down to one
    /// card without calling uno is caught and draws two.
    fn place(&mut self, seat: usize, index: usize, missed_uno: bool) -> Result<(), GameError> {
        self.phase = Phase::ResolvingEffect;
        let card = self.table.place_card(seat, index)?;
        self.table.reset_indicated_color();
        let nickname = self.table.players()[seat].name.clone();
        info!("{} played {}", nickname, card);
        self.seats.notify(GameEvent::CardPlayed {
            player: nickname.clone(),
            card,
        });

        self.mode
            .perform_card_action(card, &mut self.table, &mut self.seats);

        // After the effect: a swap or the draw four check must not see the
        // penalty cards.
        if missed_uno && !self.table.has_winner() {
            self.seats.tell(
                &nickname,
                GameEvent::GameMessage {
                    text: "You didn't say uno. You were punished with 2 cards!".to_string(),
                },
            );
            self.draw_cards(seat, 2);
        }
        Ok(())
    }

    /// Draws one card; if it can be played the player may play it at once.
    fn draw_one(&mut self, seat: usize) {
        let drawn = self.draw_cards(seat, 1);
        self.table.set_draw_four_playable(true);
        let Some(card) = drawn.first().copied() else {
            return;
        };
        if !self.mode.valid_move(&card, &self.table) {
            return;
        }
        if self
            .seats
            .retain_drawn_card(&self.table, self.mode, seat, card)
        {
            let index = self.table.players()[seat].hand.len() - 1;
            if let Err(e) = self.place(seat, index, false) {
                warn!("Could not play drawn card {}: {}", card, e);
            }
        }
    }

    fn draw_cards(&mut self, seat: usize, amount: usize) -> Vec<Card> {
        let drawn = self.table.draw(seat, amount);
        self.seats.notify(GameEvent::CardDrawn {
            player: self.table.players()[seat].name.clone(),
            count: drawn.len(),
        });
        drawn
    }

    /// Only the player who had to draw four may challenge, and only before
    /// doing anything else on their turn.
    fn challenge(&mut self, seat: usize) -> Result<MoveOutcome, GameError> {
        let nickname = self.table.players()[seat].name.clone();
        match self.table.challenge() {
            Some(challenge) if challenge.challenger == nickname => {}
            _ => return Err(GameError::NoChallengePending),
        }
        let Some(challenge) = self.table.close_challenge() else {
            return Err(GameError::NoChallengePending);
        };

        let succeeded = !self.table.is_draw_four_playable();
        info!(
            "{} challenges {}'s draw four: {}",
            nickname,
            challenge.offender,
            if succeeded { "upheld" } else { "rejected" }
        );
        self.seats.notify(GameEvent::ChallengeResolved {
            challenger: nickname,
            succeeded,
        });

        if succeeded {
            if let Some(offender) = self.table.seat_of(&challenge.offender) {
                self.draw_cards(offender, 4);
            }
            self.table.return_last_cards(seat, challenge.drawn);
            self.table.set_draw_four_playable(true);
            Ok(MoveOutcome::Again)
        } else {
            self.draw_cards(seat, 2);
            Ok(MoveOutcome::Advance)
        }
    }

    fn forfeit_challenge(&mut self, seat: usize) {
        let nickname = &self.table.players()[seat].name;
        if self
            .table
            .challenge()
            .is_some_and(|challenge| &challenge.challenger == nickname)
        {
            self.table.close_challenge();
        }
    }

    /// Forced skip-and-remove. Nothing already applied is rolled back.
    fn leave(&mut self, seat: usize) -> MoveOutcome {
        let player = self.table.remove_player(seat);
        self.seats.remove(&player.name);
        self.mode.set_forward_count(0);
        info!("{} left the game", player.name);
        self.seats.notify(GameEvent::PlayerLeft {
            player: player.name,
        });
        MoveOutcome::Removed
    }

    fn finish_round(&mut self) -> Result<(), GameError> {
        self.phase = Phase::RoundOver;
        let winner = self.table.round_winner().unwrap_or_default().to_string();
        info!(
            "{} won the round and has {} points",
            winner,
            self.table.score(&winner)
        );
        self.seats.notify(GameEvent::RoundEnded { winner });

        if self.game_winner().is_some() {
            return Ok(());
        }
        self.table.setup_round(Deck::new(self.rng.random()))?;
        self.mode.set_forward_count(0);
        self.start_round();
        Ok(())
    }

    /// The last player standing, or the highest score once it reaches the
    /// winning score.
    pub fn game_winner(&self) -> Option<String> {
        let players = self.table.players();
        if players.len() == 1 {
            return Some(players[0].name.clone());
        }
        players
            .iter()
            .map(|p| (self.table.score(&p.name), &p.name))
            .filter(|(score, _)| *score >= self.config.winning_score)
            .max_by_key(|(score, _)| *score)
            .map(|(_, name)| name.clone())
    }

    fn end_game(&mut self) -> Option<String> {
        self.phase = Phase::GameOver;
        let winner = self.game_winner();
        match &winner {
            Some(winner) => {
                info!("{} won the game", winner);
                self.seats.notify(GameEvent::GameEnded {
                    winner: winner.clone(),
                });
            }
            None => info!("Match ended with nobody left at the table"),
        }
        winner
    }
}

/// Index of the highest numeral among cards dealt one per seat. Action and
/// wild cards never qualify; the first of equal cards wins.
pub fn find_dealer(dealt: &[Card]) -> Option<usize> {
    let mut best: Option<(usize, u8)> = None;
    for (seat, card) in dealt.iter().enumerate() {
        let rank = card.card_type.rank();
        if rank > 4 && best.map_or(true, |(_, top)| rank > top) {
            best = Some((seat, rank));
        }
    }
    best.map(|(seat, _)| seat)
}
