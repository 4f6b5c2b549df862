pub mod api;
pub mod card;
pub mod config;
pub mod controller;
pub mod deck;
pub mod events;
pub mod game;
pub mod mailbox;
pub mod mode;
pub mod moves;
pub mod player;
pub mod session;
pub mod table;
pub mod ui;

pub use card::{Card, CardType, Color};
pub use config::MatchConfig;
pub use controller::GameController;
pub use events::{Broadcaster, GameEvent, LogBroadcaster, TurnSnapshot};
pub use game::{GameEngine, GameError, Participant};
pub use mode::ModeKind;
pub use player::{ComputerInput, InputSource, Player, PlayerKind};
pub use session::SessionRegistry;
pub use table::{Direction, Table};
