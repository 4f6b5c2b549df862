use super::card::Card;
use super::game::GameError;
use super::player::{InputSource, TurnView};
use log::debug;
use tokio::sync::mpsc;

const LEAVE: &str = "leave";

/// Creates a single-slot mailbox. The sender side is handed to whatever
/// decodes a remote participant's input; the receiving side belongs to the
/// engine thread.
pub fn mailbox() -> (MailboxSender, Mailbox) {
    let (tx, rx) = mpsc::channel(1);
    (MailboxSender { tx }, Mailbox { rx })
}

#[derive(Debug, Clone)]
pub struct MailboxSender {
    tx: mpsc::Sender<String>,
}

impl MailboxSender {
    /// Deposits a move, blocking while the previous one is still unread.
    /// Must not be called from inside an async runtime.
    pub fn deposit(&self, token: impl Into<String>) -> Result<(), GameError> {
        self.tx
            .blocking_send(token.into())
            .map_err(|_| GameError::MailboxClosed)
    }

    /// Async variant of [`MailboxSender::deposit`] for request handlers.
    pub async fn deposit_async(&self, token: impl Into<String>) -> Result<(), GameError> {
        self.tx
            .send(token.into())
            .await
            .map_err(|_| GameError::MailboxClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[derive(Debug)]
pub struct Mailbox {
    rx: mpsc::Receiver<String>,
}

impl Mailbox {
    /// Blocks until a move is deposited, then takes it. `None` once every
    /// sender is gone.
    pub fn await_move(&mut self) -> Option<String> {
        self.rx.blocking_recv()
    }
}

/// Input of a participant connected over the network.
#[derive(Debug)]
pub struct RemoteInput {
    mailbox: Mailbox,
    departed: bool,
}

impl RemoteInput {
    pub fn new(mailbox: Mailbox) -> Self {
        Self {
            mailbox,
            departed: false,
        }
    }

    /// Once the participant has left, or the mailbox closed, every later
    /// answer is `leave`.
    fn answer(&mut self) -> String {
        if self.departed {
            return LEAVE.to_string();
        }
        match self.mailbox.await_move() {
            Some(token) => {
                if token.trim().eq_ignore_ascii_case(LEAVE) {
                    self.departed = true;
                }
                token
            }
            None => {
                debug!("Mailbox closed, treating participant as departed");
                self.departed = true;
                LEAVE.to_string()
            }
        }
    }
}

impl InputSource for RemoteInput {
    fn next_move(&mut self, _view: &TurnView<'_>) -> String {
        self.answer()
    }

    fn pick_color(&mut self, _view: &TurnView<'_>) -> String {
        self.answer()
    }

    fn choose_swap_target(&mut self, _view: &TurnView<'_>) -> String {
        self.answer()
    }

    fn retain_drawn_card(&mut self, _view: &TurnView<'_>, _card: &Card) -> String {
        self.answer()
    }
}
