use super::events::{describe, Broadcaster, GameEvent, TurnSnapshot};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Oldest entries are dropped once a seat has this many unread.
pub const MAX_QUEUED: usize = 512;

/// One queued message for a remote seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    Event { event: GameEvent },
    Turn { snapshot: TurnSnapshot },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStatus {
    InProgress,
    Complete { winner: Option<String> },
}

/// Outbound queues of one match, keyed by nickname. Only seats registered
/// here receive anything; local seats are not queued.
#[derive(Debug)]
pub struct SessionRegistry {
    queues: Mutex<HashMap<String, VecDeque<Outbound>>>,
    status: Mutex<MatchStatus>,
    last_updated: Mutex<DateTime<Utc>>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            queues: Mutex::new(HashMap::new()),
            status: Mutex::new(MatchStatus::InProgress),
            last_updated: Mutex::new(Utc::now()),
        }
    }

    pub fn register(&self, nickname: &str) {
        if let Ok(mut queues) = self.queues.lock() {
            queues.entry(nickname.to_string()).or_default();
        }
    }

    pub fn is_registered(&self, nickname: &str) -> bool {
        self.queues
            .lock()
            .map(|queues| queues.contains_key(nickname))
            .unwrap_or(false)
    }

    /// Takes everything queued for `nickname`. `None` for unknown seats.
    pub fn drain(&self, nickname: &str) -> Option<Vec<Outbound>> {
        let mut queues = self.queues.lock().ok()?;
        queues
            .get_mut(nickname)
            .map(|queue| queue.drain(..).collect())
    }

    pub fn finish(&self, winner: Option<String>) {
        if let Ok(mut status) = self.status.lock() {
            *status = MatchStatus::Complete { winner };
        }
        self.touch();
    }

    pub fn status(&self) -> MatchStatus {
        self.status
            .lock()
            .map(|status| status.clone())
            .unwrap_or(MatchStatus::InProgress)
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
            .lock()
            .map(|at| *at)
            .unwrap_or_else(|_| Utc::now())
    }

    fn touch(&self) {
        if let Ok(mut at) = self.last_updated.lock() {
            *at = Utc::now();
        }
    }

    fn push(queue: &mut VecDeque<Outbound>, message: Outbound) {
        if queue.len() >= MAX_QUEUED {
            queue.pop_front();
        }
        queue.push_back(message);
    }

    fn enqueue(&self, nickname: &str, message: Outbound) {
        match self.queues.lock() {
            Ok(mut queues) => {
                if let Some(queue) = queues.get_mut(nickname) {
                    Self::push(queue, message);
                }
            }
            Err(_) => warn!("Session queues poisoned, dropping message for {}", nickname),
        }
        self.touch();
    }
}

impl Broadcaster for SessionRegistry {
    fn broadcast(&self, event: &GameEvent) {
        debug!("{}", describe(event));
        if let Ok(mut queues) = self.queues.lock() {
            for queue in queues.values_mut() {
                Self::push(
                    queue,
                    Outbound::Event {
                        event: event.clone(),
                    },
                );
            }
        }
        self.touch();
    }

    fn send(&self, nickname: &str, event: &GameEvent) {
        debug!("[to {}] {}", nickname, describe(event));
        self.enqueue(
            nickname,
            Outbound::Event {
                event: event.clone(),
            },
        );
    }

    fn snapshot(&self, nickname: &str, snapshot: &TurnSnapshot) {
        self.enqueue(
            nickname,
            Outbound::Turn {
                snapshot: snapshot.clone(),
            },
        );
    }
}
