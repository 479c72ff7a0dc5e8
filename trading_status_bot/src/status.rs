use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicU64, AtomicU8, Ordering},
        Mutex, PoisonError,
    },
    time::Instant,
};

use serde::Serialize;
use teloxide::types::UserId;

use crate::system::HostMonitor;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum BotState {
    Initializing = 0,
    Running = 1,
    Unhealthy = 2,
}

impl BotState {
    fn from_u8(value: u8) -> BotState {
        match value {
            0 => BotState::Initializing,
            1 => BotState::Running,
            _ => BotState::Unhealthy,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BotState::Initializing => "initializing",
            BotState::Running => "running",
            BotState::Unhealthy => "unhealthy",
        }
    }
}

/// Point-in-time copy of the bot's status, as shown to the outside world.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BotStatus {
    pub status: BotState,
    /// Seconds.
    pub uptime: u64,
    pub commands_processed: u64,
    pub users_active: u64,
}

/// Status of the bot, written by the update handlers
/// and read by the web server.
pub struct StatusBoard {
    started: Instant,
    state: AtomicU8,
    commands_processed: AtomicU64,
    users: Mutex<HashSet<UserId>>,
    host: HostMonitor,
}

impl Default for StatusBoard {
    fn default() -> Self {
        StatusBoard::new()
    }
}

impl StatusBoard {
    pub fn new() -> StatusBoard {
        StatusBoard {
            started: Instant::now(),
            state: AtomicU8::new(BotState::Initializing as u8),
            commands_processed: AtomicU64::new(0),
            users: Mutex::new(HashSet::new()),
            host: HostMonitor::new(),
        }
    }

    pub fn state(&self) -> BotState {
        BotState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn set_state(&self, state: BotState) {
        let old = BotState::from_u8(self.state.swap(state as u8, Ordering::AcqRel));
        if old != state {
            log::info!("Bot status: {} -> {}", old.as_str(), state.as_str());
        }
    }

    /// Count a processed command, and remember who sent it, if anyone.
    pub fn record_command(&self, user: Option<UserId>) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
        if let Some(user) = user {
            self.users
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(user);
        }
    }

    pub fn host(&self) -> &HostMonitor {
        &self.host
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    pub fn snapshot(&self) -> BotStatus {
        BotStatus {
            status: self.state(),
            uptime: self.uptime_secs(),
            commands_processed: self.commands_processed.load(Ordering::Relaxed),
            users_active: self
                .users
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .len() as u64,
        }
    }
}
