/// Live / simulated execution mode
///
/// The switch is one-way: once the remote service fails a workflow submission, every later
/// submission is answered locally for the rest of the session.

use std::fmt;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Requests go to the remote service
    Live,
    /// Submissions are fabricated locally (development mode)
    Simulated,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Live => f.write_str("live"),
            Mode::Simulated => f.write_str("simulated"),
        }
    }
}

/// Shared sticky mode flag; clones observe the same switch
#[derive(Debug, Clone, Default)]
pub struct ModeSwitch {
    simulated: Arc<AtomicBool>,
}

impl ModeSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Mode {
        if self.is_simulated() {
            Mode::Simulated
        } else {
            Mode::Live
        }
    }

    pub fn is_simulated(&self) -> bool {
        self.simulated.load(Ordering::Acquire)
    }

    /// Switch to simulated mode; returns true only for the call that flipped it
    pub fn enter_simulated(&self, reason: &str) -> bool {
        let flipped = !self.simulated.swap(true, Ordering::AcqRel);
        if flipped {
            tracing::warn!("⚠️ Remote service unavailable ({}), switching to simulated mode", reason);
        }
        flipped
    }
}
