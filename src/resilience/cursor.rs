//! Per-call position in a candidate list.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Progress of one logical call through the candidate list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FailoverState {
    NotStarted,
    Attempting { index: usize },
    Succeeded { index: usize },
    Exhausted,
}

impl FailoverState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded { .. } | Self::Exhausted)
    }
}

impl fmt::Display for FailoverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not_started"),
            Self::Attempting { index } => write!(f, "attempting({index})"),
            Self::Succeeded { index } => write!(f, "succeeded({index})"),
            Self::Exhausted => write!(f, "exhausted"),
        }
    }
}

/// Single-use cursor over a fixed number of candidates
///
/// Moves forward only and never wraps, so each candidate is tried at most
/// once per call.
#[derive(Debug, Clone)]
pub struct FailoverCursor {
    next: usize,
    candidates: usize,
    state: FailoverState,
}

impl FailoverCursor {
    pub fn new(candidates: usize) -> Self {
        Self {
            next: 0,
            candidates,
            state: FailoverState::NotStarted,
        }
    }

    /// Move to the next candidate; `None` once every candidate was tried
    pub fn advance(&mut self) -> Option<usize> {
        match self.state {
            FailoverState::Succeeded { .. } | FailoverState::Exhausted => None,
            FailoverState::NotStarted | FailoverState::Attempting { .. } => {
                if self.next >= self.candidates {
                    self.state = FailoverState::Exhausted;
                    return None;
                }
                let index = self.next;
                self.next += 1;
                self.state = FailoverState::Attempting { index };
                Some(index)
            }
        }
    }

    /// Mark the current attempt as successful
    pub fn succeed(&mut self) {
        if let FailoverState::Attempting { index } = self.state {
            self.state = FailoverState::Succeeded { index };
        }
    }

    pub fn state(&self) -> FailoverState {
        self.state
    }

    /// Number of candidates handed out so far
    pub fn attempts(&self) -> usize {
        self.next
    }

    pub fn candidates(&self) -> usize {
        self.candidates
    }
}
