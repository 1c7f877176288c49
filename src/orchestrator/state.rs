//! Per-presentation lifecycle.
//!
//! ```text
//! pending -> extracting -> extracted -> scoring -> scored
//!    |            |                        |
//!    +------------+-----------> failed <---+
//! ```
//!
//! `pending -> failed` is taken only by presentations never dispatched (cancellation).
//! [`StateBoard::abort`] fails a presentation from any live state when its worker dies.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::TransitionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresentationState {
    Pending,
    Extracting,
    Extracted,
    Scoring,
    Scored,
    Failed,
}

impl PresentationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PresentationState::Pending => "pending",
            PresentationState::Extracting => "extracting",
            PresentationState::Extracted => "extracted",
            PresentationState::Scoring => "scoring",
            PresentationState::Scored => "scored",
            PresentationState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PresentationState::Scored | PresentationState::Failed)
    }

    /// States that count against the concurrency bound.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            PresentationState::Extracting | PresentationState::Scoring
        )
    }

    pub fn can_advance_to(&self, next: PresentationState) -> bool {
        use PresentationState::*;
        matches!(
            (self, next),
            (Pending, Extracting)
                | (Extracting, Extracted)
                | (Extracted, Scoring)
                | (Scoring, Scored)
                | (Pending | Extracting | Scoring, Failed)
        )
    }
}

impl fmt::Display for PresentationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current state of every presentation in a run.
#[derive(Debug)]
pub struct StateBoard {
    ids: Vec<String>,
    states: Mutex<Vec<PresentationState>>,
    peak_active: AtomicUsize,
}

impl StateBoard {
    pub fn new(ids: Vec<String>) -> Self {
        let states = vec![PresentationState::Pending; ids.len()];
        Self {
            ids,
            states: Mutex::new(states),
            peak_active: AtomicUsize::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<PresentationState> {
        self.states.lock().get(index).copied()
    }

    /// Moves presentation `index` to `next`, rejecting edges the lifecycle lacks.
    pub fn advance(&self, index: usize, next: PresentationState) -> Result<(), TransitionError> {
        let mut states = self.states.lock();
        let id = self.ids.get(index).cloned().unwrap_or_default();
        let Some(current) = states.get(index).copied() else {
            return Err(TransitionError {
                id,
                from: PresentationState::Pending,
                to: next,
            });
        };
        if !current.can_advance_to(next) {
            return Err(TransitionError {
                id,
                from: current,
                to: next,
            });
        }

        states[index] = next;
        let active = states.iter().filter(|s| s.is_active()).count();
        drop(states);

        self.peak_active.fetch_max(active, Ordering::Relaxed);
        debug!(presentation_id = %id, from = %current, to = %next, active, "state transition");
        Ok(())
    }

    /// Presentations currently extracting or scoring.
    pub fn active(&self) -> usize {
        self.states.lock().iter().filter(|s| s.is_active()).count()
    }

    /// Highest number of simultaneously active presentations seen so far.
    pub fn peak_active(&self) -> usize {
        self.peak_active.load(Ordering::Relaxed)
    }

    /// Forces a non-terminal presentation to `failed`, returning the state it left.
    /// Terminal presentations are left alone.
    pub fn abort(&self, index: usize) -> Option<PresentationState> {
        let mut states = self.states.lock();
        let state = states.get_mut(index)?;
        if state.is_terminal() {
            return None;
        }
        let previous = std::mem::replace(state, PresentationState::Failed);
        drop(states);

        debug!(presentation_id = ?self.ids.get(index), from = %previous, "state aborted");
        Some(previous)
    }
}
