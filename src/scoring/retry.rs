//! Bounded-attempt state machine for one scoring request.

use std::time::Duration;

use super::error::{AttemptError, ModelError};
use super::types::FailureReason;
use crate::constants::MAX_BACKOFF_MS;

/// What to do after a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextStep {
    /// Wait, then try again.
    Retry(Duration),
    /// No attempts left (or the error is permanent).
    Exhausted(FailureReason),
}

/// Attempt count, last error and next backoff for one request.
#[derive(Debug, Clone)]
pub struct AttemptState {
    attempts: u32,
    max_attempts: u32,
    next_backoff: Duration,
    last_error: Option<AttemptError>,
}

impl AttemptState {
    pub fn new(max_attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            attempts: 0,
            max_attempts: max_attempts.max(1),
            next_backoff: initial_backoff,
            last_error: None,
        }
    }

    /// Marks the start of an attempt.
    pub fn begin(&mut self) {
        self.attempts += 1;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn last_error(&self) -> Option<&AttemptError> {
        self.last_error.as_ref()
    }

    pub fn next_backoff(&self) -> Duration {
        self.next_backoff
    }

    /// `true` if the previous attempt failed on unparseable output.
    pub fn needs_correction(&self) -> bool {
        matches!(self.last_error, Some(AttemptError::Parse(_)))
    }

    /// Records a failed attempt and decides the next step.
    ///
    /// Backoff doubles per retry, capped at [`MAX_BACKOFF_MS`]; a server-provided
    /// `retry_after` raises the delay but never lowers it.
    pub fn fail(&mut self, error: AttemptError) -> NextStep {
        let retryable = error.is_retryable();
        let retry_after = match &error {
            AttemptError::Model(ModelError::RateLimited { retry_after }) => *retry_after,
            _ => None,
        };
        let failure = error.to_failure();
        self.last_error = Some(error);

        if !retryable || self.attempts >= self.max_attempts {
            return NextStep::Exhausted(failure);
        }

        let cap = Duration::from_millis(MAX_BACKOFF_MS);
        let delay = retry_after.map_or(self.next_backoff, |after| after.max(self.next_backoff));
        let delay = delay.min(cap);
        self.next_backoff = (self.next_backoff * 2).min(cap);
        NextStep::Retry(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::error::ParseError;
    use crate::scoring::types::FailureKind;

    fn timeout() -> AttemptError {
        ModelError::Timeout {
            elapsed: Duration::from_secs(1),
        }
        .into()
    }

    #[test]
    fn test_backoff_doubles_until_exhausted() {
        let mut state = AttemptState::new(3, Duration::from_millis(100));

        state.begin();
        assert_eq!(state.fail(timeout()), NextStep::Retry(Duration::from_millis(100)));
        state.begin();
        assert_eq!(state.fail(timeout()), NextStep::Retry(Duration::from_millis(200)));
        state.begin();
        match state.fail(timeout()) {
            NextStep::Exhausted(reason) => assert_eq!(reason.kind, FailureKind::Timeout),
            other => panic!("expected exhaustion, got {other:?}"),
        }
        assert_eq!(state.attempts(), 3);
    }

    #[test]
    fn test_retry_after_is_a_floor() {
        let mut state = AttemptState::new(5, Duration::from_millis(100));
        state.begin();

        let step = state.fail(
            ModelError::RateLimited {
                retry_after: Some(Duration::from_secs(2)),
            }
            .into(),
        );
        assert_eq!(step, NextStep::Retry(Duration::from_secs(2)));

        state.begin();
        let step = state.fail(
            ModelError::RateLimited {
                retry_after: Some(Duration::from_millis(1)),
            }
            .into(),
        );
        assert_eq!(step, NextStep::Retry(Duration::from_millis(200)));
    }

    #[test]
    fn test_backoff_is_capped() {
        let mut state = AttemptState::new(10, Duration::from_secs(20));
        state.begin();
        state.fail(timeout());
        state.begin();
        assert_eq!(
            state.fail(timeout()),
            NextStep::Retry(Duration::from_millis(MAX_BACKOFF_MS))
        );
    }

    #[test]
    fn test_rejected_request_is_not_retried() {
        let mut state = AttemptState::new(3, Duration::from_millis(10));
        state.begin();

        let step = state.fail(
            ModelError::Rejected {
                status: 400,
                body: "bad model name".to_string(),
            }
            .into(),
        );
        assert!(matches!(step, NextStep::Exhausted(_)));
    }

    #[test]
    fn test_parse_failure_requests_correction() {
        let mut state = AttemptState::new(2, Duration::ZERO);
        state.begin();
        state.fail(ParseError::NoJson.into());

        assert!(state.needs_correction());
        assert!(matches!(state.last_error(), Some(AttemptError::Parse(_))));
    }
}
