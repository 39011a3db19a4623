//! Notification handler doubles.
//!
//! Both doubles write to a shared [`CallLog`], so a test can assert which
//! handlers ran and in what order across a whole publish.

use std::sync::{Arc, Mutex, PoisonError};
use tidy_core::{CancellationToken, DomainEvent, HandlerError, NotificationHandler};

/// Ordered record of handler invocations, shared between doubles.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one entry.
    pub fn record(&self, entry: impl Into<String>) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.into());
    }

    /// Snapshot of all entries so far.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

/// Handler that records `"<label>:<event name>"` and succeeds.
#[derive(Debug, Clone)]
pub struct RecordingHandler {
    label: String,
    log: CallLog,
}

impl RecordingHandler {
    /// Create a recording handler writing to `log`.
    #[must_use]
    pub fn new(label: impl Into<String>, log: &CallLog) -> Self {
        Self {
            label: label.into(),
            log: log.clone(),
        }
    }
}

impl<E: DomainEvent> NotificationHandler<E> for RecordingHandler {
    async fn handle(&self, event: &E, _cancellation: &CancellationToken) -> Result<(), HandlerError> {
        self.log
            .record(format!("{}:{}", self.label, event.event_name()));
        Ok(())
    }
}

/// Handler that records its invocation and then fails.
#[derive(Debug, Clone)]
pub struct FailingHandler {
    label: String,
    log: CallLog,
}

impl FailingHandler {
    /// Create a failing handler writing to `log`.
    #[must_use]
    pub fn new(label: impl Into<String>, log: &CallLog) -> Self {
        Self {
            label: label.into(),
            log: log.clone(),
        }
    }
}

impl<E: DomainEvent> NotificationHandler<E> for FailingHandler {
    async fn handle(&self, event: &E, _cancellation: &CancellationToken) -> Result<(), HandlerError> {
        self.log
            .record(format!("{}:{}", self.label, event.event_name()));
        Err(HandlerError::failed(format!("{} refused", self.label)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Pinged;

    impl DomainEvent for Pinged {
        fn event_name(&self) -> &'static str {
            "Pinged"
        }
    }

    #[tokio::test]
    async fn test_doubles_share_log() {
        let log = CallLog::new();
        let token = CancellationToken::new();

        RecordingHandler::new("ok", &log).handle(&Pinged, &token).await.unwrap();
        let failed = FailingHandler::new("bad", &log).handle(&Pinged, &token).await;

        assert!(failed.is_err());
        assert_eq!(log.entries(), vec!["ok:Pinged", "bad:Pinged"]);
    }
}
