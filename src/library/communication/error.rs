use thiserror::Error;

/// Errors that may occur while interacting with the event log
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// Log could not be reached or the transport failed while talking to it
    #[error("event log is unavailable: {0}")]
    Unavailable(String),
    /// Entry could not be decoded into the expected structure
    #[error("malformed queue entry: {0}")]
    Malformed(String),
    /// Subscription has been closed by the log
    #[error("subscription has been closed")]
    Closed,
}

impl QueueError {
    /// Whether the error originates from the transport rather than the data
    pub fn is_transport_fault(&self) -> bool {
        !matches!(self, QueueError::Malformed(_))
    }
}

#[cfg(test)]
mod does {
    use super::*;

    #[test]
    fn classify_transport_faults() {
        assert!(QueueError::Unavailable("connection refused".into()).is_transport_fault());
        assert!(QueueError::Closed.is_transport_fault());
        assert!(!QueueError::Malformed("expected value".into()).is_transport_fault());
    }
}
