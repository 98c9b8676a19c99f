use std::error::Error;
use std::sync::Mutex;
use tracing::warn;

/// Logging capability injected into the echo handlers
///
/// Handlers never fail a request because of a copy or formatting problem;
/// they report it here and carry on with what they have.
pub trait EchoLogger: Send + Sync {
    /// Reports a recoverable failure together with what was being attempted
    fn failure(&self, context: &str, error: &dyn Error);
}

/// Logger that forwards failures to `tracing` at WARN level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl EchoLogger for TracingLogger {
    fn failure(&self, context: &str, error: &dyn Error) {
        warn!(error = %error, "{context}");
    }
}

/// Logger that keeps every failure in memory, for asserting on in tests
///
/// Records are formatted as `"<context>: <error>"`.
///
/// ```
/// use echosrv::{EchoLogger, MemoryLogger};
///
/// let logger = MemoryLogger::new();
/// let err = std::io::Error::other("boom");
/// logger.failure("copying request into buffer failed", &err);
/// assert_eq!(logger.records(), vec!["copying request into buffer failed: boom"]);
/// ```
#[derive(Debug, Default)]
pub struct MemoryLogger {
    records: Mutex<Vec<String>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything logged so far
    pub fn records(&self) -> Vec<String> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }
}

impl EchoLogger for MemoryLogger {
    fn failure(&self, context: &str, error: &dyn Error) {
        let record = format!("{context}: {error}");
        match self.records.lock() {
            Ok(mut records) => records.push(record),
            Err(poisoned) => poisoned.into_inner().push(record),
        }
    }
}
