//! Error types for live tables.

use thiserror::Error;

/// Result type alias for table operations.
pub type TableResult<T> = Result<T, TableError>;

/// Errors that can occur while wiring a collection into a table.
///
/// Once a bridge is running nothing it does is fatal, so the only failures
/// surfaced here happen while the watch is being established.
#[derive(Debug, Error)]
pub enum TableError {
    /// The initial subscription for a collection could not be established.
    #[error("failed to watch {collection}: {source}")]
    Subscribe {
        /// Name of the collection being watched.
        collection: String,
        /// Underlying client error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl TableError {
    /// Build a subscription error for `collection`.
    pub fn subscribe(
        collection: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Subscribe {
            collection: collection.into(),
            source: source.into(),
        }
    }

    /// Name of the collection the error relates to.
    #[must_use]
    pub fn collection(&self) -> &str {
        match self {
            Self::Subscribe { collection, .. } => collection,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_error_display() {
        let err = TableError::subscribe("pods", "connection refused");
        assert_eq!(err.to_string(), "failed to watch pods: connection refused");
        assert_eq!(err.collection(), "pods");
    }

    #[test]
    fn test_subscribe_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out");
        let err = TableError::subscribe("deployments", io);

        let source = std::error::Error::source(&err);
        assert!(source.is_some());
        assert_eq!(source.map(ToString::to_string).unwrap_or_default(), "timed out");
    }
}
