//! Error types for the terminal dashboard.

use kt_table::TableError;
use thiserror::Error;

/// Result type alias for dashboard operations.
pub type TuiResult<T> = Result<T, TuiError>;

/// Errors that can stop the dashboard from starting.
#[derive(Debug, Error)]
pub enum TuiError {
    /// The kubeconfig could not be read or resolved.
    #[error("invalid client configuration: {0}")]
    Config(String),

    /// A Kubernetes API call failed.
    #[error("kubernetes api error: {0}")]
    Kube(#[from] kube::Error),

    /// A collection could not be watched.
    #[error(transparent)]
    Table(#[from] TableError),

    /// Terminal setup or drawing failed.
    #[error("terminal error: {0}")]
    Terminal(#[from] std::io::Error),
}
