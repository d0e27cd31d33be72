//! Kubernetes client configuration.

use std::path::PathBuf;

/// Longest server-side watch timeout the API server accepts.
pub const MAX_WATCH_TIMEOUT_SECS: u32 = 290;

/// How the Kubernetes client is built and what it watches.
///
/// The client reads no environment of its own beyond standard kubeconfig
/// discovery, which only runs when `kubeconfig` is unset.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Explicit kubeconfig file. `None` falls back to in-cluster or default
    /// kubeconfig discovery.
    pub kubeconfig: Option<PathBuf>,
    /// Kubeconfig context to use instead of the current one.
    pub context: Option<String>,
    /// Namespace whose deployments and pods are watched.
    pub namespace: String,
    /// Server-side timeout for each watch request.
    pub watch_timeout_secs: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            kubeconfig: None,
            context: None,
            namespace: "default".to_string(),
            watch_timeout_secs: MAX_WATCH_TIMEOUT_SECS,
        }
    }
}

impl ClientConfig {
    /// Create a configuration for the given namespace.
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    /// Read credentials from this kubeconfig file.
    #[must_use]
    pub fn with_kubeconfig(mut self, path: impl Into<PathBuf>) -> Self {
        self.kubeconfig = Some(path.into());
        self
    }

    /// Use this kubeconfig context.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Watch this namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Set the watch timeout, capped at [`MAX_WATCH_TIMEOUT_SECS`].
    #[must_use]
    pub fn with_watch_timeout_secs(mut self, secs: u32) -> Self {
        self.watch_timeout_secs = secs.clamp(1, MAX_WATCH_TIMEOUT_SECS);
        self
    }
}
