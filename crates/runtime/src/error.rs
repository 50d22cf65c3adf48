pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// The operation was superseded or its owner went away.
    #[error("request cancelled")]
    Cancelled,
    #[error("upstream failure: {0}")]
    Upstream(#[source] BoxError),
    #[error("no tokio runtime available to drive requests")]
    NoRuntime,
}

impl LifecycleError {
    pub fn upstream(err: impl Into<BoxError>) -> Self {
        Self::Upstream(err.into())
    }

    /// Cancellations are dropped silently rather than reported.
    pub fn is_cancel(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
