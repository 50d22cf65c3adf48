use std::future::Future;
use std::pin::Pin;

use tokio::task::JoinHandle;

use crate::error::LifecycleError;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The pending outcome of an update.
///
/// Updaters either hand back a plain future, which the controller drives, or a
/// task they already spawned. An aborted task resolves as a cancellation.
pub enum Deferred<T> {
    Future(BoxFuture<'static, Result<T, LifecycleError>>),
    Task(JoinHandle<Result<T, LifecycleError>>),
}

impl<T: Send + 'static> Deferred<T> {
    pub fn future<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, LifecycleError>> + Send + 'static,
    {
        Self::Future(Box::pin(future))
    }

    /// Spawns `future` on the current runtime. Must be called from within one.
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, LifecycleError>> + Send + 'static,
    {
        Self::Task(tokio::spawn(future))
    }

    pub fn ready(result: Result<T, LifecycleError>) -> Self {
        Self::future(std::future::ready(result))
    }

    /// Aborts a spawned update. Plain futures are cancelled by dropping them.
    pub fn abort(&self) {
        if let Self::Task(handle) = self {
            handle.abort();
        }
    }

    pub async fn resolve(self) -> Result<T, LifecycleError> {
        match self {
            Self::Future(future) => future.await,
            Self::Task(handle) => match handle.await {
                Ok(result) => result,
                Err(err) if err.is_cancelled() => Err(LifecycleError::Cancelled),
                Err(err) => Err(LifecycleError::upstream(err)),
            },
        }
    }
}

impl<T> std::fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Future(_) => f.write_str("Deferred::Future"),
            Self::Task(handle) => f
                .debug_tuple("Deferred::Task")
                .field(&handle.is_finished())
                .finish(),
        }
    }
}
