//! Values that may still be loading.

use std::fmt;
use std::future::Future;

use futures::future::{BoxFuture, FutureExt};

use crate::error::{DiffError, DiffResult};

/// The answer of a provider: available now, or a continuation that resolves
/// once the underlying load finishes.
///
/// Providers return `Ready` whenever the data is already resident, so a diff
/// over fully-loaded trees never suspends.
pub enum Deferred<T> {
    Ready(DiffResult<T>),
    Pending(BoxFuture<'static, DiffResult<T>>),
}

impl<T: Send + 'static> Deferred<T> {
    pub fn ready(value: T) -> Self {
        Self::Ready(Ok(value))
    }

    pub fn failed(err: impl Into<DiffError>) -> Self {
        Self::Ready(Err(err.into()))
    }

    pub fn from_result(result: DiffResult<T>) -> Self {
        Self::Ready(result)
    }

    pub fn pending<F>(load: F) -> Self
    where
        F: Future<Output = DiffResult<T>> + Send + 'static,
    {
        Self::Pending(load.boxed())
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn map<U, F>(self, f: F) -> Deferred<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        match self {
            Self::Ready(result) => Deferred::Ready(result.map(f)),
            Self::Pending(load) => Deferred::Pending(load.map(|r| r.map(f)).boxed()),
        }
    }

    /// Wait for the value, whichever state it is in.
    pub async fn resolve(self) -> DiffResult<T> {
        match self {
            Self::Ready(result) => result,
            Self::Pending(load) => load.await,
        }
    }
}

impl<T> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(Ok(_)) => f.write_str("Deferred::Ready(Ok(..))"),
            Self::Ready(Err(e)) => write!(f, "Deferred::Ready(Err({e}))"),
            Self::Pending(_) => f.write_str("Deferred::Pending"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn ready_resolves_immediately() {
        let d = Deferred::ready(5u32);
        assert!(d.is_ready());
        assert_eq!(d.resolve().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn pending_resolves_after_signal() {
        let (tx, rx) = oneshot::channel::<u32>();
        let d = Deferred::pending(async move { rx.await.map_err(|_| DiffError::Abandoned) });
        assert!(!d.is_ready());

        let task = tokio::spawn(d.map(|v| v * 2).resolve());
        tx.send(21).unwrap();
        assert_eq!(task.await.unwrap().unwrap(), 42);
    }

    #[tokio::test]
    async fn dropped_source_is_abandoned() {
        let (tx, rx) = oneshot::channel::<u32>();
        let d = Deferred::pending(async move { rx.await.map_err(|_| DiffError::Abandoned) });
        drop(tx);
        assert!(matches!(d.resolve().await, Err(DiffError::Abandoned)));
    }

    #[test]
    fn debug_shows_state() {
        let failed: Deferred<()> = Deferred::failed(DiffError::Abandoned);
        assert_eq!(format!("{failed:?}"), "Deferred::Ready(Err(load abandoned before completion))");
        let pending: Deferred<()> = Deferred::pending(async { Ok(()) });
        assert_eq!(format!("{pending:?}"), "Deferred::Pending");
    }
}
