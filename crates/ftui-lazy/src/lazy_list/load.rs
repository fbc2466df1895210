#![forbid(unsafe_code)]

//! Loader results and the single failure kind they can produce.
//!
//! A loader returns a [`Load<T>`]: either a value that is already known
//! (`Ready`) or a local future that resolves later (`Deferred`). Both shapes
//! are awaited the same way by the dispatch task, so a ready value is still
//! applied asynchronously.

use std::error::Error;
use std::fmt;
use std::future::Future;

use futures::future::{FutureExt, LocalBoxFuture};
use futures::task::SpawnError;
use thiserror::Error;

/// Why a load produced no list.
///
/// Displays as the underlying error, so `LoadFailure::msg("boom")` prints
/// `boom`.
#[derive(Debug, Error)]
pub enum LoadFailure {
    /// A plain error message raised by the loader.
    #[error("{0}")]
    Message(String),

    /// A typed error raised by the loader.
    #[error(transparent)]
    Source(Box<dyn Error + Send + Sync + 'static>),

    /// The load could not be scheduled on the executor.
    #[error("could not schedule load: {0}")]
    Spawn(#[from] SpawnError),
}

impl LoadFailure {
    /// A failure carrying only a message.
    #[must_use]
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    /// Wrap a typed error. Display and `source()` pass through to `err`.
    #[must_use]
    pub fn new(err: impl Error + Send + Sync + 'static) -> Self {
        Self::Source(Box::new(err))
    }
}

impl From<String> for LoadFailure {
    fn from(message: String) -> Self {
        Self::Message(message)
    }
}

impl From<&str> for LoadFailure {
    fn from(message: &str) -> Self {
        Self::Message(message.to_owned())
    }
}

impl From<std::io::Error> for LoadFailure {
    fn from(err: std::io::Error) -> Self {
        Self::new(err)
    }
}

/// The outcome of calling a loader.
pub enum Load<T> {
    /// Known immediately, successfully or not.
    Ready(Result<Vec<T>, LoadFailure>),
    /// Resolves later on the binding's executor.
    Deferred(LocalBoxFuture<'static, Result<Vec<T>, LoadFailure>>),
}

impl<T: 'static> Load<T> {
    /// Wrap a future that resolves to the list.
    pub fn deferred<F, E>(future: F) -> Self
    where
        F: Future<Output = Result<Vec<T>, E>> + 'static,
        E: Into<LoadFailure>,
    {
        Self::Deferred(future.map(|r| r.map_err(Into::into)).boxed_local())
    }

    /// A loader that failed before producing a future.
    pub fn failed(err: impl Into<LoadFailure>) -> Self {
        Self::Ready(Err(err.into()))
    }

    pub(crate) async fn resolve(self) -> Result<Vec<T>, LoadFailure> {
        match self {
            Self::Ready(result) => result,
            Self::Deferred(future) => future.await,
        }
    }
}

impl<T> From<Vec<T>> for Load<T> {
    fn from(list: Vec<T>) -> Self {
        Self::Ready(Ok(list))
    }
}

impl<T, E: Into<LoadFailure>> From<Result<Vec<T>, E>> for Load<T> {
    fn from(result: Result<Vec<T>, E>) -> Self {
        Self::Ready(result.map_err(Into::into))
    }
}

impl<T: fmt::Debug> fmt::Debug for Load<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(result) => f.debug_tuple("Ready").field(result).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}
