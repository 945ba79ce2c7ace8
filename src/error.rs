use std::sync::Arc;

use thiserror::Error;

type BoxedError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Failure carried by [`Either::Failure`](crate::Either::Failure).
///
/// Cloning is cheap; one failure is handed to every observer of a promise.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// A `filter` predicate rejected the value.
    #[error("filter not passed")]
    FilterNotPassed,
    /// `select` was given no promises to race.
    #[error("nothing to select from")]
    NothingToSelect,
    #[error("promise work panicked: {0}")]
    Panicked(String),
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Other(BoxedError),
}

impl Error {
    /// Wrap any error value.
    pub fn new<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Other(Arc::new(err))
    }

    pub fn msg(message: impl Into<String>) -> Self {
        Error::Message(message.into())
    }

    /// Borrow the wrapped error as `E`, if that is what it is.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        match self {
            Error::Other(inner) => inner.downcast_ref::<E>(),
            _ => None,
        }
    }

    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_owned()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_owned()
        };
        Error::Panicked(message)
    }
}

impl From<String> for Error {
    fn from(message: String) -> Self {
        Error::Message(message)
    }
}

impl From<&str> for Error {
    fn from(message: &str) -> Self {
        Error::Message(message.to_owned())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::new(err)
    }
}
