use std::fmt;

use crate::Error;

/// The settled outcome of a [`Promise`](crate::Promise): either the value it
/// produced or the failure it carries.
///
/// # Examples
///
/// ```
/// use promissory::{Either, Error};
/// let ok: Either<i32> = Either::Result(4);
/// assert!(ok.has_result());
/// assert_eq!(ok.result(), Some(&4));
///
/// let failed: Either<i32> = Either::Failure(Error::msg("💥"));
/// assert!(failed.is_failure());
/// assert_eq!(failed.to_string(), "Failure(💥)");
/// ```
#[derive(Debug, Clone)]
pub enum Either<T> {
    Result(T),
    Failure(Error),
}

impl<T> Either<T> {
    pub fn has_result(&self) -> bool {
        matches!(self, Either::Result(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Either::Failure(_))
    }

    /// The produced value, if this is `Result`.
    pub fn result(&self) -> Option<&T> {
        match self {
            Either::Result(value) => Some(value),
            Either::Failure(_) => None,
        }
    }

    /// The carried failure, if this is `Failure`.
    pub fn error(&self) -> Option<&Error> {
        match self {
            Either::Result(_) => None,
            Either::Failure(err) => Some(err),
        }
    }

    pub fn into_result(self) -> Result<T, Error> {
        match self {
            Either::Result(value) => Ok(value),
            Either::Failure(err) => Err(err),
        }
    }
}

impl<T, E: Into<Error>> From<Result<T, E>> for Either<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Either::Result(value),
            Err(err) => Either::Failure(err.into()),
        }
    }
}

impl<T: fmt::Debug> fmt::Display for Either<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Either::Result(value) => write!(f, "Result({:?})", value),
            Either::Failure(err) => write!(f, "Failure({})", err),
        }
    }
}
