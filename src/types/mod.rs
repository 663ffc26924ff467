#![forbid(unsafe_code)]

//! Identifier newtypes and the crate-wide error type.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of a catalog user.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

/// Identifier of a catalog product.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(value: i64) -> Self {
        UserId(value)
    }
}

impl From<i64> for ProductId {
    fn from(value: i64) -> Self {
        ProductId(value)
    }
}

/// Errors surfaced by the recommendation core and its repositories.
///
/// Cold start is never reported here: an unknown user or an empty neighbor
/// pool resolves through the popularity fallback instead.
#[derive(Debug, Error)]
pub enum RecError {
    /// The backing store failed; the detail is opaque to callers.
    #[error("repository unavailable: {0}")]
    Repository(String),
    /// SQLite-backed repository failure.
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    /// Reference product is not part of the catalog.
    #[error("product {0} not found")]
    ProductNotFound(ProductId),
    /// Caller supplied an out-of-range argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Configuration could not be parsed or failed validation.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RecError {
    /// Returns true when the error means "no such reference item" rather than
    /// an internal failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RecError::ProductNotFound(_))
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RecError>;
