//! Error types.

use std::{io, result::Result as StdResult};

use thiserror::Error;

/// Result type for wayfinder operations.
pub type Result<T> = StdResult<T, Error>;

/// A path pattern that could not be compiled.
#[derive(PartialEq, Eq, Error, Debug, Clone)]
#[error("{pattern:?}: {message}")]
pub struct PatternError {
    /// The offending pattern, as written in the linking config.
    pattern: String,
    /// What is wrong with it.
    message: String,
}

impl PatternError {
    /// Construct a pattern error for a pattern string.
    pub fn new(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    /// The pattern that failed to compile.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

/// Core error type.
#[derive(PartialEq, Eq, Error, Debug, Clone)]
pub enum Error {
    /// A screen name that is not registered in any route-config map.
    #[error("unknown route: {0}")]
    UnknownRoute(String),

    /// Route or linking configuration is inconsistent.
    #[error("config: {0}")]
    Config(String),

    #[error("pattern: {0}")]
    /// A linking path pattern is malformed.
    Pattern(#[source] PatternError),

    /// A navigation state violates the tree invariants.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Persisted state could not be encoded or decoded.
    #[error("serialize: {0}")]
    Serialize(String),
}

impl From<PatternError> for Error {
    fn from(e: PatternError) -> Self {
        Self::Pattern(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialize(e.to_string())
    }
}

impl From<regex::Error> for Error {
    fn from(e: regex::Error) -> Self {
        Self::Config(e.to_string())
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Serialize(e.to_string())
    }
}
