//! # Error Types Module
//!
//! This module defines the error taxonomy used by the recipe flow and its
//! remote collaborators. Channel and bootstrap failures are carried as
//! `anyhow::Error` instead.

use thiserror::Error;

/// Reasons a recipe count argument can be rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CountError {
    /// The search command was sent without an argument
    #[error("no argument was given")]
    Missing,
    /// The argument does not parse as an integer
    #[error("'{0}' is not a number")]
    NotANumber(String),
    /// The argument is zero or negative
    #[error("{0} is not a positive number")]
    NotPositive(i64),
}

/// Errors produced by the recipe flow and its collaborators
#[derive(Debug, Clone, Error)]
pub enum BotError {
    /// The user supplied an unusable recipe count
    #[error("Invalid argument: {0}")]
    InvalidArgument(#[from] CountError),
    /// The recipe directory could not be reached or answered with a failure
    #[error("Recipe directory unavailable: {0}")]
    UpstreamUnavailable(String),
    /// The translation service could not be reached or returned garbage
    #[error("Translation unavailable: {0}")]
    TranslationUnavailable(String),
}

pub type BotResult<T> = Result<T, BotError>;

impl BotError {
    pub fn upstream(message: impl Into<String>) -> Self {
        BotError::UpstreamUnavailable(message.into())
    }

    pub fn translation(message: impl Into<String>) -> Self {
        BotError::TranslationUnavailable(message.into())
    }
}
