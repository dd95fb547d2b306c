//! Error types for the store, aggregator and scouting layers.
//!
//! Not-found is never an error here: lookups return `Ok(None)` so callers can
//! render a dedicated not-found view.

use thiserror::Error;

/// Failure talking to the primary data store.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    /// Network, timeout or connection failure.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store answered with a non-success status.
    #[error("store returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Rows came back but did not match the expected shape.
    #[error("failed to decode rows: {0}")]
    Decode(String),

    /// The owning request was abandoned before the fetch finished.
    #[error("fetch cancelled")]
    Cancelled,

    /// A fixture file could not be read or parsed.
    #[error("invalid fixture: {0}")]
    Fixture(String),
}

impl StoreError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, StoreError::Cancelled)
    }
}

/// Errors surfaced by aggregator operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AggregatorError {
    /// A must-succeed read could not reach the store.
    #[error("data unavailable: {0}")]
    DataUnavailable(#[from] StoreError),

    /// Unknown player leaderboard category.
    #[error("invalid category '{0}' (expected one of: passing, rushing, receiving, tackles, sacks, interceptions)")]
    InvalidCategory(String),

    /// Unknown season phase.
    #[error("invalid phase '{0}' (expected 'regular' or 'postseason')")]
    InvalidPhase(String),
}

/// Failure talking to the scouting API.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ScoutingError {
    #[error("scouting API unavailable: {0}")]
    Unavailable(String),

    #[error("scouting API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to parse scouting response: {0}")]
    Decode(String),

    #[error("scouting request cancelled")]
    Cancelled,
}
