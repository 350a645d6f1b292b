//! Error types for rotation dispatch.

use database::DatabaseError;
use thiserror::Error;

/// Errors that can occur while dispatching a rotation.
#[derive(Debug, Error)]
pub enum RotationError {
    /// The group does not exist or is inactive.
    #[error("rotation group not found: {0}")]
    GroupNotFound(String),

    /// The group has no agent that is both active and an active member.
    #[error("no active agents in rotation group: {0}")]
    NoActiveAgents(String),

    /// The cursor pointed at a phone number with no matching active agent.
    #[error("selected phone number {phone_number} is not an active agent of group {group}")]
    SelectionInvariant { group: String, phone_number: String },

    /// Stored strategy name is not recognised.
    #[error("invalid strategy: {0}")]
    InvalidStrategy(String),

    /// Persistence failure.
    #[error("store error: {0}")]
    Store(#[from] DatabaseError),
}

/// Result type for rotation operations.
pub type Result<T> = std::result::Result<T, RotationError>;
