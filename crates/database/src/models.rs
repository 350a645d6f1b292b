//! Database models.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::validation::ValidationError;

/// How a group distributes visitors across its agents.
///
/// Stored in `rotation_groups.strategy` by its kebab-case name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Cycle through agents in membership order.
    RoundRobin,
    /// Independent uniform draw per slot.
    Random,
    /// Shuffled block with each agent repeated `weight` times.
    Weighted,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::RoundRobin, Strategy::Random, Strategy::Weighted];

    /// Name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::RoundRobin => "round-robin",
            Strategy::Random => "random",
            Strategy::Weighted => "weighted",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Strategy::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidStrategy(s.to_string()))
    }
}

/// A WhatsApp-enabled phone number that can receive rotated visitors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Agent {
    /// Auto-incrementing ID.
    pub id: i64,
    /// Owning user.
    pub owner_id: String,
    /// Display name
    pub name: String,
    /// Canonical digits-only phone number (e.g., "6281234567890")
    pub phone_number: String,
    /// Default weight used when the agent joins a group.
    pub weight: i64,
    /// Inactive agents are skipped by every rotation.
    pub is_active: bool,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
}

/// Input for creating an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAgent {
    pub owner_id: String,
    pub name: String,
    pub phone_number: String,
    pub weight: i64,
}

/// A named rotation target reachable at `/rotate/{slug}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct RotationGroup {
    /// Auto-incrementing ID.
    pub id: i64,
    /// Owning user.
    pub owner_id: String,
    /// Display name
    pub name: String,
    /// URL slug, unique across all groups.
    pub slug: String,
    /// Distribution strategy ("round-robin", "random" or "weighted").
    pub strategy: String,
    /// Inactive groups do not rotate.
    pub is_active: bool,
    /// Creation timestamp.
    pub created_at: String,
}

/// Input for creating a rotation group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRotationGroup {
    pub owner_id: String,
    pub name: String,
    /// Explicit slug; derived from `name` when absent.
    pub slug: Option<String>,
    pub strategy: String,
}

/// An agent eligible for rotation within a group.
///
/// Only produced for memberships where both the agent and the membership are active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct GroupAgent {
    pub agent_id: i64,
    pub name: String,
    pub phone_number: String,
    /// Per-group weight (not the agent's default weight).
    pub weight: i64,
}

/// Persisted rotation cursor and sequence for one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationState {
    pub group_id: i64,
    /// Phone numbers in dispatch order, used as a ring buffer.
    pub rotation_sequence: Vec<String>,
    /// Fingerprint of the strategy and weights the sequence was built from.
    pub sequence_basis: Option<String>,
    /// Next slot to dispatch.
    pub current_index: i64,
    /// Bumped on every regeneration.
    pub sequence_version: i64,
    pub last_sequence_update: Option<DateTime<Utc>>,
}

/// A click audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Click {
    /// Auto-incrementing ID.
    pub id: i64,
    pub agent_id: i64,
    pub group_id: Option<i64>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub referrer: Option<String>,
    /// Creation timestamp.
    pub created_at: String,
}

/// Input for recording a click.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewClick {
    pub agent_id: i64,
    pub group_id: Option<i64>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub referrer: Option<String>,
}
