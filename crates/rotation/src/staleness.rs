//! Decide when a stored sequence no longer matches its group.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use database::RotationState;
use serde::Serialize;

use crate::sequence::{AgentWeight, Strategy};

/// Why a sequence is being regenerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegenerationReason {
    /// Nothing has been generated yet.
    EmptySequence,
    /// An agent was added, removed, deactivated or reactivated.
    MembershipChanged,
    /// The strategy or the weights changed since the sequence was built.
    BasisChanged,
    /// A random sequence outlived the refresh window.
    RandomExpired,
}

impl fmt::Display for RegenerationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            RegenerationReason::EmptySequence => "empty-sequence",
            RegenerationReason::MembershipChanged => "membership-changed",
            RegenerationReason::BasisChanged => "basis-changed",
            RegenerationReason::RandomExpired => "random-expired",
        };
        f.write_str(reason)
    }
}

/// Fingerprint of the inputs a sequence was generated from.
///
/// Weights are only part of the fingerprint for the weighted strategy, so
/// editing weights never reshuffles a round-robin or random group.
pub fn sequence_basis(strategy: Strategy, agents: &[AgentWeight]) -> String {
    if strategy != Strategy::Weighted {
        return strategy.to_string();
    }

    let weights: BTreeSet<String> = agents
        .iter()
        .map(|a| format!("{}={}", a.agent, a.weight))
        .collect();

    format!(
        "{}:{}",
        strategy,
        weights.into_iter().collect::<Vec<_>>().join(",")
    )
}

/// Check whether the stored sequence must be rebuilt before dispatching.
///
/// Round-robin and weighted sequences stay valid indefinitely while their
/// basis holds. Random sequences additionally expire `random_refresh` after
/// the last update.
pub fn should_regenerate(
    state: &RotationState,
    current: &[AgentWeight],
    strategy: Strategy,
    now: DateTime<Utc>,
    random_refresh: Duration,
) -> Option<RegenerationReason> {
    if state.rotation_sequence.is_empty() {
        return Some(RegenerationReason::EmptySequence);
    }

    let stored: BTreeSet<&str> = state.rotation_sequence.iter().map(String::as_str).collect();
    let active: BTreeSet<&str> = current.iter().map(|a| a.agent.as_str()).collect();
    if stored != active {
        return Some(RegenerationReason::MembershipChanged);
    }

    if state.sequence_basis.as_deref() != Some(sequence_basis(strategy, current).as_str()) {
        return Some(RegenerationReason::BasisChanged);
    }

    if strategy == Strategy::Random {
        let expired = match state.last_sequence_update {
            Some(updated) => now - updated > random_refresh,
            None => true,
        };
        if expired {
            return Some(RegenerationReason::RandomExpired);
        }
    }

    None
}
