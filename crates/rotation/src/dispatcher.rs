//! Rotation dispatch: load a group, refresh its sequence if stale, claim the
//! next slot, and emit the redirect.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use database::{GroupAgent, RotationGroup, RotationState};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::click::{spawn_click_log, RequestMeta};
use crate::error::{Result, RotationError};
use crate::link::wa_me_link;
use crate::sequence::{
    generate_round_robin_sequence, generate_rotation_sequence, weighted_block_len, AgentWeight,
    Strategy, DEFAULT_SEQUENCE_LENGTH,
};
use crate::staleness::{sequence_basis, should_regenerate, RegenerationReason};
use crate::stats::{calculate_sequence_stats, validate_sequence, SequenceStats};
use crate::store::{GroupSnapshot, RotationStore};

/// Builds a sequence for a strategy, agent list, weights and length.
pub type SequenceGenerator = fn(Strategy, &[String], Option<&[AgentWeight]>, usize) -> Vec<String>;

/// Dispatcher tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationConfig {
    /// Slots per generated sequence. Raised to the agent count, or for
    /// weighted groups to the weighted block length, if smaller.
    pub sequence_length: usize,
    /// Age after which a random sequence is regenerated.
    pub random_refresh: Duration,
    /// Reload-and-retry budget when another request changes the sequence
    /// version underneath this one.
    pub max_claim_attempts: u32,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            sequence_length: DEFAULT_SEQUENCE_LENGTH,
            random_refresh: Duration::hours(1),
            max_claim_attempts: 5,
        }
    }
}

/// Result of a successful dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dispatch {
    pub group_id: i64,
    pub group_slug: String,
    pub agent: GroupAgent,
    /// Sequence slot the agent was taken from.
    pub slot: usize,
    pub sequence_version: i64,
    /// Set when this request rebuilt the sequence.
    pub regenerated: Option<RegenerationReason>,
    pub redirect_url: String,
}

/// Read-only view of a group's rotation for operators.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationDiagnostics {
    pub group: GroupDiagnostics,
    pub sequence_stats: SequenceStats,
    /// Clicks per phone number from the audit log.
    pub click_distribution: BTreeMap<String, i64>,
    pub total_clicks: i64,
}

/// Group fields included in [`RotationDiagnostics`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDiagnostics {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub strategy: String,
    pub is_active: bool,
    pub current_index: i64,
    pub sequence_version: i64,
    pub last_sequence_update: Option<DateTime<Utc>>,
}

/// Picks an agent for each visitor of a group.
///
/// Holds no state of its own; everything lives in the [`RotationStore`], so
/// cloning a dispatcher per request is cheap.
#[derive(Clone)]
pub struct RotationDispatcher<S> {
    store: S,
    config: RotationConfig,
    generate: SequenceGenerator,
}

impl<S: fmt::Debug> fmt::Debug for RotationDispatcher<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RotationDispatcher")
            .field("store", &self.store)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S: RotationStore> RotationDispatcher<S> {
    /// Create a dispatcher with the default configuration.
    pub fn new(store: S) -> Self {
        Self::with_config(store, RotationConfig::default())
    }

    /// Create a dispatcher with a custom configuration.
    pub fn with_config(store: S, config: RotationConfig) -> Self {
        Self {
            store,
            config,
            generate: generate_rotation_sequence,
        }
    }

    /// Replace the sequence generator. Its output is still validated, with
    /// round-robin as the fallback.
    pub fn with_generator(mut self, generate: SequenceGenerator) -> Self {
        self.generate = generate;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &RotationConfig {
        &self.config
    }

    /// Select the next agent for a visitor of `slug`.
    ///
    /// Regenerates the sequence when it is stale, then atomically claims the
    /// slot under the cursor. If another request regenerates or advances the
    /// same version first, the group is reloaded and the claim retried. The
    /// click is logged in the background.
    pub async fn dispatch(&self, slug: &str, meta: RequestMeta) -> Result<Dispatch> {
        let attempts = self.config.max_claim_attempts.max(1);

        for attempt in 1..=attempts {
            let snapshot = self.load_dispatchable(slug).await?;
            let strategy = group_strategy(&snapshot.group)?;
            let weights = agent_weights(&snapshot.agents);
            let now = Utc::now();

            let Some((state, regenerated)) =
                self.refresh(&snapshot, strategy, &weights, now).await?
            else {
                debug!(group = slug, attempt, "Lost sequence regeneration race, reloading");
                continue;
            };

            let claimed = self
                .store
                .claim_slot(
                    snapshot.group.id,
                    state.sequence_version,
                    state.rotation_sequence.len(),
                    now,
                )
                .await?;

            match claimed {
                Some(slot) => {
                    let GroupSnapshot { group, agents, .. } = &snapshot;
                    return self.emit(group, agents, &state, slot, regenerated, meta);
                }
                None => debug!(
                    group = slug,
                    attempt,
                    "Sequence version moved before claim, reloading"
                ),
            }
        }

        self.dispatch_unclaimed(slug, meta).await
    }

    /// Rotation diagnostics for a group. Never mutates state.
    pub async fn diagnostics(&self, slug: &str) -> Result<RotationDiagnostics> {
        let GroupSnapshot { group, state, .. } = self
            .store
            .load_group(slug)
            .await?
            .ok_or_else(|| RotationError::GroupNotFound(slug.to_string()))?;

        let click_distribution = self
            .store
            .click_distribution(group.id)
            .await?
            .into_iter()
            .collect();
        let total_clicks = self.store.count_clicks(group.id).await?;

        Ok(RotationDiagnostics {
            sequence_stats: calculate_sequence_stats(&state.rotation_sequence),
            click_distribution,
            total_clicks,
            group: GroupDiagnostics {
                id: group.id,
                name: group.name,
                slug: group.slug,
                strategy: group.strategy,
                is_active: group.is_active,
                current_index: state.current_index,
                sequence_version: state.sequence_version,
                last_sequence_update: state.last_sequence_update,
            },
        })
    }

    /// Load an active group that has at least one eligible agent.
    async fn load_dispatchable(&self, slug: &str) -> Result<GroupSnapshot> {
        let snapshot = match self.store.load_group(slug).await? {
            Some(snapshot) if snapshot.group.is_active => snapshot,
            _ => return Err(RotationError::GroupNotFound(slug.to_string())),
        };

        if snapshot.agents.is_empty() {
            warn!(group = slug, "No active agents available for rotation");
            return Err(RotationError::NoActiveAgents(slug.to_string()));
        }

        Ok(snapshot)
    }

    /// Return the state to dispatch from, regenerating it first if stale.
    ///
    /// `None` means another request replaced the sequence first.
    async fn refresh(
        &self,
        snapshot: &GroupSnapshot,
        strategy: Strategy,
        weights: &[AgentWeight],
        now: DateTime<Utc>,
    ) -> Result<Option<(RotationState, Option<RegenerationReason>)>> {
        let Some(reason) = should_regenerate(
            &snapshot.state,
            weights,
            strategy,
            now,
            self.config.random_refresh,
        ) else {
            return Ok(Some((snapshot.state.clone(), None)));
        };

        let sequence = self.build_sequence(&snapshot.group.slug, strategy, weights);
        let basis = sequence_basis(strategy, weights);

        let replaced = self
            .store
            .replace_sequence(
                snapshot.group.id,
                &sequence,
                &basis,
                snapshot.state.sequence_version,
                now,
            )
            .await?;

        Ok(replaced.map(|state| {
            info!(
                group = %snapshot.group.slug,
                %strategy,
                %reason,
                version = state.sequence_version,
                length = state.rotation_sequence.len(),
                "Regenerated rotation sequence"
            );
            (state, Some(reason))
        }))
    }

    /// Generate and validate a sequence, falling back to round-robin.
    ///
    /// The length always fits every agent, and for weighted groups the whole
    /// weighted block, so light agents are never cut off.
    fn build_sequence(
        &self,
        slug: &str,
        strategy: Strategy,
        weights: &[AgentWeight],
    ) -> Vec<String> {
        let agents: Vec<String> = weights.iter().map(|w| w.agent.clone()).collect();
        let mut length = self.config.sequence_length.max(agents.len());
        if strategy == Strategy::Weighted {
            length = length.max(weighted_block_len(weights));
        }

        let sequence = (self.generate)(strategy, &agents, Some(weights), length);
        let validation = validate_sequence(&sequence, &agents);
        if validation.is_valid {
            return sequence;
        }

        warn!(
            group = slug,
            %strategy,
            issues = %validation.describe(),
            "Generated sequence failed validation, falling back to round-robin"
        );
        generate_round_robin_sequence(&agents, length)
    }

    /// Last resort after repeated version conflicts: pick from the latest
    /// state without advancing the cursor.
    async fn dispatch_unclaimed(&self, slug: &str, meta: RequestMeta) -> Result<Dispatch> {
        let snapshot = self.load_dispatchable(slug).await?;
        let strategy = group_strategy(&snapshot.group)?;
        let weights = agent_weights(&snapshot.agents);

        warn!(
            group = slug,
            attempts = self.config.max_claim_attempts,
            "Rotation cursor contention, dispatching without advancing"
        );

        let mut state = snapshot.state.clone();
        let reason = should_regenerate(
            &state,
            &weights,
            strategy,
            Utc::now(),
            self.config.random_refresh,
        );

        let slot = match reason {
            Some(_) => {
                state.rotation_sequence = self.build_sequence(slug, strategy, &weights);
                0
            }
            None => state
                .current_index
                .rem_euclid(state.rotation_sequence.len() as i64) as usize,
        };

        self.emit(&snapshot.group, &snapshot.agents, &state, slot, reason, meta)
    }

    /// Resolve the slot to an agent, start the click log, build the redirect.
    fn emit(
        &self,
        group: &RotationGroup,
        agents: &[GroupAgent],
        state: &RotationState,
        slot: usize,
        regenerated: Option<RegenerationReason>,
        meta: RequestMeta,
    ) -> Result<Dispatch> {
        let phone_number = state
            .rotation_sequence
            .get(slot)
            .map(String::as_str)
            .unwrap_or_default();

        let agent = agents
            .iter()
            .find(|a| a.phone_number == phone_number)
            .cloned()
            .ok_or_else(|| {
                error!(
                    group = %group.slug,
                    phone_number,
                    slot,
                    version = state.sequence_version,
                    "Rotation selected a phone number with no active agent"
                );
                RotationError::SelectionInvariant {
                    group: group.slug.clone(),
                    phone_number: phone_number.to_string(),
                }
            })?;

        spawn_click_log(self.store.clone(), agent.agent_id, Some(group.id), meta);

        debug!(
            group = %group.slug,
            agent = %agent.phone_number,
            slot,
            version = state.sequence_version,
            "Dispatched rotation"
        );

        Ok(Dispatch {
            group_id: group.id,
            group_slug: group.slug.clone(),
            redirect_url: wa_me_link(&agent.phone_number),
            agent,
            slot,
            sequence_version: state.sequence_version,
            regenerated,
        })
    }
}

fn group_strategy(group: &RotationGroup) -> Result<Strategy> {
    group
        .strategy
        .parse()
        .map_err(|_| RotationError::InvalidStrategy(group.strategy.clone()))
}

fn agent_weights(agents: &[GroupAgent]) -> Vec<AgentWeight> {
    agents
        .iter()
        .map(|a| AgentWeight::new(a.phone_number.clone(), a.weight))
        .collect()
}
