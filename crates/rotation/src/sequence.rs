//! Rotation sequence generation.
//!
//! A sequence is a long, finite list of agent phone numbers that the
//! dispatcher walks with a persisted cursor. Generators here are pure apart
//! from the randomness injected through an [`Rng`].

use database::validation::MAX_WEIGHT;
use rand::seq::SliceRandom;
use rand::Rng;

pub use database::Strategy;

/// Sequence length used when none is configured.
pub const DEFAULT_SEQUENCE_LENGTH: usize = 1000;

/// An agent identifier paired with its rotation weight.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AgentWeight {
    pub agent: String,
    pub weight: i64,
}

impl AgentWeight {
    pub fn new(agent: impl Into<String>, weight: i64) -> Self {
        Self {
            agent: agent.into(),
            weight,
        }
    }

    /// Number of slots this agent takes in a weighted block.
    ///
    /// Weights below 1 take none; weights above [`MAX_WEIGHT`] are clamped.
    pub fn slots(&self) -> usize {
        self.weight.clamp(0, MAX_WEIGHT) as usize
    }
}

/// Cycle through `agents` until `length` slots are filled.
///
/// Slot `i` holds `agents[i % agents.len()]`. Identical input always yields
/// an identical sequence.
pub fn generate_round_robin_sequence(agents: &[String], length: usize) -> Vec<String> {
    if agents.is_empty() {
        return Vec::new();
    }

    (0..length)
        .map(|i| agents[i % agents.len()].clone())
        .collect()
}

/// Unshuffled weighted block: each agent repeated `weight` times.
///
/// Agents with a weight below 1 are left out. See [`AgentWeight::slots`].
pub fn weighted_block(agent_weights: &[AgentWeight]) -> Vec<String> {
    agent_weights
        .iter()
        .flat_map(|w| std::iter::repeat(w.agent.clone()).take(w.slots()))
        .collect()
}

/// Length of [`weighted_block`] without building it.
pub fn weighted_block_len(agent_weights: &[AgentWeight]) -> usize {
    agent_weights.iter().map(AgentWeight::slots).sum()
}

/// Weighted sequence using the thread-local RNG.
pub fn generate_weighted_sequence(agent_weights: &[AgentWeight], length: usize) -> Vec<String> {
    generate_weighted_sequence_with_rng(agent_weights, length, &mut rand::thread_rng())
}

/// Shuffle the weighted block once, then tile it to `length` slots.
///
/// The shuffle breaks up long runs of a heavily weighted agent. Two calls with
/// the same input are expected to differ. A `length` shorter than the block
/// cuts it, which can drop light agents; callers size `length` with
/// [`weighted_block_len`].
pub fn generate_weighted_sequence_with_rng<R: Rng + ?Sized>(
    agent_weights: &[AgentWeight],
    length: usize,
    rng: &mut R,
) -> Vec<String> {
    let mut block = weighted_block(agent_weights);
    if block.is_empty() {
        return Vec::new();
    }

    block.shuffle(rng);

    (0..length).map(|i| block[i % block.len()].clone()).collect()
}

/// Random sequence using the thread-local RNG.
pub fn generate_random_sequence(agents: &[String], length: usize) -> Vec<String> {
    generate_random_sequence_with_rng(agents, length, &mut rand::thread_rng())
}

/// Draw every slot independently and uniformly from `agents`.
pub fn generate_random_sequence_with_rng<R: Rng + ?Sized>(
    agents: &[String],
    length: usize,
    rng: &mut R,
) -> Vec<String> {
    if agents.is_empty() {
        return Vec::new();
    }

    (0..length)
        .filter_map(|_| agents.choose(rng).cloned())
        .collect()
}

/// Generate a sequence for `strategy`.
///
/// A weighted strategy without weights (or with an empty weight list) falls
/// back to round-robin over `agents`.
pub fn generate_rotation_sequence(
    strategy: Strategy,
    agents: &[String],
    agent_weights: Option<&[AgentWeight]>,
    length: usize,
) -> Vec<String> {
    match strategy {
        Strategy::RoundRobin => generate_round_robin_sequence(agents, length),
        Strategy::Random => generate_random_sequence(agents, length),
        Strategy::Weighted => match agent_weights {
            Some(weights) if !weights.is_empty() => generate_weighted_sequence(weights, length),
            _ => generate_round_robin_sequence(agents, length),
        },
    }
}
