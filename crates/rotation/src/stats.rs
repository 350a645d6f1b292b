//! Sequence coverage checks and distribution statistics.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

/// A coverage problem found in a sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "agents", rename_all = "camelCase")]
pub enum SequenceIssue {
    /// The sequence is empty although agents were expected.
    Empty,
    /// Expected agents that never appear.
    MissingAgents(Vec<String>),
    /// Agents that appear but are not expected.
    ExtraAgents(Vec<String>),
}

impl fmt::Display for SequenceIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SequenceIssue::Empty => write!(f, "sequence is empty"),
            SequenceIssue::MissingAgents(agents) => {
                write!(f, "missing agents: {}", agents.join(", "))
            }
            SequenceIssue::ExtraAgents(agents) => write!(f, "extra agents: {}", agents.join(", ")),
        }
    }
}

/// Outcome of [`validate_sequence`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceValidation {
    pub is_valid: bool,
    pub issues: Vec<SequenceIssue>,
}

impl SequenceValidation {
    /// All issues joined for a single log line.
    pub fn describe(&self) -> String {
        self.issues
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Check that `sequence` covers exactly the `expected` agents.
///
/// Every issue is reported, not just the first. Agent lists inside issues are
/// sorted.
pub fn validate_sequence(sequence: &[String], expected: &[String]) -> SequenceValidation {
    let mut issues = Vec::new();

    if sequence.is_empty() && !expected.is_empty() {
        issues.push(SequenceIssue::Empty);
    }

    let present: BTreeSet<&String> = sequence.iter().collect();
    let wanted: BTreeSet<&String> = expected.iter().collect();

    let missing: Vec<String> = wanted.difference(&present).map(|s| s.to_string()).collect();
    if !missing.is_empty() {
        issues.push(SequenceIssue::MissingAgents(missing));
    }

    let extra: Vec<String> = present.difference(&wanted).map(|s| s.to_string()).collect();
    if !extra.is_empty() {
        issues.push(SequenceIssue::ExtraAgents(extra));
    }

    SequenceValidation {
        is_valid: issues.is_empty(),
        issues,
    }
}

/// Distribution summary of a sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceStats {
    pub total_rotations: usize,
    pub agent_distribution: BTreeMap<String, usize>,
    /// Coefficient of variation of the per-agent counts, rounded to 2 places.
    /// 0 means perfectly even.
    pub fairness_score: f64,
}

/// Count occurrences per agent and score how evenly they are spread.
pub fn calculate_sequence_stats(sequence: &[String]) -> SequenceStats {
    let mut agent_distribution = BTreeMap::new();
    for agent in sequence {
        *agent_distribution.entry(agent.clone()).or_insert(0usize) += 1;
    }

    SequenceStats {
        total_rotations: sequence.len(),
        fairness_score: fairness_score(agent_distribution.values().copied()),
        agent_distribution,
    }
}

/// Population coefficient of variation, rounded to 2 decimal places.
pub fn fairness_score(counts: impl IntoIterator<Item = usize>) -> f64 {
    let counts: Vec<f64> = counts.into_iter().map(|c| c as f64).collect();
    if counts.is_empty() {
        return 0.0;
    }

    let n = counts.len() as f64;
    let mean = counts.iter().sum::<f64>() / n;
    if mean == 0.0 {
        return 0.0;
    }

    let variance = counts.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / n;
    let cv = variance.sqrt() / mean;

    (cv * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_validate_reports_missing_agents() {
        let result = validate_sequence(&seq(&["A", "B", "A"]), &seq(&["A", "B", "C"]));
        assert!(!result.is_valid);
        assert_eq!(result.issues, vec![SequenceIssue::MissingAgents(seq(&["C"]))]);
    }

    #[test]
    fn test_validate_reports_extra_agents() {
        let result = validate_sequence(&seq(&["A", "B", "C"]), &seq(&["A", "B"]));
        assert!(!result.is_valid);
        assert_eq!(result.issues, vec![SequenceIssue::ExtraAgents(seq(&["C"]))]);
    }

    #[test]
    fn test_validate_accepts_exact_coverage() {
        let result = validate_sequence(&seq(&["A", "B"]), &seq(&["A", "B"]));
        assert!(result.is_valid);
        assert!(result.issues.is_empty());

        assert!(validate_sequence(&[], &[]).is_valid);
    }

    #[test]
    fn test_validate_reports_every_issue() {
        let result = validate_sequence(&seq(&["A", "D", "E"]), &seq(&["A", "C", "B"]));
        assert_eq!(
            result.issues,
            vec![
                SequenceIssue::MissingAgents(seq(&["B", "C"])),
                SequenceIssue::ExtraAgents(seq(&["D", "E"])),
            ]
        );
        assert_eq!(result.describe(), "missing agents: B, C; extra agents: D, E");
    }

    #[test]
    fn test_validate_empty_sequence() {
        let result = validate_sequence(&[], &seq(&["A"]));
        assert!(!result.is_valid);
        assert_eq!(result.issues[0], SequenceIssue::Empty);
        assert!(result.issues.contains(&SequenceIssue::MissingAgents(seq(&["A"]))));
    }

    #[test]
    fn test_stats_even_distribution() {
        let mut sequence = Vec::new();
        for _ in 0..10 {
            sequence.extend(seq(&["A", "B", "C"]));
        }
        let stats = calculate_sequence_stats(&sequence);

        assert_eq!(stats.total_rotations, 30);
        assert_eq!(stats.agent_distribution["A"], 10);
        assert_eq!(stats.agent_distribution["B"], 10);
        assert_eq!(stats.agent_distribution["C"], 10);
        assert_eq!(stats.fairness_score, 0.0);
    }

    #[test]
    fn test_stats_skewed_distribution() {
        let mut sequence = vec!["A".to_string(); 28];
        sequence.extend(seq(&["B", "C"]));
        let stats = calculate_sequence_stats(&sequence);

        // mean 10, population std dev ~12.73
        assert_eq!(stats.fairness_score, 1.27);
    }

    #[test]
    fn test_stats_empty_sequence() {
        let stats = calculate_sequence_stats(&[]);
        assert_eq!(stats.total_rotations, 0);
        assert!(stats.agent_distribution.is_empty());
        assert_eq!(stats.fairness_score, 0.0);
    }

    #[test]
    fn test_issue_serialization() {
        let json = serde_json::to_value(SequenceIssue::MissingAgents(seq(&["C"]))).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "missingAgents", "agents": ["C"]}));
    }
}
