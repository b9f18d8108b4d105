//! Combining the results of a task's agents into one answer
//!
//! The synthesizer is a pure function over the surviving [`AgentResult`]s. It
//! never sees errored or timed-out participants, so every score here is over
//! the agents that actually answered.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::{
    AgentId,
    capability::{AgentResult, unit_interval},
    plan::DecisionRule,
    task::TaskKind,
    utils::mean,
};

/// Number of synthesized recommendations kept
pub const MAX_RECOMMENDATIONS: usize = 5;
/// Processing time the timeliness score is centred on
pub const REFERENCE_RESPONSE_SECS: f64 = 2.0;
/// Deviation from the reference at which timeliness reaches zero
pub const TIMELINESS_TOLERANCE_SECS: f64 = 10.0;
pub const CONFIDENCE_WEIGHT: f64 = 0.7;
pub const TIMELINESS_WEIGHT: f64 = 0.3;

/// Categorical safety signal derived from the safety-weighted score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SafetyAssessment {
    High,
    Moderate,
    Low,
    Concern,
}

impl SafetyAssessment {
    /// Thresholds are strict: a score of exactly 0.9 is `Moderate`
    pub fn from_score(score: f64) -> Self {
        if score > 0.9 {
            Self::High
        } else if score > 0.7 {
            Self::Moderate
        } else if score > 0.5 {
            Self::Low
        } else {
            Self::Concern
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Moderate => "moderate",
            Self::Low => "low",
            Self::Concern => "concern",
        }
    }
}

impl fmt::Display for SafetyAssessment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate answer for one completed task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Consensus {
    /// Mean pairwise overlap of the results' recommendation sets
    pub agreement: f64,
    /// Mean of the results' confidences
    pub confidence: f64,
    /// Most frequent recommendation items, best first
    pub recommendations: Vec<String>,
    /// Items only one result recommended
    pub minority_opinions: Vec<String>,
    pub quality_score: f64,
    pub timeliness_score: f64,
    pub safety_score: f64,
    pub safety: SafetyAssessment,
    pub decision_rule: DecisionRule,
    /// Agents assigned to the task
    pub participants: usize,
    /// Agents whose results went into this consensus
    pub contributors: Vec<AgentId>,
    pub produced_at: DateTime<Utc>,
}

impl Consensus {
    pub fn requires_escalation(&self) -> bool {
        self.safety == SafetyAssessment::Concern
    }
}

/// One surviving result together with its agent's patient safety score
#[derive(Debug, Clone, Copy)]
pub struct Contribution<'a> {
    pub result: &'a AgentResult,
    pub safety_score: f64,
}

#[derive(Debug, Clone, Default)]
pub struct ConsensusSynthesizer;

struct Tally<'a> {
    item: &'a str,
    count: usize,
    max_confidence: f64,
}

impl ConsensusSynthesizer {
    /// Build the consensus, or `None` when no result survived
    pub fn synthesize(
        &self,
        kind: TaskKind,
        decision_rule: DecisionRule,
        participants: usize,
        contributions: &[Contribution<'_>],
    ) -> Option<Consensus> {
        if contributions.is_empty() {
            return None;
        }

        for contribution in contributions {
            if !contribution.result.payload.fits(kind) {
                tracing::debug!(
                    "Agent {} returned a payload not shaped for {} tasks",
                    contribution.result.agent_id,
                    kind
                );
            }
        }

        let sets: Vec<Vec<&str>> = contributions
            .iter()
            .map(|c| dedup(c.result.recommendations()))
            .collect();

        let agreement = agreement(&sets);
        let confidence =
            mean(contributions.iter().map(|c| unit_interval(c.result.confidence))).unwrap_or(0.0);
        let (recommendations, minority_opinions) = rank(&sets, contributions);

        let mean_secs = mean(
            contributions
                .iter()
                .map(|c| c.result.processing_time.as_secs_f64()),
        )
        .unwrap_or(REFERENCE_RESPONSE_SECS);
        let timeliness_score = timeliness(mean_secs);
        let quality_score = CONFIDENCE_WEIGHT * confidence + TIMELINESS_WEIGHT * timeliness_score;

        let safety_score = mean(
            contributions
                .iter()
                .map(|c| unit_interval(c.result.confidence) * unit_interval(c.safety_score)),
        )
        .unwrap_or(0.0);
        let safety = SafetyAssessment::from_score(safety_score);

        tracing::debug!(
            "Consensus over {}/{} results: agreement {:.3}, confidence {:.3}, safety {} ({:.3})",
            contributions.len(),
            participants,
            agreement,
            confidence,
            safety,
            safety_score
        );

        Some(Consensus {
            agreement,
            confidence,
            recommendations,
            minority_opinions,
            quality_score,
            timeliness_score,
            safety_score,
            safety,
            decision_rule,
            participants,
            contributors: contributions.iter().map(|c| c.result.agent_id).collect(),
            produced_at: Utc::now(),
        })
    }
}

/// `1 - |secs - 2| / 10`, clamped to `[0, 1]`
pub fn timeliness(mean_secs: f64) -> f64 {
    (1.0 - (mean_secs - REFERENCE_RESPONSE_SECS).abs() / TIMELINESS_TOLERANCE_SECS).clamp(0.0, 1.0)
}

/// Jaccard index; two empty sets overlap fully
fn overlap(a: &[&str], b: &[&str]) -> f64 {
    let a: HashSet<&str> = a.iter().copied().collect();
    let b: HashSet<&str> = b.iter().copied().collect();
    let union = a.union(&b).count();
    if union == 0 {
        return 1.0;
    }
    a.intersection(&b).count() as f64 / union as f64
}

fn agreement(sets: &[Vec<&str>]) -> f64 {
    if sets.len() < 2 {
        return 1.0;
    }
    let mut pairs = Vec::with_capacity(sets.len() * (sets.len() - 1) / 2);
    for (i, a) in sets.iter().enumerate() {
        for b in &sets[i + 1..] {
            pairs.push(overlap(a, b));
        }
    }
    mean(pairs).unwrap_or(1.0)
}

fn dedup(items: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    items
        .iter()
        .map(String::as_str)
        .filter(|item| seen.insert(*item))
        .collect()
}

/// Top items by result count, then highest confidence, then first appearance;
/// plus the items exactly one result mentioned, in first-seen order
fn rank(sets: &[Vec<&str>], contributions: &[Contribution<'_>]) -> (Vec<String>, Vec<String>) {
    let mut tallies: Vec<Tally<'_>> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for (set, contribution) in sets.iter().zip(contributions) {
        let confidence = contribution.result.confidence;
        for &item in set {
            match index.get(item) {
                Some(&i) => {
                    let tally = &mut tallies[i];
                    tally.count += 1;
                    tally.max_confidence = tally.max_confidence.max(confidence);
                }
                None => {
                    index.insert(item, tallies.len());
                    tallies.push(Tally {
                        item,
                        count: 1,
                        max_confidence: confidence,
                    });
                }
            }
        }
    }

    let minority = tallies
        .iter()
        .filter(|t| t.count == 1)
        .map(|t| t.item.to_string())
        .collect();

    // tallies are in first-seen order and sort_by is stable
    let mut ranked: Vec<&Tally<'_>> = tallies.iter().collect();
    ranked.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| b.max_confidence.total_cmp(&a.max_confidence))
    });
    let top = ranked
        .into_iter()
        .take(MAX_RECOMMENDATIONS)
        .map(|t| t.item.to_string())
        .collect();

    (top, minority)
}
