//! Agent selection strategies
//!
//! Selectors run while the registry holds its write lock (see
//! [`AgentRegistry::claim`](crate::registry::AgentRegistry::claim)), so they
//! must be pure and must not block.

use crate::{
    AgentId, CoreError, Result,
    agent::Agent,
    task::TaskPriority,
};

/// What the selector is asked to staff
#[derive(Debug, Clone, Copy)]
pub struct SelectionRequest<'a> {
    pub required_capabilities: &'a [String],
    pub priority: TaskPriority,
}

pub trait AgentSelector: Send + Sync {
    /// Pick agents for a task from `candidates`, best first
    fn select(&self, candidates: &[Agent], request: &SelectionRequest<'_>) -> Result<Vec<AgentId>>;

    fn name(&self) -> &str;

    fn description(&self) -> &str;
}

/// Ranks idle agents by how many required specialties they cover, then by
/// running accuracy, and takes the priority's quota
///
/// Ties keep the candidates' registry order, so the same snapshot always
/// yields the same selection.
#[derive(Debug, Clone, Default)]
pub struct CapabilitySelector;

impl AgentSelector for CapabilitySelector {
    fn select(&self, candidates: &[Agent], request: &SelectionRequest<'_>) -> Result<Vec<AgentId>> {
        let mut ranked: Vec<(usize, &Agent)> = candidates
            .iter()
            .filter(|agent| agent.is_idle())
            .map(|agent| {
                (
                    agent.matching_specialties(request.required_capabilities),
                    agent,
                )
            })
            .filter(|(matches, _)| *matches > 0)
            .collect();

        if ranked.is_empty() {
            return Err(CoreError::NoEligibleAgents {
                required: request.required_capabilities.to_vec(),
                priority: request.priority.to_string(),
            });
        }

        // sort_by is stable
        ranked.sort_by(|(a_matches, a), (b_matches, b)| {
            b_matches.cmp(a_matches).then_with(|| {
                b.performance
                    .accuracy
                    .total_cmp(&a.performance.accuracy)
            })
        });

        let selected: Vec<AgentId> = ranked
            .into_iter()
            .take(request.priority.agent_quota())
            .map(|(_, agent)| agent.id)
            .collect();

        tracing::debug!(
            "Capability selector picked {} of {} candidates for [{}] at {} priority",
            selected.len(),
            candidates.len(),
            request.required_capabilities.join(", "),
            request.priority
        );

        Ok(selected)
    }

    fn name(&self) -> &str {
        "capability"
    }

    fn description(&self) -> &str {
        "Selects idle agents whose specialties best match the task requirements"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentKind, AgentStatus, PerformanceRecord};
    use crate::TaskId;
    use pretty_assertions::assert_eq;

    fn agent(slug: &str, specialties: &[&str], accuracy: f64) -> Agent {
        Agent::new(slug, slug, AgentKind::Diagnostic)
            .with_specialties(specialties.iter().copied())
            .with_performance(PerformanceRecord {
                accuracy,
                ..PerformanceRecord::default()
            })
    }

    fn required(tags: &[&str]) -> Vec<String> {
        tags.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_ranks_by_matches_then_accuracy() {
        let broad = agent("broad", &["Cardiology", "Critical Care"], 0.80);
        let accurate = agent("accurate", &["Cardiology"], 0.97);
        let weaker = agent("weaker", &["Cardiology"], 0.90);
        let unrelated = agent("unrelated", &["Radiology"], 0.99);
        let candidates = vec![weaker.clone(), unrelated, accurate.clone(), broad.clone()];

        let required = required(&["Cardiology", "Critical Care"]);
        let request = SelectionRequest {
            required_capabilities: &required,
            priority: TaskPriority::High,
        };

        let selected = CapabilitySelector.select(&candidates, &request).unwrap();
        assert_eq!(selected, vec![broad.id, accurate.id, weaker.id]);
    }

    #[test]
    fn test_quota_follows_priority() {
        let candidates: Vec<Agent> = (0..6)
            .map(|i| agent(&format!("agent-{}", i), &["Emergency Medicine"], 0.9))
            .collect();
        let required = required(&["Emergency Medicine"]);

        for (priority, expected) in [
            (TaskPriority::Critical, 5),
            (TaskPriority::High, 3),
            (TaskPriority::Medium, 2),
            (TaskPriority::Low, 2),
        ] {
            let request = SelectionRequest {
                required_capabilities: &required,
                priority,
            };
            let selected = CapabilitySelector.select(&candidates, &request).unwrap();
            assert_eq!(selected.len(), expected, "priority {}", priority);
        }
    }

    #[test]
    fn test_ties_keep_registry_order() {
        let candidates: Vec<Agent> = (0..4)
            .map(|i| agent(&format!("agent-{}", i), &["Nursing"], 0.9))
            .collect();
        let required = required(&["Nursing"]);
        let request = SelectionRequest {
            required_capabilities: &required,
            priority: TaskPriority::High,
        };

        let first = CapabilitySelector.select(&candidates, &request).unwrap();
        let second = CapabilitySelector.select(&candidates, &request).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            first,
            candidates.iter().take(3).map(|a| a.id).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_skips_non_idle_agents() {
        let mut busy = agent("busy", &["Cardiology"], 0.99);
        busy.status = AgentStatus::Busy {
            task_id: TaskId::generate(),
        };
        let mut offline = agent("offline", &["Cardiology"], 0.99);
        offline.status = AgentStatus::Offline;
        let idle = agent("idle", &["Cardiology"], 0.5);

        let required = required(&["Cardiology"]);
        let request = SelectionRequest {
            required_capabilities: &required,
            priority: TaskPriority::Critical,
        };
        let selected = CapabilitySelector
            .select(&[busy, offline, idle.clone()], &request)
            .unwrap();
        assert_eq!(selected, vec![idle.id]);
    }

    #[test]
    fn test_no_match_is_an_error() {
        let candidates = vec![agent("cardio", &["Cardiology"], 0.9)];
        let required = required(&["Oncology"]);
        let request = SelectionRequest {
            required_capabilities: &required,
            priority: TaskPriority::Critical,
        };
        let err = CapabilitySelector.select(&candidates, &request).unwrap_err();
        assert!(matches!(err, CoreError::NoEligibleAgents { .. }));
    }
}
