//! Long-run agent statistics
//!
//! The tracker is the only writer of [`PerformanceRecord`]s. It runs once per
//! finished task and returns each participant to idle in the same registry
//! transition that updates its numbers.

use crate::{
    agent::PerformanceRecord,
    registry::AgentRegistry,
    task::{FailureCause, ParticipantOutcome, Task, TaskStatus},
};

/// Weight kept from the previous accuracy
pub const ACCURACY_DECAY: f64 = 0.95;
/// Weight kept from the previous average response time
pub const RESPONSE_DECAY: f64 = 0.9;
/// Accuracy signal for an agent that answered in a successful task
pub const SUCCESS_SIGNAL: f64 = 0.95;
/// Accuracy signal for an agent that failed, or took part in a failed task
pub const FAILURE_SIGNAL: f64 = 0.75;

#[derive(Debug, Clone, Default)]
pub struct PerformanceTracker;

impl PerformanceTracker {
    pub fn signal(status: TaskStatus, outcome: &ParticipantOutcome) -> f64 {
        match status {
            TaskStatus::Completed | TaskStatus::Escalated if outcome.succeeded() => SUCCESS_SIGNAL,
            _ => FAILURE_SIGNAL,
        }
    }

    /// Fold one observation into `record`
    pub fn apply(record: &mut PerformanceRecord, signal: f64, measured_secs: f64) {
        record.tasks_completed += 1;
        record.accuracy = ACCURACY_DECAY * record.accuracy + (1.0 - ACCURACY_DECAY) * signal;
        record.average_response_secs =
            RESPONSE_DECAY * record.average_response_secs + (1.0 - RESPONSE_DECAY) * measured_secs;
    }

    /// Update and release every participant of a terminal `task`
    ///
    /// Cancelled tasks only release their agents. Returns the number of agents
    /// whose statistics were updated.
    pub(crate) fn record(&self, registry: &AgentRegistry, task: &Task) -> usize {
        if task.failure == Some(FailureCause::Cancelled) {
            registry.release(&task.id, &task.assigned_agents);
            return 0;
        }

        let mut updated = 0;
        for outcome in &task.participants {
            let signal = Self::signal(task.status, outcome);
            let measured = outcome.elapsed.as_secs_f64();
            let settled = registry.settle(&task.id, &outcome.agent_id, |record| {
                Self::apply(record, signal, measured)
            });
            if settled {
                updated += 1;
                tracing::debug!(
                    "Recorded signal {:.2} ({:.3}s) for agent {} on task {}",
                    signal,
                    measured,
                    outcome.agent_id,
                    task.id
                );
            }
        }

        // agents without an outcome (none expected) still go back to idle
        registry.release(&task.id, &task.assigned_agents);
        updated
    }
}
