//! Read-only views over the registry and task history

use chrono::{DateTime, Duration, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    TaskId,
    agent::{Agent, AgentStatus, PerformanceRecord},
    task::{Task, TaskStatus},
    utils::mean,
};

/// Window used for the "recent tasks" count in performance reports
pub const RECENT_WINDOW_DAYS: i64 = 30;

/// Swarm-wide snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SwarmMetrics {
    pub total_agents: usize,
    pub idle_agents: usize,
    pub busy_agents: usize,
    pub total_tasks: usize,
    pub active_tasks: usize,
    pub completed_tasks: usize,
    pub escalated_tasks: usize,
    pub failed_tasks: usize,
    /// Mean start-to-completion time of completed and escalated tasks
    pub average_completion_secs: Option<f64>,
    pub average_accuracy: Option<f64>,
    pub average_safety_score: Option<f64>,
}

impl SwarmMetrics {
    pub fn collect(agents: &[Agent], tasks: &[Task]) -> Self {
        let busy_agents = agents
            .iter()
            .filter(|a| matches!(a.status, AgentStatus::Busy { .. }))
            .count();
        let count = |status: TaskStatus| tasks.iter().filter(|t| t.status == status).count();

        Self {
            total_agents: agents.len(),
            idle_agents: agents.iter().filter(|a| a.is_idle()).count(),
            busy_agents,
            total_tasks: tasks.len(),
            active_tasks: tasks.iter().filter(|t| !t.status.is_terminal()).count(),
            completed_tasks: count(TaskStatus::Completed),
            escalated_tasks: count(TaskStatus::Escalated),
            failed_tasks: count(TaskStatus::Failed),
            average_completion_secs: mean(
                tasks
                    .iter()
                    .filter(|t| matches!(t.status, TaskStatus::Completed | TaskStatus::Escalated))
                    .filter_map(Task::duration)
                    .map(|d| d.as_secs_f64()),
            ),
            average_accuracy: mean(agents.iter().map(|a| a.performance.accuracy)),
            average_safety_score: mean(agents.iter().map(|a| a.performance.patient_safety_score)),
        }
    }
}

/// One agent's record plus the tasks it has been assigned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AgentPerformanceReport {
    pub agent: Agent,
    pub performance: PerformanceRecord,
    /// Assigned tasks, newest first
    pub tasks: Vec<TaskId>,
    /// Assigned tasks created within the last [`RECENT_WINDOW_DAYS`] days
    pub recent_tasks: usize,
}

impl AgentPerformanceReport {
    /// `tasks` may be any set of tasks; only those assigned to `agent` count
    pub fn build(agent: Agent, tasks: &[Task], now: DateTime<Utc>) -> Self {
        let cutoff = now - Duration::days(RECENT_WINDOW_DAYS);
        let mut assigned: Vec<&Task> = tasks.iter().filter(|t| t.is_assigned(&agent.id)).collect();
        assigned.sort_by(|a, b| b.timeline.created.cmp(&a.timeline.created));

        Self {
            performance: agent.performance,
            recent_tasks: assigned
                .iter()
                .filter(|t| t.timeline.created >= cutoff)
                .count(),
            tasks: assigned.iter().map(|t| t.id).collect(),
            agent,
        }
    }
}
