//! Task records and the request used to create them

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::{
    AgentId, CoreError, Result, TaskId,
    capability::AgentResult,
    consensus::Consensus,
};

/// What kind of work a task asks the swarm to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum TaskKind {
    Diagnosis,
    TreatmentPlanning,
    #[serde(alias = "monitoring")]
    PatientMonitoring,
    #[serde(alias = "research")]
    ResearchAnalysis,
    EmergencyResponse,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Diagnosis => "diagnosis",
            Self::TreatmentPlanning => "treatment-planning",
            Self::PatientMonitoring => "patient-monitoring",
            Self::ResearchAnalysis => "research-analysis",
            Self::EmergencyResponse => "emergency-response",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "diagnosis" => Ok(Self::Diagnosis),
            "treatment-planning" => Ok(Self::TreatmentPlanning),
            "patient-monitoring" | "monitoring" => Ok(Self::PatientMonitoring),
            "research-analysis" | "research" => Ok(Self::ResearchAnalysis),
            "emergency-response" => Ok(Self::EmergencyResponse),
            other => Err(format!("Unknown task kind: {}", other)),
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl TaskPriority {
    /// Maximum number of agents assigned to a task of this priority
    pub fn agent_quota(&self) -> usize {
        match self {
            Self::Critical => 5,
            Self::High => 3,
            Self::Medium | Self::Low => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskPriority {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            other => Err(format!("Unknown priority: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Escalated,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Escalated)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Escalated => "escalated",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a task ended in `failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailureCause {
    /// The selector found no idle agent covering the required capabilities
    NoEligibleAgents,
    /// Every assigned agent returned an error
    AllAgentsFailed,
    /// Every assigned agent was still running when the deadline elapsed
    DeadlineExceeded,
    /// The caller cancelled the task
    Cancelled,
    /// An agent invocation panicked
    Aborted,
}

impl FailureCause {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoEligibleAgents => "no_eligible_agents",
            Self::AllAgentsFailed => "all_agents_failed",
            Self::DeadlineExceeded => "deadline_exceeded",
            Self::Cancelled => "cancelled",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TaskTimeline {
    pub created: DateTime<Utc>,
    pub started: Option<DateTime<Utc>>,
    pub completed: Option<DateTime<Utc>>,
    /// Advisory: agents still running at this point are treated as timed out
    pub deadline: Option<DateTime<Utc>>,
}

/// How one assigned agent fared during execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ParticipantStatus {
    Succeeded,
    Errored { reason: String },
    TimedOut,
    Panicked,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ParticipantOutcome {
    pub agent_id: AgentId,
    pub status: ParticipantStatus,
    /// Wall time from dispatch to result, error or timeout
    #[serde(with = "crate::utils::serde_duration")]
    #[schemars(with = "u64")]
    pub elapsed: Duration,
}

impl ParticipantOutcome {
    pub fn succeeded(&self) -> bool {
        self.status == ParticipantStatus::Succeeded
    }
}

/// A unit of work owned by the coordinator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Task {
    pub id: TaskId,
    pub kind: TaskKind,
    pub priority: TaskPriority,
    pub description: String,
    /// Opaque domain payload handed to every agent
    pub context: Option<serde_json::Value>,
    pub required_capabilities: Vec<String>,
    /// In selector ranking order; the first entry leads
    pub assigned_agents: Vec<AgentId>,
    pub status: TaskStatus,
    pub failure: Option<FailureCause>,
    pub participants: Vec<ParticipantOutcome>,
    pub results: Vec<AgentResult>,
    pub consensus: Option<Consensus>,
    pub timeline: TaskTimeline,
}

impl Task {
    pub(crate) fn from_request(request: TaskRequest) -> Self {
        Self {
            id: TaskId::generate(),
            kind: request.kind,
            priority: request.priority,
            description: request.description,
            context: request.context,
            required_capabilities: request.required_capabilities,
            assigned_agents: Vec::new(),
            status: TaskStatus::Pending,
            failure: None,
            participants: Vec::new(),
            results: Vec::new(),
            consensus: None,
            timeline: TaskTimeline {
                created: Utc::now(),
                started: None,
                completed: None,
                deadline: request.deadline,
            },
        }
    }

    /// Move to `failed` with the given cause, stamping the completion time
    pub(crate) fn fail(&mut self, cause: FailureCause) {
        self.status = TaskStatus::Failed;
        self.failure = Some(cause);
        self.timeline.completed = Some(Utc::now());
    }

    /// Time between start and completion, if both happened
    pub fn duration(&self) -> Option<Duration> {
        let started = self.timeline.started?;
        let completed = self.timeline.completed?;
        (completed - started).to_std().ok()
    }

    pub fn is_assigned(&self, agent_id: &AgentId) -> bool {
        self.assigned_agents.contains(agent_id)
    }

    /// The failure cause as an error, for callers that propagate it
    pub fn error(&self) -> Option<CoreError> {
        let task_id = self.id.to_string();
        let error = match self.failure? {
            FailureCause::NoEligibleAgents => CoreError::NoEligibleAgents {
                required: self.required_capabilities.clone(),
                priority: self.priority.to_string(),
            },
            FailureCause::AllAgentsFailed => CoreError::AllAgentsFailed {
                task_id,
                participants: self.assigned_agents.len(),
            },
            FailureCause::DeadlineExceeded => CoreError::DeadlineExceeded { task_id },
            FailureCause::Cancelled => CoreError::Cancelled { task_id },
            FailureCause::Aborted => CoreError::ExecutionAborted { task_id },
        };
        Some(error)
    }
}

/// Parameters for creating a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRequest {
    pub kind: TaskKind,
    pub description: String,
    pub priority: TaskPriority,
    pub required_capabilities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
}

impl TaskRequest {
    pub fn new(kind: TaskKind, description: impl Into<String>, priority: TaskPriority) -> Self {
        Self {
            kind,
            description: description.into(),
            priority,
            required_capabilities: Vec::new(),
            context: None,
            deadline: None,
        }
    }

    pub fn require<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_capabilities
            .extend(capabilities.into_iter().map(Into::into));
        self
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Deadline relative to now
    pub fn with_deadline_in(self, within: Duration) -> Self {
        let within =
            chrono::Duration::from_std(within).unwrap_or_else(|_| chrono::Duration::weeks(52));
        self.with_deadline(Utc::now() + within)
    }

    /// Reject malformed requests before any state is created
    pub fn validate(&self) -> Result<()> {
        if self.required_capabilities.is_empty() {
            return Err(CoreError::invalid_task(
                "required_capabilities must name at least one capability tag",
            ));
        }
        if self
            .required_capabilities
            .iter()
            .any(|tag| tag.trim().is_empty())
        {
            return Err(CoreError::invalid_task(
                "required_capabilities must not contain blank tags",
            ));
        }
        if let Some(deadline) = self.deadline {
            if deadline <= Utc::now() {
                return Err(CoreError::invalid_task(format!(
                    "deadline {} is already in the past",
                    deadline.to_rfc3339()
                )));
            }
        }
        Ok(())
    }
}
