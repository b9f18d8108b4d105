//! Agent records held by the registry
//!
//! An [`Agent`] is pure data: identity, the specialties it can be matched on,
//! the operations it supports, its live [`AgentStatus`] and its long-run
//! [`PerformanceRecord`]. The registry owns every agent for the lifetime of the
//! process; callers only ever see snapshots.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{AgentId, TaskId};

/// Broad category of an agent, used when assigning coordination roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Diagnostic,
    Treatment,
    Monitoring,
    Research,
    Administrative,
    Emergency,
    Specialist,
}

impl AgentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Diagnostic => "diagnostic",
            Self::Treatment => "treatment",
            Self::Monitoring => "monitoring",
            Self::Research => "research",
            Self::Administrative => "administrative",
            Self::Emergency => "emergency",
            Self::Specialist => "specialist",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Live status of an agent
///
/// `Busy` carries the task that owns the agent. An agent can only become busy
/// from `Idle`, which is what keeps it out of two in-progress tasks at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AgentStatus {
    Idle,
    Busy { task_id: TaskId },
    Offline,
    Errored,
}

impl Default for AgentStatus {
    fn default() -> Self {
        Self::Idle
    }
}

impl AgentStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Busy { .. } => "busy",
            Self::Offline => "offline",
            Self::Errored => "errored",
        }
    }

    /// Whether moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: &AgentStatus) -> bool {
        match (self, next) {
            // busy is only reachable from idle
            (Self::Idle, Self::Busy { .. }) => true,
            (_, Self::Busy { .. }) => false,
            _ => true,
        }
    }

    pub fn current_task(&self) -> Option<TaskId> {
        match self {
            Self::Busy { task_id } => Some(*task_id),
            _ => None,
        }
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy { task_id } => write!(f, "busy({})", task_id),
            other => f.write_str(other.label()),
        }
    }
}

impl FromStr for AgentKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "diagnostic" => Ok(Self::Diagnostic),
            "treatment" => Ok(Self::Treatment),
            "monitoring" => Ok(Self::Monitoring),
            "research" => Ok(Self::Research),
            "administrative" => Ok(Self::Administrative),
            "emergency" => Ok(Self::Emergency),
            "specialist" => Ok(Self::Specialist),
            other => Err(format!("Unknown agent kind: {}", other)),
        }
    }
}

/// Long-run statistics for an agent. Only the performance tracker updates these.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PerformanceRecord {
    pub tasks_completed: u64,
    /// Running accuracy in `[0, 1]`
    pub accuracy: f64,
    /// Running average response time in seconds
    pub average_response_secs: f64,
    /// Patient safety score in `[0, 1]`, used to weight the consensus safety signal
    pub patient_safety_score: f64,
}

impl Default for PerformanceRecord {
    fn default() -> Self {
        Self {
            tasks_completed: 0,
            accuracy: 0.9,
            average_response_secs: 2.0,
            patient_safety_score: 0.95,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AgentMetadata {
    pub version: String,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub compliance_levels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
}

impl Default for AgentMetadata {
    fn default() -> Self {
        Self {
            version: "1.0.0".to_string(),
            last_updated: Utc::now(),
            compliance_levels: Vec::new(),
            license: None,
        }
    }
}

/// A registered agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Agent {
    pub id: AgentId,
    /// Stable human-readable handle (e.g. `cardiologist-ai`)
    pub slug: String,
    pub name: String,
    pub kind: AgentKind,
    /// Capability tags the selector matches task requirements against
    pub specialties: Vec<String>,
    /// Operation types the agent supports
    pub capabilities: Vec<String>,
    pub model: String,
    pub status: AgentStatus,
    pub performance: PerformanceRecord,
    pub metadata: AgentMetadata,
}

impl Agent {
    pub fn new(slug: impl Into<String>, name: impl Into<String>, kind: AgentKind) -> Self {
        Self {
            id: AgentId::generate(),
            slug: slug.into(),
            name: name.into(),
            kind,
            specialties: Vec::new(),
            capabilities: Vec::new(),
            model: String::new(),
            status: AgentStatus::Idle,
            performance: PerformanceRecord::default(),
            metadata: AgentMetadata::default(),
        }
    }

    pub fn with_specialties<I, S>(mut self, specialties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.specialties = specialties.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_performance(mut self, performance: PerformanceRecord) -> Self {
        self.performance = performance;
        self
    }

    pub fn with_metadata(mut self, metadata: AgentMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn is_idle(&self) -> bool {
        self.status == AgentStatus::Idle
    }

    pub fn current_task(&self) -> Option<TaskId> {
        self.status.current_task()
    }

    pub fn has_specialty(&self, tag: &str) -> bool {
        self.specialties.iter().any(|s| s == tag)
    }

    /// Number of `required` tags this agent's specialties cover
    pub fn matching_specialties(&self, required: &[String]) -> usize {
        required.iter().filter(|req| self.has_specialty(req)).count()
    }
}
