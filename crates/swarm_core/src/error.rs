use miette::Diagnostic;
use thiserror::Error;

use crate::{AgentId, TaskId};

#[derive(Error, Diagnostic, Debug)]
pub enum CoreError {
    #[error("Invalid task request")]
    #[diagnostic(code(swarm_core::invalid_task), help("{reason}"))]
    InvalidTask { reason: String },

    #[error("No eligible agents")]
    #[diagnostic(
        code(swarm_core::no_eligible_agents),
        help(
            "No idle agent covers any of {required:?}. Register an agent with one of these specialties or wait for busy agents to finish"
        )
    )]
    NoEligibleAgents {
        required: Vec<String>,
        priority: String,
    },

    #[error("Agent invocation failed")]
    #[diagnostic(
        code(swarm_core::agent_invocation_failed),
        help("Agent {agent_id} could not produce a result: {reason}")
    )]
    AgentInvocationFailed { agent_id: String, reason: String },

    #[error("All assigned agents failed")]
    #[diagnostic(
        code(swarm_core::all_agents_failed),
        help("None of the {participants} agents assigned to {task_id} produced a result")
    )]
    AllAgentsFailed { task_id: String, participants: usize },

    #[error("Task deadline exceeded")]
    #[diagnostic(
        code(swarm_core::deadline_exceeded),
        help("No agent assigned to {task_id} answered before its deadline. Allow more time or lower the task's scope")
    )]
    DeadlineExceeded { task_id: String },

    #[error("Task execution aborted")]
    #[diagnostic(
        code(swarm_core::execution_aborted),
        help("An agent invocation for {task_id} panicked; its agents were released")
    )]
    ExecutionAborted { task_id: String },

    #[error("Task cancelled")]
    #[diagnostic(code(swarm_core::cancelled), help("Task {task_id} was cancelled by the caller"))]
    Cancelled { task_id: String },

    #[error("Task not found")]
    #[diagnostic(
        code(swarm_core::task_not_found),
        help("Check that the task ID is correct and was returned by create_task")
    )]
    TaskNotFound {
        #[source_code]
        src: String,
        #[label("task ID: {id}")]
        span: (usize, usize),
        id: String,
    },

    #[error("Agent not found")]
    #[diagnostic(
        code(swarm_core::agent_not_found),
        help("Check that the agent ID is correct and the agent is part of the registry")
    )]
    AgentNotFound {
        #[source_code]
        src: String,
        #[label("agent ID: {id}")]
        span: (usize, usize),
        id: String,
    },

    #[error("Agent status conflict")]
    #[diagnostic(
        code(swarm_core::status_conflict),
        help(
            "Agent {agent_id} is '{current_state}' but {operation} expected '{expected_state}'"
        )
    )]
    StatusConflict {
        agent_id: String,
        current_state: String,
        expected_state: String,
        operation: String,
    },

    #[error("Configuration error")]
    #[diagnostic(
        code(swarm_core::configuration_error),
        help("Check configuration file at {config_path}")
    )]
    ConfigurationError {
        config_path: String,
        field: String,
        expected: String,
        #[source]
        cause: ConfigError,
    },
}

/// Underlying cause of a [`CoreError::ConfigurationError`]
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(String),

    #[error("Invalid value: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;

// Helper functions for creating common errors with context
impl CoreError {
    pub fn invalid_task(reason: impl Into<String>) -> Self {
        Self::InvalidTask {
            reason: reason.into(),
        }
    }

    pub fn task_not_found(id: &TaskId) -> Self {
        let id = id.to_string();
        Self::TaskNotFound {
            src: format!("task_id: {}", id),
            span: (9, 9 + id.len()),
            id,
        }
    }

    pub fn agent_not_found(id: impl Into<String>) -> Self {
        let id = id.into();
        Self::AgentNotFound {
            src: format!("agent_id: {}", id),
            span: (10, 10 + id.len()),
            id,
        }
    }

    pub fn invocation_failed(agent_id: &AgentId, reason: impl Into<String>) -> Self {
        Self::AgentInvocationFailed {
            agent_id: agent_id.to_string(),
            reason: reason.into(),
        }
    }

    pub fn status_conflict(
        agent_id: &AgentId,
        current_state: impl Into<String>,
        expected_state: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        Self::StatusConflict {
            agent_id: agent_id.to_string(),
            current_state: current_state.into(),
            expected_state: expected_state.into(),
            operation: operation.into(),
        }
    }
}
