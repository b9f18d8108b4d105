//! Swarm Core - Multi-agent task coordination engine
//!
//! This crate registers a pool of specialized agents, staffs incoming tasks
//! with the best-matching idle agents, derives a coordination plan, runs the
//! agents concurrently and synthesizes their answers into a consensus with
//! agreement, quality and safety signals.
//!
//! What an agent actually does is behind the [`AgentCapability`] trait.

pub mod agent;
pub mod capability;
pub mod config;
pub mod consensus;
pub mod coordinator;
pub mod error;
pub mod id;
pub mod metrics;
pub mod plan;
pub mod registry;
pub mod roster;
pub mod selector;
pub mod task;
pub mod tracker;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_utils;

pub use agent::{Agent, AgentKind, AgentMetadata, AgentStatus, PerformanceRecord};
pub use capability::{AgentCapability, AgentResult, ResultPayload};
pub use config::SwarmConfig;
pub use consensus::{Consensus, ConsensusSynthesizer, SafetyAssessment};
pub use coordinator::SwarmCoordinator;
pub use error::{CoreError, Result};
pub use id::{AgentId, Id, IdType, TaskId};
pub use metrics::{AgentPerformanceReport, SwarmMetrics};
pub use plan::{AgentRole, CoordinationPlan, DecisionRule, Topology};
pub use registry::AgentRegistry;
pub use selector::{AgentSelector, CapabilitySelector};
pub use task::{FailureCause, Task, TaskKind, TaskPriority, TaskRequest, TaskStatus};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        Agent, AgentCapability, AgentId, AgentKind, AgentRegistry, AgentResult, AgentStatus,
        Consensus, CoordinationPlan, CoreError, FailureCause, Result, ResultPayload,
        SafetyAssessment, SwarmConfig, SwarmCoordinator, Task, TaskId, TaskKind, TaskPriority,
        TaskRequest, TaskStatus,
    };
}
