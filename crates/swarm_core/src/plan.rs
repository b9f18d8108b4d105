//! Coordination plans: how a task's assigned agents work together
//!
//! A plan is derived once, when the task enters `in-progress`, and is never
//! recomputed. It fixes the topology, each agent's role and the decision rule
//! the consensus is reported under.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    AgentId,
    agent::{Agent, AgentKind},
    task::{Task, TaskKind},
};

/// How agents in a task coordinate their work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Topology {
    /// Agents build on each other's findings
    Collaborative,
    /// Agents work independently and the best answer wins
    Competitive,
    /// The lead directs the other agents
    Hierarchical,
    /// Agents must converge on a shared answer
    Consensus,
    /// The lead's call stands, others advise
    EmergencyOverride,
}

/// Rule used to combine agent results into a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum DecisionRule {
    MajorityVote,
    WeightedConsensus,
    ExpertOverride,
    Arbitration,
}

/// Role of an agent within one task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum AgentRole {
    Lead,
    SpecialistConsultant,
    Collaborator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum QualityCheck {
    PeerReview,
    SafetyCheck,
    EvidenceValidation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum CommunicationProtocol {
    StructuredDialogue,
}

/// Checks applied to every plan
pub const QUALITY_CHECKS: [QualityCheck; 3] = [
    QualityCheck::PeerReview,
    QualityCheck::SafetyCheck,
    QualityCheck::EvidenceValidation,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RoleAssignment {
    pub agent_id: AgentId,
    pub role: AgentRole,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CoordinationPlan {
    pub task_id: crate::TaskId,
    pub topology: Topology,
    /// One entry per assigned agent, in selector ranking order
    pub roles: Vec<RoleAssignment>,
    pub protocol: CommunicationProtocol,
    pub decision_rule: DecisionRule,
    pub quality_checks: Vec<QualityCheck>,
    pub created_at: DateTime<Utc>,
}

impl CoordinationPlan {
    pub fn role_of(&self, agent_id: &AgentId) -> Option<AgentRole> {
        self.roles
            .iter()
            .find(|assignment| assignment.agent_id == *agent_id)
            .map(|assignment| assignment.role)
    }

    pub fn lead(&self) -> Option<AgentId> {
        self.roles
            .iter()
            .find(|assignment| assignment.role == AgentRole::Lead)
            .map(|assignment| assignment.agent_id)
    }
}

/// Topology and decision rule for a task kind
pub fn strategy_for(kind: TaskKind) -> (Topology, DecisionRule) {
    match kind {
        TaskKind::EmergencyResponse => (Topology::EmergencyOverride, DecisionRule::ExpertOverride),
        TaskKind::Diagnosis => (Topology::Consensus, DecisionRule::WeightedConsensus),
        TaskKind::TreatmentPlanning => (Topology::Collaborative, DecisionRule::MajorityVote),
        TaskKind::PatientMonitoring | TaskKind::ResearchAnalysis => {
            (Topology::Collaborative, DecisionRule::WeightedConsensus)
        }
    }
}

/// Build the plan for `task` given its agents in selector ranking order
///
/// The first agent leads; later specialists consult; everyone else collaborates.
pub fn derive_plan(task: &Task, agents: &[Agent]) -> CoordinationPlan {
    let (topology, decision_rule) = strategy_for(task.kind);

    let roles = agents
        .iter()
        .enumerate()
        .map(|(index, agent)| {
            let role = if index == 0 {
                AgentRole::Lead
            } else if agent.kind == AgentKind::Specialist {
                AgentRole::SpecialistConsultant
            } else {
                AgentRole::Collaborator
            };
            RoleAssignment {
                agent_id: agent.id,
                role,
            }
        })
        .collect();

    tracing::debug!(
        "Derived {:?} plan for task {} with {} agents ({:?})",
        topology,
        task.id,
        agents.len(),
        decision_rule
    );

    CoordinationPlan {
        task_id: task.id,
        topology,
        roles,
        protocol: CommunicationProtocol::StructuredDialogue,
        decision_rule,
        quality_checks: QUALITY_CHECKS.to_vec(),
        created_at: Utc::now(),
    }
}
