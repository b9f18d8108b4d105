//! The contract between the engine and whatever actually does an agent's work
//!
//! The engine never reasons about a case itself. For every assigned agent it
//! calls [`AgentCapability::invoke`] and gets back a structured
//! [`AgentResult`], or an error which it absorbs as a partial failure.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{
    AgentId, Result,
    agent::Agent,
    task::{Task, TaskKind, TaskPriority},
};

/// Backend that performs an agent's reasoning (an LLM, a rules engine, ...)
///
/// Implementations may be called concurrently for different agents of the
/// same task. An agent is not claimed for a new task while one of its
/// invocations is outstanding, except after `cancel_task`: cancelling releases
/// the agent at once while its dispatched invocation keeps running, so a new
/// task may invoke the same agent before that call returns.
#[async_trait]
pub trait AgentCapability: Send + Sync {
    async fn invoke(&self, agent: &Agent, task: &Task) -> Result<AgentResult>;
}

/// Output of one agent for one task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AgentResult {
    pub agent_id: AgentId,
    /// Self-reported confidence, clamped to `[0, 1]`
    pub confidence: f64,
    /// Processing time reported by the agent
    #[serde(with = "crate::utils::serde_duration")]
    #[schemars(with = "u64")]
    pub processing_time: Duration,
    pub payload: ResultPayload,
    pub produced_at: DateTime<Utc>,
}

impl AgentResult {
    pub fn new(
        agent_id: AgentId,
        confidence: f64,
        processing_time: Duration,
        payload: ResultPayload,
    ) -> Self {
        Self {
            agent_id,
            confidence: unit_interval(confidence),
            processing_time,
            payload,
            produced_at: Utc::now(),
        }
    }

    /// Clamp the confidence into `[0, 1]`
    ///
    /// Results that were decoded or built field by field skip [`AgentResult::new`],
    /// so the engine normalizes every result it receives.
    pub fn normalized(mut self) -> Self {
        self.confidence = unit_interval(self.confidence);
        self
    }

    /// The items this result contributes to consensus
    pub fn recommendations(&self) -> &[String] {
        self.payload.recommendations()
    }
}

/// Clamp to `[0, 1]`, treating NaN as 0
pub(crate) fn unit_interval(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Task-kind specific result body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResultPayload {
    Diagnosis {
        differential_diagnosis: Vec<String>,
        recommended_tests: Vec<String>,
        urgency: TaskPriority,
        risk_factors: Vec<String>,
    },
    TreatmentPlan {
        treatment_options: Vec<String>,
        medication_recommendations: Vec<String>,
        monitoring_plan: Vec<String>,
        patient_education: Vec<String>,
    },
    EmergencyResponse {
        /// Emergency Severity Index, 1 (immediate) to 5 (non-urgent)
        triage_level: u8,
        immediate_actions: Vec<String>,
        resource_requirements: Vec<String>,
        protocols: Vec<String>,
    },
    General {
        analysis: String,
        recommendations: Vec<String>,
    },
}

impl ResultPayload {
    pub fn recommendations(&self) -> &[String] {
        match self {
            Self::Diagnosis {
                recommended_tests, ..
            } => recommended_tests,
            Self::TreatmentPlan {
                treatment_options, ..
            } => treatment_options,
            Self::EmergencyResponse {
                immediate_actions, ..
            } => immediate_actions,
            Self::General {
                recommendations, ..
            } => recommendations,
        }
    }

    /// Whether this payload shape is the one expected for `kind`
    pub fn fits(&self, kind: TaskKind) -> bool {
        match self {
            Self::Diagnosis { .. } => kind == TaskKind::Diagnosis,
            Self::TreatmentPlan { .. } => kind == TaskKind::TreatmentPlanning,
            Self::EmergencyResponse { .. } => kind == TaskKind::EmergencyResponse,
            Self::General { .. } => matches!(
                kind,
                TaskKind::PatientMonitoring | TaskKind::ResearchAnalysis
            ),
        }
    }
}
