//! Shared test utilities for coordinator tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

use crate::{
    CoreError, Result,
    agent::{Agent, AgentKind},
    capability::{AgentCapability, AgentResult, ResultPayload},
    task::{Task, TaskKind},
};

/// Idle diagnostic agent with default performance
pub fn test_agent(slug: &str, specialties: &[&str]) -> Agent {
    Agent::new(slug, slug, AgentKind::Diagnostic).with_specialties(specialties.iter().copied())
}

/// What a scripted agent does when invoked
#[derive(Debug, Clone)]
pub enum Script {
    /// Answer with this confidence and the default recommendations
    Confidence(f64),
    /// Answer with these recommendations
    Recommend(Vec<String>),
    /// Sleep, then answer normally
    Delay(Duration),
    Fail(String),
    Panic,
}

/// Capability whose behaviour is fixed per agent slug
///
/// Unscripted agents answer immediately with confidence 0.9.
#[derive(Debug, Clone, Default)]
pub struct ScriptedCapability {
    scripts: HashMap<String, Script>,
}

impl ScriptedCapability {
    pub fn script(mut self, slug: &str, script: Script) -> Self {
        self.scripts.insert(slug.to_string(), script);
        self
    }
}

pub fn payload(kind: TaskKind, items: Vec<String>) -> ResultPayload {
    match kind {
        TaskKind::Diagnosis => ResultPayload::Diagnosis {
            differential_diagnosis: vec!["Acute coronary syndrome".to_string()],
            recommended_tests: items,
            urgency: crate::task::TaskPriority::High,
            risk_factors: Vec::new(),
        },
        TaskKind::TreatmentPlanning => ResultPayload::TreatmentPlan {
            treatment_options: items,
            medication_recommendations: Vec::new(),
            monitoring_plan: Vec::new(),
            patient_education: Vec::new(),
        },
        TaskKind::EmergencyResponse => ResultPayload::EmergencyResponse {
            triage_level: 2,
            immediate_actions: items,
            resource_requirements: Vec::new(),
            protocols: Vec::new(),
        },
        TaskKind::PatientMonitoring | TaskKind::ResearchAnalysis => ResultPayload::General {
            analysis: "test analysis".to_string(),
            recommendations: items,
        },
    }
}

#[async_trait]
impl AgentCapability for ScriptedCapability {
    async fn invoke(&self, agent: &Agent, task: &Task) -> Result<AgentResult> {
        let mut confidence = 0.9;
        let mut items = vec!["ECG".to_string(), "Troponin".to_string()];

        match self.scripts.get(&agent.slug) {
            Some(Script::Confidence(value)) => confidence = *value,
            Some(Script::Recommend(recommendations)) => items = recommendations.clone(),
            Some(Script::Delay(delay)) => tokio::time::sleep(*delay).await,
            Some(Script::Fail(reason)) => {
                return Err(CoreError::invocation_failed(&agent.id, reason.clone()));
            }
            Some(Script::Panic) => panic!("scripted panic for {}", agent.slug),
            None => {}
        }

        Ok(AgentResult::new(
            agent.id,
            confidence,
            Duration::from_secs(2),
            payload(task.kind, items),
        ))
    }
}
