//! Deterministic stand-in for real agent reasoning
//!
//! Answers come from fixed clinical playbooks keyed by task kind. Each agent
//! reads a different window of the playbook depending on its slug, so agents
//! partially agree and the consensus has something to work with.

use async_trait::async_trait;
use std::time::Duration;
use swarm_core::{
    Result,
    agent::Agent,
    capability::{AgentCapability, AgentResult, ResultPayload},
    task::{Task, TaskKind, TaskPriority},
};

const TESTS: &[&str] = &[
    "ECG",
    "Chest X-ray",
    "CBC",
    "BMP",
    "Troponin",
    "D-dimer",
    "ABG",
];
const DIAGNOSES: &[&str] = &[
    "Acute coronary syndrome",
    "Pneumonia",
    "Pulmonary embolism",
    "Gastroesophageal reflux",
];
const RISK_FACTORS: &[&str] = &["Hypertension", "Diabetes", "Smoking", "Family history"];
const TREATMENTS: &[&str] = &[
    "Medication therapy",
    "Surgical intervention",
    "Physical therapy",
    "Lifestyle modification",
];
const MEDICATIONS: &[&str] = &["ACE inhibitor", "Beta blocker", "Statin", "Anticoagulant"];
const MONITORING: &[&str] = &["Blood pressure checks", "Lab work", "Follow-up visits"];
const EDUCATION: &[&str] = &["Medication adherence", "Diet", "Exercise"];
const ACTIONS: &[&str] = &[
    "Establish IV access",
    "Obtain ECG",
    "Administer oxygen",
    "Pain management",
];
const RESOURCES: &[&str] = &["ICU bed", "Cardiology consult", "Imaging"];
const PROTOCOLS: &[&str] = &["ACLS protocol", "Sepsis bundle", "Stroke protocol"];
const GENERAL: &[&str] = &[
    "Continue current monitoring",
    "Review in 24 hours",
    "Escalate on deterioration",
    "Update care plan",
];

#[derive(Debug, Clone, Default)]
pub struct PlaybookCapability;

impl PlaybookCapability {
    pub fn answer(&self, agent: &Agent, task: &Task) -> ResultPayload {
        let seed = seed(&agent.slug);
        match task.kind {
            TaskKind::Diagnosis => ResultPayload::Diagnosis {
                differential_diagnosis: window(DIAGNOSES, seed, 2),
                recommended_tests: window(TESTS, seed, 3),
                urgency: task.priority,
                risk_factors: window(RISK_FACTORS, seed, 2),
            },
            TaskKind::TreatmentPlanning => ResultPayload::TreatmentPlan {
                treatment_options: window(TREATMENTS, seed, 2),
                medication_recommendations: window(MEDICATIONS, seed, 2),
                monitoring_plan: window(MONITORING, seed, 2),
                patient_education: window(EDUCATION, seed, 2),
            },
            TaskKind::EmergencyResponse => ResultPayload::EmergencyResponse {
                triage_level: triage_level(task.priority),
                immediate_actions: window(ACTIONS, seed, 3),
                resource_requirements: window(RESOURCES, seed, 2),
                protocols: window(PROTOCOLS, seed, 1),
            },
            TaskKind::PatientMonitoring | TaskKind::ResearchAnalysis => ResultPayload::General {
                analysis: format!("{} review: {}", agent.name, task.description),
                recommendations: window(GENERAL, seed, 2),
            },
        }
    }
}

#[async_trait]
impl AgentCapability for PlaybookCapability {
    async fn invoke(&self, agent: &Agent, task: &Task) -> Result<AgentResult> {
        let payload = self.answer(agent, task);
        tracing::debug!("Playbook answer from {} for task {}", agent.slug, task.id);
        Ok(AgentResult::new(
            agent.id,
            agent.performance.accuracy,
            response_time(agent),
            payload,
        ))
    }
}

/// The agent's average response time; zero when the record holds no usable value
fn response_time(agent: &Agent) -> Duration {
    Duration::try_from_secs_f64(agent.performance.average_response_secs).unwrap_or_default()
}

fn seed(slug: &str) -> usize {
    slug.bytes()
        .fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize))
}

fn window(items: &[&str], seed: usize, len: usize) -> Vec<String> {
    (0..len.min(items.len()))
        .map(|i| items[(seed % items.len() + i) % items.len()].to_string())
        .collect()
}

/// Emergency Severity Index level for a priority
fn triage_level(priority: TaskPriority) -> u8 {
    match priority {
        TaskPriority::Critical => 1,
        TaskPriority::High => 2,
        TaskPriority::Medium => 3,
        TaskPriority::Low => 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_window_wraps() {
        assert_eq!(window(&["a", "b", "c"], 2, 2), vec!["c", "a"]);
        assert_eq!(window(&["a"], 7, 3), vec!["a"]);
    }

    #[test]
    fn test_seed_is_stable() {
        assert_eq!(seed("cardiologist-ai"), seed("cardiologist-ai"));
        assert_ne!(seed("cardiologist-ai"), seed("emergency-ai"));
    }

    #[tokio::test]
    async fn test_default_roster_agrees_on_diagnosis() {
        let coordinator = swarm_core::SwarmCoordinator::from_config(
            &swarm_core::SwarmConfig::default(),
            std::sync::Arc::new(PlaybookCapability),
        )
        .unwrap();

        let task_id = coordinator
            .create_task(
                swarm_core::TaskRequest::new(TaskKind::Diagnosis, "Chest pain", TaskPriority::High)
                    .require(["Internal Medicine", "Cardiology", "Radiology"]),
            )
            .await
            .unwrap();
        let task = coordinator.await_task(&task_id).await.unwrap();

        assert_eq!(task.status, swarm_core::TaskStatus::Completed);
        assert_eq!(task.assigned_agents.len(), 3);
        let consensus = task.consensus.unwrap();
        assert!(!consensus.recommendations.is_empty());
        assert!(consensus.recommendations.len() <= 5);
    }

    #[test]
    fn test_unusable_response_time_reports_zero() {
        let mut agent = Agent::new("slow-ai", "Slow", swarm_core::AgentKind::Research);
        agent.performance.average_response_secs = 1.5;
        assert_eq!(response_time(&agent), Duration::from_millis(1500));

        agent.performance.average_response_secs = f64::INFINITY;
        assert_eq!(response_time(&agent), Duration::ZERO);
        agent.performance.average_response_secs = -3.0;
        assert_eq!(response_time(&agent), Duration::ZERO);
    }

    #[test]
    fn test_triage_levels() {
        assert_eq!(triage_level(TaskPriority::Critical), 1);
        assert_eq!(triage_level(TaskPriority::Low), 4);
    }
}
