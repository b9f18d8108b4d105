//! End-to-end coordinator scenarios

use async_trait::async_trait;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use swarm_core::{
    agent::{Agent, AgentKind},
    capability::{AgentCapability, AgentResult, ResultPayload},
    plan::{AgentRole, DecisionRule, Topology},
    task::{ParticipantStatus, Task, TaskKind, TaskPriority, TaskRequest, TaskStatus},
    AgentId, AgentRegistry, CoreError, FailureCause, Result, SwarmCoordinator,
};

#[derive(Clone)]
enum Behaviour {
    Answer(Vec<&'static str>),
    /// Answer decoded from JSON carrying this confidence verbatim
    Decoded(f64),
    /// Answer whose confidence field is overwritten after construction
    Unchecked(f64),
    Slow(Duration),
    Fail,
    Panic,
}

/// Capability that also checks no agent is ever invoked twice at once
#[derive(Default)]
struct Harness {
    behaviours: HashMap<String, Behaviour>,
    delay: Duration,
    in_flight: Mutex<HashSet<AgentId>>,
    overlaps: AtomicUsize,
    invocations: AtomicUsize,
}

impl Harness {
    fn with(mut self, slug: &str, behaviour: Behaviour) -> Self {
        self.behaviours.insert(slug.to_string(), behaviour);
        self
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

fn payload(kind: TaskKind, items: &[&str]) -> ResultPayload {
    let items: Vec<String> = items.iter().map(|s| s.to_string()).collect();
    match kind {
        TaskKind::Diagnosis => ResultPayload::Diagnosis {
            differential_diagnosis: vec!["Pulmonary embolism".to_string()],
            recommended_tests: items,
            urgency: TaskPriority::High,
            risk_factors: vec!["Recent surgery".to_string()],
        },
        TaskKind::TreatmentPlanning => ResultPayload::TreatmentPlan {
            treatment_options: items,
            medication_recommendations: Vec::new(),
            monitoring_plan: Vec::new(),
            patient_education: Vec::new(),
        },
        TaskKind::EmergencyResponse => ResultPayload::EmergencyResponse {
            triage_level: 1,
            immediate_actions: items,
            resource_requirements: vec!["ICU bed".to_string()],
            protocols: vec!["ACLS protocol".to_string()],
        },
        TaskKind::PatientMonitoring | TaskKind::ResearchAnalysis => ResultPayload::General {
            analysis: "stable".to_string(),
            recommendations: items,
        },
    }
}

#[async_trait]
impl AgentCapability for Harness {
    async fn invoke(&self, agent: &Agent, task: &Task) -> Result<AgentResult> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        if !self.in_flight.lock().insert(agent.id) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }

        let behaviour = self
            .behaviours
            .get(&agent.slug)
            .cloned()
            .unwrap_or(Behaviour::Answer(vec!["Obtain ECG", "CBC"]));

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let outcome = match behaviour {
            Behaviour::Answer(items) => Ok(AgentResult::new(
                agent.id,
                0.9,
                Duration::from_secs(2),
                payload(task.kind, &items),
            )),
            Behaviour::Decoded(confidence) => {
                let answer = AgentResult::new(
                    agent.id,
                    0.5,
                    Duration::from_secs(2),
                    payload(task.kind, &["Obtain ECG"]),
                );
                let mut json = serde_json::to_value(&answer).expect("serializable result");
                json["confidence"] = serde_json::json!(confidence);
                Ok(serde_json::from_value(json).expect("decodable result"))
            }
            Behaviour::Unchecked(confidence) => {
                let mut answer = AgentResult::new(
                    agent.id,
                    0.5,
                    Duration::from_secs(2),
                    payload(task.kind, &["Obtain ECG"]),
                );
                answer.confidence = confidence;
                Ok(answer)
            }
            Behaviour::Slow(delay) => {
                tokio::time::sleep(delay).await;
                Ok(AgentResult::new(
                    agent.id,
                    0.9,
                    delay,
                    payload(task.kind, &["late"]),
                ))
            }
            Behaviour::Fail => Err(CoreError::invocation_failed(&agent.id, "model unavailable")),
            Behaviour::Panic => {
                self.in_flight.lock().remove(&agent.id);
                panic!("inference backend crashed");
            }
        };

        self.in_flight.lock().remove(&agent.id);
        outcome
    }
}

fn agent(slug: &str, kind: AgentKind, specialties: &[&str]) -> Agent {
    Agent::new(slug, slug, kind).with_specialties(specialties.iter().copied())
}

fn coordinator(agents: Vec<Agent>, harness: Harness) -> (SwarmCoordinator, Arc<Harness>) {
    let harness = Arc::new(harness);
    let coordinator = SwarmCoordinator::new(
        AgentRegistry::from_agents(agents).expect("unique agents"),
        harness.clone(),
    );
    (coordinator, harness)
}

fn assert_all_idle(coordinator: &SwarmCoordinator) {
    for agent in coordinator.list_agents() {
        assert!(agent.is_idle(), "{} is {}", agent.slug, agent.status);
    }
}

#[tokio::test]
async fn scenario_a_single_cardiology_agent_leads() {
    let cardio = agent("cardiologist-ai", AgentKind::Specialist, &["Cardiology"]);
    let cardio_id = cardio.id;
    let (coordinator, _) = coordinator(vec![cardio], Harness::default());

    let task_id = coordinator
        .create_task(
            TaskRequest::new(TaskKind::Diagnosis, "Chest pain on exertion", TaskPriority::High)
                .require(["Cardiology"]),
        )
        .await
        .unwrap();
    let task = coordinator.await_task(&task_id).await.unwrap();

    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.assigned_agents, vec![cardio_id]);

    let plan = coordinator.get_plan(&task_id).unwrap().unwrap();
    assert_eq!(plan.topology, Topology::Consensus);
    assert_eq!(plan.role_of(&cardio_id), Some(AgentRole::Lead));
    assert_all_idle(&coordinator);
}

#[tokio::test]
async fn scenario_b_emergency_selects_both_agents() {
    let first = agent("emergency-ai", AgentKind::Emergency, &["Emergency Medicine"]);
    let second = agent("trauma-ai", AgentKind::Emergency, &["Emergency Medicine"]);
    let bystander = agent("research-ai", AgentKind::Research, &["Research"]);
    let expected = HashSet::from([first.id, second.id]);
    let (coordinator, _) = coordinator(vec![first, second, bystander], Harness::default());

    let task_id = coordinator
        .create_task(
            TaskRequest::new(
                TaskKind::EmergencyResponse,
                "Unresponsive patient",
                TaskPriority::Critical,
            )
            .require(["Emergency Medicine"]),
        )
        .await
        .unwrap();
    let task = coordinator.await_task(&task_id).await.unwrap();

    let assigned: HashSet<AgentId> = task.assigned_agents.iter().copied().collect();
    assert_eq!(assigned, expected);
    assert_eq!(task.status, TaskStatus::Completed);

    let plan = coordinator.get_plan(&task_id).unwrap().unwrap();
    assert_eq!(plan.topology, Topology::EmergencyOverride);
    assert_eq!(plan.decision_rule, DecisionRule::ExpertOverride);
    assert_eq!(
        task.consensus.unwrap().decision_rule,
        DecisionRule::ExpertOverride
    );
}

#[tokio::test]
async fn scenario_c_no_matching_agents() {
    let (coordinator, harness) = coordinator(
        vec![agent("cardiologist-ai", AgentKind::Specialist, &["Cardiology"])],
        Harness::default(),
    );

    let task_id = coordinator
        .create_task(
            TaskRequest::new(TaskKind::Diagnosis, "Mass on imaging", TaskPriority::Medium)
                .require(["Oncology"]),
        )
        .await
        .unwrap();
    let task = coordinator.await_task(&task_id).await.unwrap();

    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(task.failure, Some(FailureCause::NoEligibleAgents));
    assert!(task.assigned_agents.is_empty());
    assert_eq!(coordinator.get_plan(&task_id).unwrap(), None);
    assert_eq!(harness.invocations.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn scenario_d_partial_failure_still_completes() {
    let agents = vec![
        agent("diagnostic-ai", AgentKind::Diagnostic, &["Internal Medicine"]),
        agent("radiologist-ai", AgentKind::Diagnostic, &["Internal Medicine"]),
        agent("flaky-ai", AgentKind::Diagnostic, &["Internal Medicine"]),
    ];
    let ids: HashMap<String, AgentId> = agents.iter().map(|a| (a.slug.clone(), a.id)).collect();
    let harness = Harness::default()
        .with("diagnostic-ai", Behaviour::Answer(vec!["CBC", "D-dimer"]))
        .with("radiologist-ai", Behaviour::Answer(vec!["CBC", "Chest X-ray"]))
        .with("flaky-ai", Behaviour::Fail);
    let (coordinator, _) = coordinator(agents, harness);

    let task_id = coordinator
        .create_task(
            TaskRequest::new(TaskKind::Diagnosis, "Dyspnea", TaskPriority::High)
                .require(["Internal Medicine"]),
        )
        .await
        .unwrap();
    let task = coordinator.await_task(&task_id).await.unwrap();

    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.assigned_agents.len(), 3);
    assert_eq!(task.results.len(), 2);

    let consensus = task.consensus.clone().unwrap();
    assert_eq!(consensus.participants, 3);
    assert_eq!(consensus.contributors.len(), 2);
    assert_eq!(consensus.recommendations[0], "CBC");
    assert!((consensus.agreement - 1.0 / 3.0).abs() < 1e-9);
    assert_eq!(consensus.minority_opinions, vec!["D-dimer", "Chest X-ray"]);

    let flaky = task
        .participants
        .iter()
        .find(|p| p.agent_id == ids["flaky-ai"])
        .unwrap();
    assert!(matches!(flaky.status, ParticipantStatus::Errored { .. }));

    let failed = coordinator.get_agent(&ids["flaky-ai"]).unwrap();
    let succeeded = coordinator.get_agent(&ids["diagnostic-ai"]).unwrap();
    assert!((failed.performance.accuracy - (0.95 * 0.9 + 0.05 * 0.75)).abs() < 1e-9);
    assert!((succeeded.performance.accuracy - (0.95 * 0.9 + 0.05 * 0.95)).abs() < 1e-9);
    assert_eq!(failed.performance.tasks_completed, 1);
    assert_all_idle(&coordinator);
}

#[tokio::test]
async fn out_of_range_confidence_is_clamped() {
    let agents = vec![
        agent("overconfident-ai", AgentKind::Diagnostic, &["Cardiology"]),
        agent("nan-ai", AgentKind::Diagnostic, &["Cardiology"]),
    ];
    let harness = Harness::default()
        .with("overconfident-ai", Behaviour::Decoded(1.7))
        .with("nan-ai", Behaviour::Unchecked(f64::NAN));
    let (coordinator, _) = coordinator(agents, harness);

    let task_id = coordinator
        .create_task(
            TaskRequest::new(TaskKind::Diagnosis, "Palpitations", TaskPriority::High)
                .require(["Cardiology"]),
        )
        .await
        .unwrap();
    let task = coordinator.await_task(&task_id).await.unwrap();

    assert_eq!(task.status, TaskStatus::Completed);
    let mut confidences: Vec<f64> = task.results.iter().map(|r| r.confidence).collect();
    confidences.sort_by(f64::total_cmp);
    assert_eq!(confidences, vec![0.0, 1.0]);

    let consensus = task.consensus.unwrap();
    assert_eq!(consensus.confidence, 0.5);
    for (name, score) in [
        ("agreement", consensus.agreement),
        ("confidence", consensus.confidence),
        ("quality", consensus.quality_score),
        ("safety", consensus.safety_score),
    ] {
        assert!((0.0..=1.0).contains(&score), "{} out of [0,1]: {}", name, score);
    }
    assert_all_idle(&coordinator);
}

#[tokio::test]
async fn scenario_e_all_agents_fail() {
    let harness = Harness::default()
        .with("a", Behaviour::Fail)
        .with("b", Behaviour::Fail);
    let (coordinator, _) = coordinator(
        vec![
            agent("a", AgentKind::Treatment, &["Clinical Pharmacy"]),
            agent("b", AgentKind::Treatment, &["Clinical Pharmacy"]),
        ],
        harness,
    );

    let task_id = coordinator
        .create_task(
            TaskRequest::new(
                TaskKind::TreatmentPlanning,
                "Anticoagulation plan",
                TaskPriority::Medium,
            )
            .require(["Clinical Pharmacy"]),
        )
        .await
        .unwrap();
    let task = coordinator.await_task(&task_id).await.unwrap();

    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(task.failure, Some(FailureCause::AllAgentsFailed));
    assert!(task.consensus.is_none());
    assert_all_idle(&coordinator);
    for agent in coordinator.list_agents() {
        assert!((agent.performance.accuracy - (0.95 * 0.9 + 0.05 * 0.75)).abs() < 1e-9);
    }
}

#[tokio::test]
async fn cancelling_a_terminal_task_is_a_no_op() {
    let (coordinator, _) = coordinator(
        vec![agent("nursing-ai", AgentKind::Monitoring, &["Nursing"])],
        Harness::default(),
    );

    let completed = coordinator
        .create_task(
            TaskRequest::new(TaskKind::PatientMonitoring, "Vitals", TaskPriority::Low)
                .require(["Nursing"]),
        )
        .await
        .unwrap();
    let before = coordinator.await_task(&completed).await.unwrap();
    assert!(!coordinator.cancel_task(&completed).unwrap());
    assert_eq!(coordinator.get_task(&completed).unwrap(), before);

    let failed = coordinator
        .create_task(
            TaskRequest::new(TaskKind::PatientMonitoring, "Vitals", TaskPriority::Low)
                .require(["Oncology"]),
        )
        .await
        .unwrap();
    assert!(!coordinator.cancel_task(&failed).unwrap());
    assert!(!coordinator.cancel_task(&failed).unwrap());
    assert_eq!(
        coordinator.get_task(&failed).unwrap().failure,
        Some(FailureCause::NoEligibleAgents)
    );
}

#[tokio::test]
async fn deadline_times_out_slow_agents() {
    let fast = agent("fast-ai", AgentKind::Research, &["Research"]);
    let slow = agent("slow-ai", AgentKind::Research, &["Research"]);
    let slow_id = slow.id;
    let harness = Harness::default().with("slow-ai", Behaviour::Slow(Duration::from_secs(5)));
    let (coordinator, _) = coordinator(vec![fast, slow], harness);

    let task_id = coordinator
        .create_task(
            TaskRequest::new(TaskKind::ResearchAnalysis, "Literature", TaskPriority::Medium)
                .require(["Research"])
                .with_deadline_in(Duration::from_millis(300)),
        )
        .await
        .unwrap();
    let task = coordinator.await_task(&task_id).await.unwrap();

    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.results.len(), 1);
    let timed_out = task
        .participants
        .iter()
        .find(|p| p.agent_id == slow_id)
        .unwrap();
    assert_eq!(timed_out.status, ParticipantStatus::TimedOut);
    assert_all_idle(&coordinator);

    let slow = coordinator.get_agent(&slow_id).unwrap();
    assert!((slow.performance.accuracy - (0.95 * 0.9 + 0.05 * 0.75)).abs() < 1e-9);
}

#[tokio::test]
async fn deadline_with_no_answers_fails() {
    let harness = Harness::default().with("slow-ai", Behaviour::Slow(Duration::from_secs(5)));
    let (coordinator, _) = coordinator(
        vec![agent("slow-ai", AgentKind::Research, &["Research"])],
        harness,
    );

    let task_id = coordinator
        .create_task(
            TaskRequest::new(TaskKind::ResearchAnalysis, "Literature", TaskPriority::Low)
                .require(["Research"])
                .with_deadline_in(Duration::from_millis(100)),
        )
        .await
        .unwrap();
    let task = coordinator.await_task(&task_id).await.unwrap();

    assert_eq!(task.failure, Some(FailureCause::DeadlineExceeded));
    assert_all_idle(&coordinator);
}

#[tokio::test]
async fn panicking_invocation_aborts_and_releases() {
    let harness = Harness::default().with("crashy-ai", Behaviour::Panic);
    let (coordinator, _) = coordinator(
        vec![
            agent("crashy-ai", AgentKind::Emergency, &["Critical Care"]),
            agent("steady-ai", AgentKind::Emergency, &["Critical Care"]),
        ],
        harness,
    );

    let task_id = coordinator
        .create_task(
            TaskRequest::new(TaskKind::EmergencyResponse, "Sepsis", TaskPriority::Critical)
                .require(["Critical Care"]),
        )
        .await
        .unwrap();
    let task = coordinator.await_task(&task_id).await.unwrap();

    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(task.failure, Some(FailureCause::Aborted));
    assert!(
        task.participants
            .iter()
            .any(|p| p.status == ParticipantStatus::Panicked)
    );
    assert_all_idle(&coordinator);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn agents_are_never_shared_between_in_flight_tasks() {
    let agents: Vec<Agent> = (0..5)
        .map(|i| agent(&format!("nurse-{}", i), AgentKind::Monitoring, &["Nursing"]))
        .collect();
    let harness = Harness::default().with_delay(Duration::from_millis(20));
    let (coordinator, harness) = coordinator(agents, harness);

    let mut creations = Vec::new();
    for i in 0..40 {
        let coordinator = coordinator.clone();
        let priority = if i % 3 == 0 {
            TaskPriority::Critical
        } else {
            TaskPriority::Medium
        };
        creations.push(tokio::spawn(async move {
            let task_id = coordinator
                .create_task(
                    TaskRequest::new(TaskKind::PatientMonitoring, "Ward round", priority)
                        .require(["Nursing"]),
                )
                .await?;
            coordinator.await_task(&task_id).await
        }));
    }

    let mut tasks = Vec::new();
    for creation in creations {
        tasks.push(creation.await.unwrap().unwrap());
    }

    assert_eq!(harness.overlaps.load(Ordering::SeqCst), 0);
    for task in &tasks {
        match task.failure {
            Some(FailureCause::NoEligibleAgents) => assert!(task.assigned_agents.is_empty()),
            _ => {
                assert_eq!(task.status, TaskStatus::Completed);
                assert!((1..=5).contains(&task.assigned_agents.len()));
            }
        }
    }
    assert!(tasks.iter().any(|t| t.status == TaskStatus::Completed));

    // every completed task's agents were busy only for their own task's interval
    let mut windows: Vec<_> = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .map(|t| {
            (
                t.timeline.started.unwrap(),
                t.timeline.completed.unwrap(),
                &t.assigned_agents,
            )
        })
        .collect();
    windows.sort_by_key(|(started, _, _)| *started);
    for (i, (start_a, end_a, agents_a)) in windows.iter().enumerate() {
        for (start_b, _, agents_b) in &windows[i + 1..] {
            if start_b < end_a && start_a <= start_b {
                assert!(
                    agents_a.iter().all(|a| !agents_b.contains(a)),
                    "overlapping tasks share an agent"
                );
            }
        }
    }

    assert_all_idle(&coordinator);
    assert_eq!(coordinator.metrics().busy_agents, 0);
}
