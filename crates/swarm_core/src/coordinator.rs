//! The execution coordinator
//!
//! [`SwarmCoordinator`] owns every task for the lifetime of the process. A
//! task flows through the registry (claim), the selector, the planner, the
//! concurrent agent invocations, the synthesizer and finally the tracker.
//!
//! Two locks are involved: the per-task entry in the task map and the
//! registry's lock. Whenever both are needed the entry is taken first.

use chrono::Utc;
use dashmap::DashMap;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::{
    AgentId, CoreError, Result, TaskId,
    agent::Agent,
    capability::{AgentCapability, AgentResult},
    config::{CoordinatorConfig, SwarmConfig},
    consensus::{ConsensusSynthesizer, Contribution},
    metrics::{AgentPerformanceReport, SwarmMetrics},
    plan::{CoordinationPlan, derive_plan},
    registry::{AgentLease, AgentRegistry},
    selector::{AgentSelector, CapabilitySelector, SelectionRequest},
    task::{
        FailureCause, ParticipantOutcome, ParticipantStatus, Task, TaskRequest, TaskStatus,
    },
    tracker::PerformanceTracker,
};

struct TaskEntry {
    task: Task,
    plan: Option<CoordinationPlan>,
    status: watch::Sender<TaskStatus>,
}

impl TaskEntry {
    fn new(task: Task, plan: Option<CoordinationPlan>) -> Self {
        let (status, _) = watch::channel(task.status);
        Self { task, plan, status }
    }
}

struct Inner {
    registry: Arc<AgentRegistry>,
    selector: Arc<dyn AgentSelector>,
    capability: Arc<dyn AgentCapability>,
    synthesizer: ConsensusSynthesizer,
    tracker: PerformanceTracker,
    tasks: DashMap<TaskId, TaskEntry>,
    settings: CoordinatorConfig,
}

/// Multi-agent task coordinator
///
/// Cheap to clone; clones share the same registry and tasks.
#[derive(Clone)]
pub struct SwarmCoordinator {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for SwarmCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwarmCoordinator")
            .field("agents", &self.inner.registry.len())
            .field("tasks", &self.inner.tasks.len())
            .field("selector", &self.inner.selector.name())
            .finish()
    }
}

pub struct SwarmCoordinatorBuilder {
    registry: AgentRegistry,
    capability: Arc<dyn AgentCapability>,
    selector: Arc<dyn AgentSelector>,
    settings: CoordinatorConfig,
}

impl SwarmCoordinatorBuilder {
    pub fn selector(mut self, selector: impl AgentSelector + 'static) -> Self {
        self.selector = Arc::new(selector);
        self
    }

    pub fn settings(mut self, settings: CoordinatorConfig) -> Self {
        self.settings = settings;
        self
    }

    pub fn build(self) -> SwarmCoordinator {
        tracing::debug!(
            "Building coordinator with {} agents and the {} selector",
            self.registry.len(),
            self.selector.name()
        );
        SwarmCoordinator {
            inner: Arc::new(Inner {
                registry: Arc::new(self.registry),
                selector: self.selector,
                capability: self.capability,
                synthesizer: ConsensusSynthesizer,
                tracker: PerformanceTracker,
                tasks: DashMap::new(),
                settings: self.settings,
            }),
        }
    }
}

impl SwarmCoordinator {
    pub fn builder(
        registry: AgentRegistry,
        capability: Arc<dyn AgentCapability>,
    ) -> SwarmCoordinatorBuilder {
        SwarmCoordinatorBuilder {
            registry,
            capability,
            selector: Arc::new(CapabilitySelector),
            settings: CoordinatorConfig::default(),
        }
    }

    pub fn new(registry: AgentRegistry, capability: Arc<dyn AgentCapability>) -> Self {
        Self::builder(registry, capability).build()
    }

    /// Register the configured roster (or the built-in one) and apply the
    /// coordinator settings
    pub fn from_config(config: &SwarmConfig, capability: Arc<dyn AgentCapability>) -> Result<Self> {
        config.validate("configuration")?;
        let registry =
            AgentRegistry::from_agents(config.roster().iter().map(|agent| agent.to_agent()))?;
        Ok(Self::builder(registry, capability)
            .settings(config.coordinator.clone())
            .build())
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.inner.registry
    }

    pub fn settings(&self) -> &CoordinatorConfig {
        &self.inner.settings
    }

    /// Create a task and start executing it in the background
    ///
    /// Malformed requests are rejected without creating anything. When no
    /// idle agent matches, the task is still created and immediately fails
    /// with [`FailureCause::NoEligibleAgents`]. Must be called from within a
    /// Tokio runtime.
    pub async fn create_task(&self, mut request: TaskRequest) -> Result<TaskId> {
        if request.deadline.is_none() {
            if let Some(default) = self.inner.settings.default_deadline {
                request = request.with_deadline_in(default);
            }
        }
        request.validate()?;

        let mut task = Task::from_request(request);
        let task_id = task.id;
        tracing::info!(
            "Created {} task {} ({} priority) requiring [{}]",
            task.kind,
            task_id,
            task.priority,
            task.required_capabilities.join(", ")
        );

        // nobody else knows task_id yet, so claiming before the task is visible
        // cannot race with cancellation
        let selection = SelectionRequest {
            required_capabilities: &task.required_capabilities,
            priority: task.priority,
        };
        let selector = &self.inner.selector;
        let claimed = self
            .inner
            .registry
            .claim(task_id, |candidates| selector.select(candidates, &selection));

        let agents = match claimed {
            Ok(agents) if !agents.is_empty() => agents,
            Ok(_) | Err(CoreError::NoEligibleAgents { .. }) => {
                tracing::warn!(
                    "No eligible agents for task {} requiring [{}]",
                    task_id,
                    task.required_capabilities.join(", ")
                );
                task.fail(FailureCause::NoEligibleAgents);
                self.inner.tasks.insert(task_id, TaskEntry::new(task, None));
                return Ok(task_id);
            }
            Err(e) => return Err(e),
        };

        task.assigned_agents = agents.iter().map(|agent| agent.id).collect();
        task.status = TaskStatus::InProgress;
        task.timeline.started = Some(Utc::now());
        let plan = derive_plan(&task, &agents);

        tracing::info!(
            "Task {} in progress with {} agent(s): {}",
            task_id,
            agents.len(),
            agents
                .iter()
                .map(|agent| agent.slug.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let snapshot = Arc::new(task.clone());
        self.inner
            .tasks
            .insert(task_id, TaskEntry::new(task, Some(plan)));

        let runner = tokio::spawn(self.inner.clone().execute(snapshot, agents));
        let inner = self.inner.clone();
        tokio::spawn(async move {
            if let Err(e) = runner.await {
                inner.abort(task_id, &e.to_string());
            }
        });

        Ok(task_id)
    }

    pub fn get_task(&self, task_id: &TaskId) -> Result<Task> {
        self.inner
            .tasks
            .get(task_id)
            .map(|entry| entry.task.clone())
            .ok_or_else(|| CoreError::task_not_found(task_id))
    }

    /// Cancel a pending or in-progress task
    ///
    /// Returns `false` if the task had already ended. Invocations that were
    /// already dispatched keep running; their results are discarded.
    pub fn cancel_task(&self, task_id: &TaskId) -> Result<bool> {
        let mut entry = self
            .inner
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| CoreError::task_not_found(task_id))?;

        if entry.task.status.is_terminal() {
            tracing::debug!(
                "Ignoring cancel for task {} which is already {}",
                task_id,
                entry.task.status
            );
            return Ok(false);
        }

        entry.task.fail(FailureCause::Cancelled);
        self.inner.tracker.record(&self.inner.registry, &entry.task);
        entry.status.send_replace(entry.task.status);

        tracing::warn!("Task {} cancelled", task_id);
        Ok(true)
    }

    /// Wait until the task reaches a terminal status and return it
    pub async fn await_task(&self, task_id: &TaskId) -> Result<Task> {
        let mut status = self
            .inner
            .tasks
            .get(task_id)
            .map(|entry| entry.status.subscribe())
            .ok_or_else(|| CoreError::task_not_found(task_id))?;

        // the sender lives as long as the entry, which is never removed
        if status.wait_for(TaskStatus::is_terminal).await.is_err() {
            tracing::warn!("Status channel for task {} closed", task_id);
        }

        self.get_task(task_id)
    }

    /// Pending and in-progress tasks, oldest first
    pub fn active_tasks(&self) -> Vec<Task> {
        let mut tasks: Vec<Task> = self
            .inner
            .tasks
            .iter()
            .filter(|entry| !entry.task.status.is_terminal())
            .map(|entry| entry.task.clone())
            .collect();
        tasks.sort_by(|a, b| a.timeline.created.cmp(&b.timeline.created));
        tasks
    }

    /// All tasks, newest first, at most `limit` (default from settings)
    pub fn task_history(&self, limit: Option<usize>) -> Vec<Task> {
        let mut tasks = self.all_tasks();
        tasks.sort_by(|a, b| b.timeline.created.cmp(&a.timeline.created));
        tasks.truncate(limit.unwrap_or(self.inner.settings.history_limit));
        tasks
    }

    /// The task's plan; `None` if it never started
    pub fn get_plan(&self, task_id: &TaskId) -> Result<Option<CoordinationPlan>> {
        self.inner
            .tasks
            .get(task_id)
            .map(|entry| entry.plan.clone())
            .ok_or_else(|| CoreError::task_not_found(task_id))
    }

    pub fn list_agents(&self) -> Vec<Agent> {
        self.inner.registry.list()
    }

    pub fn agents_by_capability(&self, tag: &str) -> Vec<Agent> {
        self.inner.registry.by_capability(tag)
    }

    pub fn get_agent(&self, agent_id: &AgentId) -> Result<Agent> {
        self.inner.registry.get(agent_id)
    }

    pub fn agent_by_slug(&self, slug: &str) -> Result<Agent> {
        self.inner.registry.get_by_slug(slug)
    }

    pub fn get_agent_performance(&self, agent_id: &AgentId) -> Result<AgentPerformanceReport> {
        let agent = self.inner.registry.get(agent_id)?;
        Ok(AgentPerformanceReport::build(
            agent,
            &self.all_tasks(),
            Utc::now(),
        ))
    }

    pub fn metrics(&self) -> SwarmMetrics {
        SwarmMetrics::collect(&self.inner.registry.list(), &self.all_tasks())
    }

    fn all_tasks(&self) -> Vec<Task> {
        self.inner
            .tasks
            .iter()
            .map(|entry| entry.task.clone())
            .collect()
    }
}

impl Inner {
    /// Invoke every assigned agent concurrently and wait for all of them
    async fn execute(self: Arc<Self>, task: Arc<Task>, agents: Vec<Agent>) {
        let task_id = task.id;
        let _lease = AgentLease::new(
            self.registry.clone(),
            task_id,
            agents.iter().map(|agent| agent.id).collect(),
        );

        let deadline = task.timeline.deadline.map(|deadline| {
            let remaining = (deadline - Utc::now()).to_std().unwrap_or(Duration::ZERO);
            Instant::now() + remaining
        });

        let invocations = agents.iter().map(|agent| {
            let capability = self.capability.clone();
            let agent = agent.clone();
            let agent_id = agent.id;
            let task = task.clone();
            let started = Instant::now();
            let mut handle = tokio::spawn(async move { capability.invoke(&agent, &task).await });

            async move {
                let joined = match deadline {
                    Some(deadline) => match tokio::time::timeout_at(deadline, &mut handle).await {
                        Ok(joined) => Some(joined),
                        Err(_) => {
                            handle.abort();
                            None
                        }
                    },
                    None => Some(handle.await),
                };
                (agent_id, started.elapsed(), joined)
            }
        });

        let mut participants = Vec::with_capacity(agents.len());
        let mut results = Vec::with_capacity(agents.len());

        for (agent_id, elapsed, joined) in join_all(invocations).await {
            let status = match joined {
                Some(Ok(Ok(result))) => {
                    let mut result = result.normalized();
                    result.agent_id = agent_id;
                    results.push(result);
                    ParticipantStatus::Succeeded
                }
                Some(Ok(Err(e))) => {
                    let reason = match e {
                        CoreError::AgentInvocationFailed { reason, .. } => reason,
                        other => other.to_string(),
                    };
                    tracing::warn!("Agent {} failed on task {}: {}", agent_id, task_id, reason);
                    ParticipantStatus::Errored { reason }
                }
                Some(Err(e)) if e.is_panic() => {
                    tracing::error!("Agent {} panicked on task {}", agent_id, task_id);
                    ParticipantStatus::Panicked
                }
                Some(Err(e)) => ParticipantStatus::Errored {
                    reason: e.to_string(),
                },
                None => {
                    tracing::warn!("Agent {} timed out on task {}", agent_id, task_id);
                    ParticipantStatus::TimedOut
                }
            };
            participants.push(ParticipantOutcome {
                agent_id,
                status,
                elapsed,
            });
        }

        self.finalize(task_id, &agents, participants, results);
    }

    fn finalize(
        &self,
        task_id: TaskId,
        agents: &[Agent],
        participants: Vec<ParticipantOutcome>,
        results: Vec<AgentResult>,
    ) {
        let Some(mut entry) = self.tasks.get_mut(&task_id) else {
            return;
        };
        let entry = &mut *entry;

        if entry.task.status.is_terminal() {
            tracing::info!(
                "Discarding {} result(s) for task {} which is already {}",
                results.len(),
                task_id,
                entry.task.status
            );
            return;
        }

        let task = &mut entry.task;
        task.participants = participants;

        let panicked = task
            .participants
            .iter()
            .any(|p| p.status == ParticipantStatus::Panicked);
        let all_timed_out = task
            .participants
            .iter()
            .all(|p| p.status == ParticipantStatus::TimedOut);

        if panicked {
            task.fail(FailureCause::Aborted);
        } else if results.is_empty() {
            task.fail(if all_timed_out {
                FailureCause::DeadlineExceeded
            } else {
                FailureCause::AllAgentsFailed
            });
        } else {
            let contributions: Vec<Contribution<'_>> = results
                .iter()
                .map(|result| Contribution {
                    result,
                    safety_score: agents
                        .iter()
                        .find(|agent| agent.id == result.agent_id)
                        .map(|agent| agent.performance.patient_safety_score)
                        .unwrap_or(0.0),
                })
                .collect();
            let decision_rule = entry
                .plan
                .as_ref()
                .map(|plan| plan.decision_rule)
                .unwrap_or_else(|| crate::plan::strategy_for(task.kind).1);

            let consensus = self.synthesizer.synthesize(
                task.kind,
                decision_rule,
                task.assigned_agents.len(),
                &contributions,
            );
            let escalate = self.settings.escalate_on_safety_concern
                && consensus.as_ref().is_some_and(|c| c.requires_escalation());

            task.status = if escalate {
                TaskStatus::Escalated
            } else {
                TaskStatus::Completed
            };
            task.consensus = consensus;
            task.timeline.completed = Some(Utc::now());
        }
        task.results = results;

        let updated = self.tracker.record(&self.registry, task);
        entry.status.send_replace(task.status);

        match task.failure {
            Some(FailureCause::Aborted) => tracing::error!(
                "Task {} aborted after an agent invocation panicked",
                task_id
            ),
            Some(cause) => tracing::warn!("Task {} failed: {}", task_id, cause),
            None => tracing::info!(
                "Task {} {} with {} of {} agents ({} updated)",
                task_id,
                task.status,
                task.results.len(),
                task.assigned_agents.len(),
                updated
            ),
        }
    }

    /// Fail a task whose execution itself died
    fn abort(&self, task_id: TaskId, reason: &str) {
        let Some(mut entry) = self.tasks.get_mut(&task_id) else {
            return;
        };
        if entry.task.status.is_terminal() {
            return;
        }
        tracing::error!("Execution of task {} aborted: {}", task_id, reason);
        entry.task.fail(FailureCause::Aborted);
        self.tracker.record(&self.registry, &entry.task);
        let status = entry.task.status;
        entry.status.send_replace(status);
    }
}
