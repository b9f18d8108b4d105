//! In-memory agent registry
//!
//! The registry is the single synchronization point shared between tasks.
//! Every status change goes through a compare-and-set under its lock, which is
//! what guarantees an agent is never busy for two tasks at once.

use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

use crate::{
    AgentId, CoreError, Result, TaskId,
    agent::{Agent, AgentStatus, PerformanceRecord},
    error::ConfigError,
};

#[derive(Debug, Default)]
struct RegistryInner {
    /// Registration order; selection tie-breaks depend on it
    agents: Vec<Agent>,
    index: HashMap<AgentId, usize>,
    slugs: HashMap<String, usize>,
}

impl RegistryInner {
    fn get(&self, id: &AgentId) -> Result<&Agent> {
        self.index
            .get(id)
            .map(|&i| &self.agents[i])
            .ok_or_else(|| CoreError::agent_not_found(id.to_string()))
    }

    fn get_mut(&mut self, id: &AgentId) -> Result<&mut Agent> {
        match self.index.get(id) {
            Some(&i) => Ok(&mut self.agents[i]),
            None => Err(CoreError::agent_not_found(id.to_string())),
        }
    }
}

#[derive(Debug, Default)]
pub struct AgentRegistry {
    inner: RwLock<RegistryInner>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_agents(agents: impl IntoIterator<Item = Agent>) -> Result<Self> {
        let registry = Self::new();
        for agent in agents {
            registry.register(agent)?;
        }
        Ok(registry)
    }

    /// Add an agent. Ids and slugs must be unique.
    pub fn register(&self, agent: Agent) -> Result<AgentId> {
        let mut inner = self.inner.write();

        if inner.index.contains_key(&agent.id) || inner.slugs.contains_key(&agent.slug) {
            return Err(CoreError::ConfigurationError {
                config_path: "registry".to_string(),
                field: "agents".to_string(),
                expected: "unique agent ids and slugs".to_string(),
                cause: ConfigError::Invalid(format!("duplicate agent '{}'", agent.slug)),
            });
        }

        let id = agent.id;
        let position = inner.agents.len();
        inner.index.insert(id, position);
        inner.slugs.insert(agent.slug.clone(), position);
        tracing::debug!("Registered agent {} ({})", agent.slug, id);
        inner.agents.push(agent);

        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.inner.read().agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every agent in registration order
    pub fn list(&self) -> Vec<Agent> {
        self.inner.read().agents.clone()
    }

    /// Agents whose specialties include `tag`
    pub fn by_capability(&self, tag: &str) -> Vec<Agent> {
        self.inner
            .read()
            .agents
            .iter()
            .filter(|agent| agent.has_specialty(tag))
            .cloned()
            .collect()
    }

    pub fn get(&self, id: &AgentId) -> Result<Agent> {
        self.inner.read().get(id).cloned()
    }

    pub fn get_by_slug(&self, slug: &str) -> Result<Agent> {
        let inner = self.inner.read();
        inner
            .slugs
            .get(slug)
            .map(|&i| inner.agents[i].clone())
            .ok_or_else(|| CoreError::agent_not_found(slug))
    }

    pub fn status(&self, id: &AgentId) -> Result<AgentStatus> {
        self.inner.read().get(id).map(|agent| agent.status)
    }

    /// Compare-and-set status transition
    ///
    /// Fails with `StatusConflict` when the agent's current status is not
    /// `expected`, or when `expected -> next` is not a legal transition.
    pub fn set_status(&self, id: &AgentId, expected: AgentStatus, next: AgentStatus) -> Result<()> {
        let mut inner = self.inner.write();
        let agent = inner.get_mut(id)?;

        if agent.status != expected || !expected.can_transition_to(&next) {
            tracing::warn!(
                "Rejected status change for {}: is {}, expected {}, requested {}",
                agent.slug,
                agent.status,
                expected,
                next
            );
            return Err(CoreError::status_conflict(
                id,
                agent.status.to_string(),
                expected.to_string(),
                format!("set_status({})", next),
            ));
        }

        agent.status = next;
        Ok(())
    }

    /// Select agents for `task_id` and mark them busy in one atomic step
    ///
    /// `select` sees a snapshot of all agents in registration order and
    /// returns the chosen ids best first. Either every chosen agent moves
    /// from idle to busy, or nothing changes.
    pub fn claim<F>(&self, task_id: TaskId, select: F) -> Result<Vec<Agent>>
    where
        F: FnOnce(&[Agent]) -> Result<Vec<AgentId>>,
    {
        let mut inner = self.inner.write();
        let chosen = select(&inner.agents)?;

        let busy = AgentStatus::Busy { task_id };
        let mut seen = HashSet::with_capacity(chosen.len());
        for id in &chosen {
            let agent = inner.get(id)?;
            if !seen.insert(*id) || !agent.status.can_transition_to(&busy) {
                return Err(CoreError::status_conflict(
                    id,
                    agent.status.to_string(),
                    AgentStatus::Idle.to_string(),
                    format!("claim for {}", task_id),
                ));
            }
        }

        let mut claimed = Vec::with_capacity(chosen.len());
        for id in &chosen {
            let agent = inner.get_mut(id)?;
            agent.status = busy;
            claimed.push(agent.clone());
        }

        Ok(claimed)
    }

    /// Return agents still busy for `task_id` to idle
    ///
    /// Agents that have already moved on (released, or busy for another
    /// task) are left alone. Returns how many were released.
    pub fn release(&self, task_id: &TaskId, agents: &[AgentId]) -> usize {
        let mut inner = self.inner.write();
        let mut released = 0;
        for id in agents {
            if let Ok(agent) = inner.get_mut(id) {
                if agent.current_task() == Some(*task_id) {
                    agent.status = AgentStatus::Idle;
                    released += 1;
                }
            }
        }
        released
    }

    /// Apply a performance update and release the agent, if it is still busy
    /// for `task_id`
    pub(crate) fn settle<F>(&self, task_id: &TaskId, id: &AgentId, update: F) -> bool
    where
        F: FnOnce(&mut PerformanceRecord),
    {
        let mut inner = self.inner.write();
        match inner.get_mut(id) {
            Ok(agent) if agent.current_task() == Some(*task_id) => {
                update(&mut agent.performance);
                agent.status = AgentStatus::Idle;
                true
            }
            _ => false,
        }
    }
}

/// Releases a task's agents when dropped
///
/// Held by the execution for its whole lifetime so that agents go back to
/// idle on every exit path, including a panic or an aborted runtime task.
pub(crate) struct AgentLease {
    registry: std::sync::Arc<AgentRegistry>,
    task_id: TaskId,
    agents: Vec<AgentId>,
}

impl AgentLease {
    pub(crate) fn new(
        registry: std::sync::Arc<AgentRegistry>,
        task_id: TaskId,
        agents: Vec<AgentId>,
    ) -> Self {
        Self {
            registry,
            task_id,
            agents,
        }
    }
}

impl Drop for AgentLease {
    fn drop(&mut self) {
        let released = self.registry.release(&self.task_id, &self.agents);
        if released > 0 {
            tracing::debug!(
                "Lease for task {} released {} agent(s)",
                self.task_id,
                released
            );
        }
    }
}
