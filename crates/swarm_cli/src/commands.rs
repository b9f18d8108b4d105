use miette::{IntoDiagnostic, Result};
use owo_colors::OwoColorize;
use std::path::Path;
use std::time::Duration;
use swarm_core::{
    SwarmCoordinator,
    agent::Agent,
    config::{self, SwarmConfig},
    task::{Task, TaskKind, TaskPriority, TaskRequest},
    utils::format_duration,
};

use crate::output::{
    Output, format_agent_status, format_participant, format_safety, format_score,
    format_task_status,
};

/// Print the registry, optionally filtered to one capability tag
pub fn agents(coordinator: &SwarmCoordinator, capability: Option<&str>) -> Result<()> {
    let output = Output::new();
    let agents = match capability {
        Some(tag) => coordinator.agents_by_capability(tag),
        None => coordinator.list_agents(),
    };

    if agents.is_empty() {
        output.status("No agents found");
        if let Some(tag) = capability {
            output.status(&format!("No agent lists '{}' among its specialties", tag));
        }
        return Ok(());
    }

    output.success(&format!("Found {} agent(s):", agents.len()));
    println!();
    output.table_header(&["slug", "kind", "status", "tasks", "accuracy", "avg response", "safety"]);
    for agent in &agents {
        let tasks = agent.performance.tasks_completed.to_string();
        let accuracy = format!("{:.3}", agent.performance.accuracy);
        let response = format!("{:.2}s", agent.performance.average_response_secs);
        let safety = format!("{:.2}", agent.performance.patient_safety_score);
        output.table_row(&[
            &agent.slug.bright_cyan().to_string(),
            agent.kind.as_str(),
            &format_agent_status(&agent.status),
            &tasks,
            &accuracy,
            &response,
            &safety,
        ]);
    }

    for agent in &agents {
        output.section(&agent.name);
        output.kv("Specialties", &agent.specialties.join(", "));
        output.kv("Capabilities", &agent.capabilities.join(", "));
        output.kv("Model", &agent.model);
        output.kv("Version", &agent.metadata.version);
        if !agent.metadata.compliance_levels.is_empty() {
            output.kv("Compliance", &agent.metadata.compliance_levels.join(", "));
        }
    }

    Ok(())
}

pub struct RunArgs<'a> {
    pub kind: TaskKind,
    pub priority: TaskPriority,
    pub require: &'a [String],
    pub description: &'a str,
    pub deadline_secs: Option<u64>,
    pub context: Option<&'a str>,
}

/// Create one task, wait for it and print the outcome
pub async fn run(coordinator: &SwarmCoordinator, args: RunArgs<'_>) -> Result<()> {
    let output = Output::new();

    let mut request = TaskRequest::new(args.kind, args.description, args.priority)
        .require(args.require.iter().cloned());
    if let Some(context) = args.context {
        let context: serde_json::Value = serde_json::from_str(context).into_diagnostic()?;
        request = request.with_context(context);
    }
    if let Some(secs) = args.deadline_secs {
        request = request.with_deadline_in(Duration::from_secs(secs));
    }

    let task_id = coordinator.create_task(request).await?;
    output.status(&format!("Created task {}", task_id));
    let task = coordinator.await_task(&task_id).await?;

    print_task(coordinator, &output, &task);

    if !task.assigned_agents.is_empty() {
        output.section("Agent statistics");
        for agent_id in &task.assigned_agents {
            let report = coordinator.get_agent_performance(agent_id)?;
            output.kv(
                &report.agent.slug,
                &format!(
                    "{} tasks, accuracy {:.4}, avg response {:.3}s",
                    report.performance.tasks_completed,
                    report.performance.accuracy,
                    report.performance.average_response_secs
                ),
            );
        }
    }

    Ok(())
}

fn slug_of(coordinator: &SwarmCoordinator, agent_id: &swarm_core::AgentId) -> String {
    coordinator
        .get_agent(agent_id)
        .map(|agent: Agent| agent.slug)
        .unwrap_or_else(|_| agent_id.to_string())
}

fn print_task(coordinator: &SwarmCoordinator, output: &Output, task: &Task) {
    output.section(&format!("Task {}", task.id));
    output.kv("Kind", task.kind.as_str());
    output.kv("Priority", task.priority.as_str());
    output.kv("Status", &format_task_status(task.status));
    if let Some(cause) = task.failure {
        output.error(&format!("Failed: {}", cause.code()));
    }
    if let Some(error) = task.error() {
        eprintln!("{:?}", miette::Report::new(error));
    }
    if let Some(duration) = task.duration() {
        output.kv("Duration", &format_duration(duration));
    }

    if let Ok(Some(plan)) = coordinator.get_plan(&task.id) {
        output.section("Coordination plan");
        output.kv("Topology", &format!("{:?}", plan.topology));
        output.kv("Decision rule", &format!("{:?}", plan.decision_rule));
        for assignment in &plan.roles {
            output.list_item(&format!(
                "{} ({:?})",
                slug_of(coordinator, &assignment.agent_id),
                assignment.role
            ));
        }
    }

    if !task.participants.is_empty() {
        output.section("Participants");
        for participant in &task.participants {
            output.kv(
                &slug_of(coordinator, &participant.agent_id),
                &format!(
                    "{} in {}",
                    format_participant(&participant.status),
                    format_duration(participant.elapsed)
                ),
            );
        }
    }

    if let Some(consensus) = &task.consensus {
        output.section("Consensus");
        output.kv("Agreement", &format_score(Some(consensus.agreement)));
        output.kv("Confidence", &format_score(Some(consensus.confidence)));
        output.kv("Quality", &format_score(Some(consensus.quality_score)));
        output.kv(
            "Safety",
            &format!(
                "{} ({})",
                format_safety(consensus.safety),
                format_score(Some(consensus.safety_score))
            ),
        );
        output.kv(
            "Contributors",
            &format!("{}/{}", consensus.contributors.len(), consensus.participants),
        );
        println!();
        output.status("Recommendations");
        for item in &consensus.recommendations {
            output.list_item(item);
        }
        if !consensus.minority_opinions.is_empty() {
            output.status("Minority opinions");
            for item in &consensus.minority_opinions {
                output.list_item(&item.dimmed().to_string());
            }
        }
        if consensus.requires_escalation() {
            output.warning("Safety concern: review by a clinician is required");
        }
    }
}

pub fn metrics(coordinator: &SwarmCoordinator) -> Result<()> {
    let output = Output::new();
    let metrics = coordinator.metrics();

    output.section("Swarm metrics");
    output.kv("Agents", &metrics.total_agents.to_string());
    output.kv("Idle", &metrics.idle_agents.to_string());
    output.kv("Busy", &metrics.busy_agents.to_string());
    output.kv("Tasks", &metrics.total_tasks.to_string());
    output.kv("Active", &metrics.active_tasks.to_string());
    output.kv("Completed", &metrics.completed_tasks.to_string());
    output.kv("Escalated", &metrics.escalated_tasks.to_string());
    output.kv("Failed", &metrics.failed_tasks.to_string());
    output.kv(
        "Mean completion",
        &format_score(metrics.average_completion_secs),
    );
    output.kv("Mean accuracy", &format_score(metrics.average_accuracy));
    output.kv("Mean safety", &format_score(metrics.average_safety_score));

    Ok(())
}

/// Write the default configuration, built-in roster included
pub async fn init_config(path: &Path) -> Result<()> {
    let output = Output::new();
    if path.exists() {
        output.warning(&format!("{} already exists, overwriting", path.display()));
    }

    config::save_config(&SwarmConfig::with_default_roster(), path).await?;
    output.success(&format!(
        "Wrote configuration to {}",
        path.display().bright_green()
    ));

    Ok(())
}
