use owo_colors::OwoColorize;
use swarm_core::{
    agent::AgentStatus,
    consensus::SafetyAssessment,
    task::{ParticipantStatus, TaskStatus},
};

/// Standard output formatting for the CLI
pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    /// Print a system/status message (indented)
    pub fn status(&self, message: &str) {
        println!("  {}", message.dimmed());
    }

    /// Print a success message (indented)
    pub fn success(&self, message: &str) {
        println!("  {} {}", "✓".bright_green(), message);
    }

    /// Print an error message (indented)
    pub fn error(&self, message: &str) {
        println!("  {} {}", "✗".bright_red(), message);
    }

    /// Print a warning message (indented)
    pub fn warning(&self, message: &str) {
        println!("  {} {}", "⚠".yellow(), message);
    }

    /// Print a section header
    pub fn section(&self, title: &str) {
        println!();
        println!("{}", title.bright_cyan().bold());
        println!("{}", "─".repeat(40).dimmed());
    }

    /// Print a list item (already indented)
    pub fn list_item(&self, item: &str) {
        println!("    • {}", item);
    }

    /// Print a key-value pair (indented)
    pub fn kv(&self, key: &str, value: &str) {
        println!("  {} {}", format!("{}:", key).dimmed(), value);
    }

    /// Print a table-like header
    pub fn table_header(&self, columns: &[&str]) {
        let header = columns.join(" | ");
        println!("  {}", header.bright_white().bold());
        println!("  {}", "─".repeat(header.chars().count()).dimmed());
    }

    /// Print a table row
    pub fn table_row(&self, cells: &[&str]) {
        println!("  {}", cells.join(" | "));
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

pub fn format_agent_status(status: &AgentStatus) -> String {
    match status {
        AgentStatus::Idle => "idle".bright_green().to_string(),
        AgentStatus::Busy { .. } => "busy".bright_yellow().to_string(),
        AgentStatus::Offline => "offline".dimmed().to_string(),
        AgentStatus::Errored => "errored".bright_red().to_string(),
    }
}

pub fn format_task_status(status: TaskStatus) -> String {
    match status {
        TaskStatus::Completed => status.to_string().bright_green().to_string(),
        TaskStatus::Escalated => status.to_string().bright_yellow().to_string(),
        TaskStatus::Failed => status.to_string().bright_red().to_string(),
        TaskStatus::Pending | TaskStatus::InProgress => status.to_string().cyan().to_string(),
    }
}

pub fn format_safety(safety: SafetyAssessment) -> String {
    match safety {
        SafetyAssessment::High => safety.to_string().bright_green().to_string(),
        SafetyAssessment::Moderate => safety.to_string().green().to_string(),
        SafetyAssessment::Low => safety.to_string().yellow().to_string(),
        SafetyAssessment::Concern => safety.to_string().bright_red().bold().to_string(),
    }
}

pub fn format_participant(status: &ParticipantStatus) -> String {
    match status {
        ParticipantStatus::Succeeded => "answered".bright_green().to_string(),
        ParticipantStatus::Errored { reason } => format!("error: {}", reason).red().to_string(),
        ParticipantStatus::TimedOut => "timed out".yellow().to_string(),
        ParticipantStatus::Panicked => "panicked".bright_red().to_string(),
    }
}

/// Fixed-precision score, or a dash when absent
pub fn format_score(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.3}", v))
        .unwrap_or_else(|| "-".to_string())
}
