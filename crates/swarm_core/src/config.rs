//! TOML configuration for the coordinator and its agent roster

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{
    CoreError, Result,
    agent::{Agent, AgentKind, AgentMetadata, PerformanceRecord},
    error::ConfigError,
    roster::default_roster,
};

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SwarmConfig {
    #[serde(default)]
    pub coordinator: CoordinatorConfig,

    /// Agents to register; empty means the built-in roster
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub agents: Vec<AgentConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Advisory deadline applied to tasks created without one
    #[serde(
        rename = "default_deadline_secs",
        default,
        with = "crate::utils::duration_secs",
        skip_serializing_if = "Option::is_none"
    )]
    pub default_deadline: Option<Duration>,

    /// Page size of `task_history` when no limit is given
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// End tasks whose consensus safety is `concern` as `escalated`
    #[serde(default)]
    pub escalate_on_safety_concern: bool,
}

fn default_history_limit() -> usize {
    50
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            default_deadline: None,
            history_limit: default_history_limit(),
            escalate_on_safety_concern: false,
        }
    }
}

/// One agent in the roster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub slug: String,
    pub name: String,
    pub kind: AgentKind,

    #[serde(default)]
    pub specialties: Vec<String>,

    #[serde(default)]
    pub capabilities: Vec<String>,

    #[serde(default)]
    pub model: String,

    /// Starting statistics; defaults apply when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance: Option<PerformanceRecord>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<AgentMetadata>,
}

impl AgentConfig {
    pub fn new(slug: impl Into<String>, name: impl Into<String>, kind: AgentKind) -> Self {
        Self {
            slug: slug.into(),
            name: name.into(),
            kind,
            specialties: Vec::new(),
            capabilities: Vec::new(),
            model: String::new(),
            performance: None,
            metadata: None,
        }
    }

    /// Build a fresh, idle agent with a new id
    pub fn to_agent(&self) -> Agent {
        Agent::new(self.slug.clone(), self.name.clone(), self.kind)
            .with_specialties(self.specialties.iter().cloned())
            .with_capabilities(self.capabilities.iter().cloned())
            .with_model(self.model.clone())
            .with_performance(self.performance.unwrap_or_default())
            .with_metadata(self.metadata.clone().unwrap_or_default())
    }
}

impl SwarmConfig {
    /// Configuration with the built-in roster written out explicitly
    pub fn with_default_roster() -> Self {
        Self {
            coordinator: CoordinatorConfig::default(),
            agents: default_roster(),
        }
    }

    /// The roster to register: the configured agents, or the built-in ones
    pub fn roster(&self) -> Vec<AgentConfig> {
        if self.agents.is_empty() {
            default_roster()
        } else {
            self.agents.clone()
        }
    }

    pub fn validate(&self, config_path: &str) -> Result<()> {
        let invalid = |field: &str, expected: &str, message: String| CoreError::ConfigurationError {
            config_path: config_path.to_string(),
            field: field.to_string(),
            expected: expected.to_string(),
            cause: ConfigError::Invalid(message),
        };

        if self.coordinator.history_limit == 0 {
            return Err(invalid(
                "coordinator.history_limit",
                "a positive integer",
                "history_limit is 0".to_string(),
            ));
        }
        if self.coordinator.default_deadline == Some(Duration::ZERO) {
            return Err(invalid(
                "coordinator.default_deadline_secs",
                "a positive number of seconds",
                "default_deadline_secs is 0".to_string(),
            ));
        }

        let mut slugs = HashSet::new();
        for agent in &self.agents {
            if agent.slug.trim().is_empty() {
                return Err(invalid(
                    "agents.slug",
                    "a non-empty slug",
                    format!("agent '{}' has an empty slug", agent.name),
                ));
            }
            if !slugs.insert(agent.slug.as_str()) {
                return Err(invalid(
                    "agents.slug",
                    "unique agent slugs",
                    format!("duplicate agent slug '{}'", agent.slug),
                ));
            }
            if let Some(performance) = &agent.performance {
                let unit = [
                    ("accuracy", performance.accuracy),
                    ("patient_safety_score", performance.patient_safety_score),
                ];
                for (field, value) in unit {
                    if !(0.0..=1.0).contains(&value) {
                        return Err(invalid(
                            &format!("agents.performance.{}", field),
                            "a number in [0, 1]",
                            format!("agent '{}' has {} = {}", agent.slug, field, value),
                        ));
                    }
                }
                let secs = performance.average_response_secs;
                if !secs.is_finite() || secs < 0.0 {
                    return Err(invalid(
                        "agents.performance.average_response_secs",
                        "a finite, non-negative number of seconds",
                        format!("agent '{}' has average_response_secs = {}", agent.slug, secs),
                    ));
                }
            }
            if agent.specialties.is_empty() {
                tracing::warn!(
                    "Agent '{}' has no specialties and will never be selected",
                    agent.slug
                );
            }
        }

        Ok(())
    }
}

/// Load configuration from a TOML file
pub async fn load_config(path: &Path) -> Result<SwarmConfig> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        CoreError::ConfigurationError {
            config_path: path.display().to_string(),
            field: "file".to_string(),
            expected: "readable TOML file".to_string(),
            cause: ConfigError::Io(e.to_string()),
        }
    })?;

    let config: SwarmConfig =
        toml::from_str(&content).map_err(|e| CoreError::ConfigurationError {
            config_path: path.display().to_string(),
            field: "content".to_string(),
            expected: "valid TOML configuration".to_string(),
            cause: ConfigError::TomlParse(e.to_string()),
        })?;

    config.validate(&path.display().to_string())?;
    tracing::debug!(
        "Loaded configuration from {} ({} agents)",
        path.display(),
        config.agents.len()
    );

    Ok(config)
}

/// Save configuration to a TOML file
pub async fn save_config(config: &SwarmConfig, path: &Path) -> Result<()> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                CoreError::ConfigurationError {
                    config_path: parent.display().to_string(),
                    field: "directory".to_string(),
                    expected: "writable directory".to_string(),
                    cause: ConfigError::Io(e.to_string()),
                }
            })?;
        }
    }

    let content = toml::to_string_pretty(config).map_err(|e| CoreError::ConfigurationError {
        config_path: path.display().to_string(),
        field: "serialization".to_string(),
        expected: "serializable config structure".to_string(),
        cause: ConfigError::TomlSerialize(e.to_string()),
    })?;

    tokio::fs::write(path, content)
        .await
        .map_err(|e| CoreError::ConfigurationError {
            config_path: path.display().to_string(),
            field: "file".to_string(),
            expected: "writable file location".to_string(),
            cause: ConfigError::Io(e.to_string()),
        })?;

    Ok(())
}

/// Standard config file locations
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // Project-specific config
    paths.push(PathBuf::from("swarm.toml"));

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("swarm").join("config.toml"));
    }

    if let Some(home_dir) = dirs::home_dir() {
        paths.push(home_dir.join(".swarm").join("config.toml"));
    }

    paths
}

/// Load configuration from the first standard location that exists
pub async fn load_config_from_standard_locations() -> Result<SwarmConfig> {
    for path in config_paths() {
        if path.exists() {
            return load_config(&path).await;
        }
    }

    // No config found, return default
    Ok(SwarmConfig::default())
}
