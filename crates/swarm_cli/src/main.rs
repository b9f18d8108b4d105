mod commands;
mod output;
mod playbook;

use clap::{Parser, Subcommand};
use miette::Result;
use std::path::PathBuf;
use std::sync::Arc;
use swarm_core::{
    SwarmCoordinator,
    config::{self},
    task::{TaskKind, TaskPriority},
};
use tracing::info;

use crate::playbook::PlaybookCapability;

#[derive(Parser)]
#[command(name = "swarm-cli")]
#[command(about = "Clinical agent swarm coordinator")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered agents
    Agents {
        /// Only agents with this specialty
        #[arg(long)]
        capability: Option<String>,
    },
    /// Run one task to completion
    Run {
        /// diagnosis, treatment-planning, patient-monitoring, research-analysis or emergency-response
        #[arg(long)]
        kind: TaskKind,

        /// low, medium, high or critical
        #[arg(long, default_value = "medium")]
        priority: TaskPriority,

        /// Required capability tag (repeatable)
        #[arg(long, required = true)]
        require: Vec<String>,

        #[arg(long)]
        description: String,

        /// Advisory deadline in seconds
        #[arg(long)]
        deadline_secs: Option<u64>,

        /// Context payload as JSON
        #[arg(long)]
        context: Option<String>,
    },
    /// Show swarm metrics
    Metrics,
    /// Write the default configuration
    InitConfig {
        #[arg(default_value = "swarm.toml")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .rgb_colors(miette::RgbColors::Preferred)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))?;
    miette::set_panic_hook();
    let cli = Cli::parse();

    // Initialize tracing
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.debug {
            EnvFilter::new("swarm_core=debug,swarm_cli=debug,warn")
        } else {
            // Show info level for swarm crates, warn for everything else
            EnvFilter::new("swarm_core=info,swarm_cli=info,warn")
        }
    });

    fmt()
        .with_env_filter(filter)
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_timer(tracing_subscriber::fmt::time::LocalTime::rfc_3339())
        .compact()
        .init();

    if let Commands::InitConfig { path } = &cli.command {
        return commands::init_config(path).await;
    }

    let config = if let Some(config_path) = &cli.config {
        info!("Loading config from: {:?}", config_path);
        config::load_config(config_path).await?
    } else {
        info!("Loading config from standard locations");
        config::load_config_from_standard_locations().await?
    };

    let coordinator = SwarmCoordinator::from_config(&config, Arc::new(PlaybookCapability))?;
    tracing::debug!("Coordinator ready: {:?}", coordinator);

    match &cli.command {
        Commands::Agents { capability } => commands::agents(&coordinator, capability.as_deref())?,
        Commands::Run {
            kind,
            priority,
            require,
            description,
            deadline_secs,
            context,
        } => {
            commands::run(
                &coordinator,
                commands::RunArgs {
                    kind: *kind,
                    priority: *priority,
                    require,
                    description,
                    deadline_secs: *deadline_secs,
                    context: context.as_deref(),
                },
            )
            .await?
        }
        Commands::Metrics => commands::metrics(&coordinator)?,
        Commands::InitConfig { .. } => {}
    }

    Ok(())
}
