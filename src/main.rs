//! Scribeflow - capture processing and publication core
//!
//! CLI for exercising the core against a live collaborator backend.

use anyhow::Result;
use clap::{Parser, Subcommand};
use scribeflow::backend::{Backend, HttpBackend};
use scribeflow::controller::{DescribeOutcome, SessionController};
use scribeflow::model::{ArtifactId, SessionId};
use scribeflow::publish::PublishDestinations;
use scribeflow::ScribeflowConfig;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "scribeflow")]
#[command(version)]
#[command(about = "Capture processing and publication client")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "SCRIBEFLOW_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show derived status and progress for a session
    Status {
        /// Session id
        session: String,
    },

    /// Describe (process and transcribe) artifacts of a session
    Describe {
        /// Session id
        session: String,

        /// Artifact ids to describe; all artifacts when omitted
        #[arg(short, long)]
        artifact: Vec<String>,
    },

    /// Publish a session to the selected destinations
    Publish {
        /// Session id
        session: String,

        /// Publish to the chatbot vector index
        #[arg(long)]
        chatbot: bool,

        /// Publish to the blog pipeline
        #[arg(long)]
        blog: bool,

        /// Limit the publish to these artifact ids
        #[arg(short, long)]
        artifact: Vec<String>,
    },

    /// Inspect one artifact: derived status plus the backend's publish hint
    Artifact {
        /// Session id
        session: String,

        /// Artifact id
        artifact: String,
    },

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("scribeflow={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ScribeflowConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Status { session } => {
            let controller = build_controller(&config)?;
            controller.load(&SessionId::new(session)).await?;
            print_status(&controller).await;
        }
        Commands::Describe { session, artifact } => {
            let controller = build_controller(&config)?;
            controller.load(&SessionId::new(session)).await?;

            let ids: Vec<ArtifactId> = if artifact.is_empty() {
                let view = controller.view().snapshot().await;
                view.map(|v| v.session.artifacts.iter().map(|a| a.id.clone()).collect())
                    .unwrap_or_default()
            } else {
                artifact.into_iter().map(ArtifactId::new).collect()
            };

            match controller.describe_selection(&ids).await? {
                DescribeOutcome::Completed(transcript) => {
                    println!("{}", transcript);
                }
                DescribeOutcome::Superseded => {
                    println!("Describe was superseded by a newer request");
                }
            }
            print_status(&controller).await;
        }
        Commands::Publish {
            session,
            chatbot,
            blog,
            artifact,
        } => {
            let controller = build_controller(&config)?;
            controller.load(&SessionId::new(session)).await?;

            let selected = if artifact.is_empty() {
                None
            } else {
                Some(artifact.into_iter().map(ArtifactId::new).collect())
            };
            let outcome = controller
                .publish(PublishDestinations { chatbot, blog }, selected)
                .await?;

            if outcome.is_partial() {
                println!(
                    "Published; chatbot indexing failed for {} artifact(s):",
                    outcome.vectorize_failures.len()
                );
                for id in &outcome.vectorize_failures {
                    println!("  {}", id);
                }
            } else {
                println!("Published");
            }
            print_status(&controller).await;
        }
        Commands::Artifact { session, artifact } => {
            let backend = Arc::new(HttpBackend::new(&config.backend)?);
            let controller = SessionController::new(backend.clone(), &config);
            controller.load(&SessionId::new(session)).await?;

            let artifact_id = ArtifactId::new(artifact);
            let view = controller.view().snapshot().await;
            if let Some(view) = view {
                println!("{}  {:?}", artifact_id, view.status_of(&artifact_id));
            }
            // The hint is informational only; the badge above is authoritative
            let hint = backend.published_status(&artifact_id).await?;
            println!(
                "  backend hint: published={} vectorized={}",
                hint.is_published, hint.is_vectorized
            );
        }
        Commands::Config { default } => {
            let shown = if default {
                ScribeflowConfig::default()
            } else {
                config
            };
            println!("{}", toml::to_string_pretty(&shown)?);
        }
    }

    Ok(())
}

fn build_controller(config: &ScribeflowConfig) -> Result<SessionController> {
    let backend = Arc::new(HttpBackend::new(&config.backend)?);
    Ok(SessionController::new(backend, config))
}

async fn print_status(controller: &SessionController) {
    let Some(view) = controller.view().snapshot().await else {
        return;
    };
    println!("Session {} ({})", view.session.id, String::from(view.session.status.clone()));
    println!(
        "  draft {}%  processed {}%  published {}%",
        view.progress.draft, view.progress.processed, view.progress.published
    );
    for artifact in &view.session.artifacts {
        println!(
            "  {}  {:?}  {:?}",
            artifact.id,
            artifact.capture_type,
            view.status_of(&artifact.id)
        );
    }
}
