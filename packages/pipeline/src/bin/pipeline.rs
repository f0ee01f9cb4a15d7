//! Pipeline CLI
//!
//! One subcommand per stage plus `run` for the whole pipeline. Stage results
//! are printed as JSON on stdout; logs go to stderr.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use pipeline_core::kernel::PipelineDeps;
use pipeline_core::{Catalogs, Config, Pipeline};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "pipeline")]
#[command(about = "Turn new YouTube videos into researched blog articles")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List recent uploads and create candidates
    Collect,

    /// Search and summarize sources for collected candidates
    Research,

    /// Draft and render one article
    Generate,

    /// Publish the last generated article and write the run status
    Publish,

    /// Run every stage in order
    Run,

    /// Show candidate counts and the last run status
    Status,

    /// Report HTML files with no post record
    Validate,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusView {
    candidates: std::collections::BTreeMap<&'static str, usize>,
    last_run: Option<pipeline_core::snapshot::PipelineStatus>,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to encode output")?
    );
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pipeline_core=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true),
        )
        .init();

    let cli = Cli::parse();

    let config = Config::from_env().context("Failed to load configuration")?;
    let catalogs = Catalogs::load(&config.settings).context("Failed to load catalog files")?;
    let deps = PipelineDeps::from_config(&config).context("Failed to build service clients")?;
    let pipeline = Pipeline::new(config.settings, catalogs, deps);
    let now = Utc::now();

    match cli.command {
        Commands::Collect => print_json(&pipeline.collect(now).await?)?,
        Commands::Research => print_json(&pipeline.research(now).await?)?,
        Commands::Generate => print_json(&pipeline.generate(now).await?.summary())?,
        Commands::Publish => print_json(&pipeline.publish(now)?)?,
        Commands::Run => {
            let status = pipeline.run(now).await?;
            tracing::info!(status = ?status.status, "Done");
            print_json(&status)?;
        }
        Commands::Status => print_json(&StatusView {
            candidates: pipeline.status_counts(),
            last_run: pipeline.last_status()?,
        })?,
        Commands::Validate => print_json(&pipeline.validate()?)?,
    }

    Ok(())
}
