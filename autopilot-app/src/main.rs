use anyhow::{Context, Result};
use autopilot_app::{router, AutopilotService, Config, DEFAULT_CONFIG_PATH};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _};

#[derive(Parser)]
#[command(name = "autopilot")]
#[command(about = "Task automation backend: planner loop, tools, memory vault", long_about = None)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(long, short, env = "AUTOPILOT_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API (default)
    Serve,
    /// Run one task to completion and print the outcome
    Run {
        /// Natural-language task description
        task: String,
    },
    /// Write a default configuration file
    Init {
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Init { force } => handle_init(&cli.config, force),
        Commands::Run { task } => {
            let config = Config::resolve(&cli.config)?;
            let service = build_service(&config).await?;
            handle_run(&service, &task).await
        }
        Commands::Serve => {
            let config = Config::resolve(&cli.config)?;
            let service = build_service(&config).await?;
            serve(&config, service).await
        }
    }
}

async fn build_service(config: &Config) -> Result<AutopilotService> {
    let service = AutopilotService::from_config(config);
    service.initialize().await?;
    Ok(service)
}

async fn serve(config: &Config, service: AutopilotService) -> Result<()> {
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Autopilot listening on http://{}", addr);
    axum::serve(listener, router(Arc::new(service)).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    tracing::info!("Autopilot stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn handle_run(service: &AutopilotService, task: &str) -> Result<()> {
    let run = service.execute_complex_task(task).await?;
    println!("{}", serde_json::to_string_pretty(&run)?);
    if !run.outcome.is_completed() {
        anyhow::bail!("task {} did not complete", run.task_id);
    }
    Ok(())
}

fn handle_init(path: &std::path::Path, force: bool) -> Result<()> {
    if Config::exists(path) && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    Config::default().save(path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}
