use anyhow::Context;
use clap::{Parser, Subcommand};
use futures_util::future::join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pressroom::error::RenderError;
use pressroom::models::{AppConfig, RenderResult};
use pressroom::services::{ArtifactStore, FallbackRenderer, RenderCoordinator};

#[derive(Parser)]
#[command(name = "pressroom")]
#[command(about = "Pressroom - pooled HTML-to-PDF rendering with a dependency-free fallback")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render documents to PDF through the worker pool
    Render {
        /// HTML or plain text files; the file stem is used as job id
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Configuration file (defaults to $CONFIG_FILE)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory for the generated PDFs
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Number of rendering workers
        #[arg(long)]
        capacity: Option<usize>,

        /// Per-attempt timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Print one JSON object per job instead of text
        #[arg(long)]
        json: bool,
    },
    /// Render a document with the degraded renderer only
    Fallback {
        /// HTML or plain text file
        file: PathBuf,

        /// Job id (defaults to the file stem)
        #[arg(long)]
        job_id: Option<String>,

        /// Configuration file (defaults to $CONFIG_FILE)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory for the generated PDF
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Render {
            files,
            config,
            output_dir,
            capacity,
            timeout_ms,
            json,
        }) => {
            init_tracing();
            let mut config = load_config(config, output_dir);
            if let Some(capacity) = capacity {
                config.pool.capacity = capacity;
            }
            if let Some(timeout_ms) = timeout_ms {
                config.pool.task_timeout_ms = timeout_ms;
            }
            run_render_command(config.normalized(), &files, json).await
        }
        Some(Commands::Fallback {
            file,
            job_id,
            config,
            output_dir,
        }) => {
            init_tracing();
            let config = load_config(config, output_dir);
            run_fallback_command(&config, &file, job_id)
        }
        None => {
            run_status_command();
            Ok(())
        }
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pressroom=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(config: Option<PathBuf>, output_dir: Option<PathBuf>) -> AppConfig {
    let path = config.or_else(|| std::env::var_os("CONFIG_FILE").map(PathBuf::from));
    let mut config = AppConfig::load(path.as_deref());
    if let Some(dir) = output_dir {
        config.output.dir = Some(dir);
    }
    config
}

fn job_id_for(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "job".to_string())
}

/// Submit every file concurrently and report each result
async fn run_render_command(config: AppConfig, files: &[PathBuf], json: bool) -> anyhow::Result<()> {
    let coordinator = Arc::new(RenderCoordinator::new(&config));
    coordinator.register_shutdown_hooks();

    tracing::info!(
        files = files.len(),
        capacity = config.pool.capacity,
        output = %config.output.resolved_dir().display(),
        "Rendering"
    );

    let jobs = files.iter().map(|path| {
        let coordinator = coordinator.clone();
        async move {
            let job_id = job_id_for(path);
            let outcome = match tokio::fs::read(path).await {
                Ok(bytes) => coordinator
                    .submit(&job_id, &String::from_utf8_lossy(&bytes))
                    .await
                    .map_err(anyhow::Error::from),
                Err(e) => Err(anyhow::Error::from(e).context(format!("reading {}", path.display()))),
            };
            (path, job_id, outcome)
        }
    });
    let outcomes = join_all(jobs).await;

    coordinator.shutdown().await;

    let mut failed = 0;
    for (path, job_id, outcome) in &outcomes {
        if outcome.is_err() {
            failed += 1;
        }
        if json {
            println!("{}", json_report(path, job_id, outcome));
        } else {
            println!("{}", text_report(path, outcome));
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} job(s) failed", outcomes.len());
    }
    Ok(())
}

fn text_report(path: &Path, outcome: &anyhow::Result<RenderResult>) -> String {
    match outcome {
        Ok(result) => {
            let artifact = result.artifact();
            let mut line = format!(
                "{} -> {} ({}, {} bytes)",
                path.display(),
                artifact.path.display(),
                artifact.produced_by,
                artifact.size_bytes
            );
            if let Some(reason) = result.fallback_reason() {
                line.push_str(&format!("\n    reason: {reason}"));
            }
            line
        }
        Err(e) => format!("{} -> FAILED: {e:#}", path.display()),
    }
}

fn json_report(path: &Path, job_id: &str, outcome: &anyhow::Result<RenderResult>) -> serde_json::Value {
    match outcome {
        Ok(result) => serde_json::json!({
            "file": path.display().to_string(),
            "job_id": job_id,
            "result": result,
        }),
        Err(e) => serde_json::json!({
            "file": path.display().to_string(),
            "job_id": job_id,
            "error": format!("{e:#}"),
            "shutting_down": matches!(e.downcast_ref::<RenderError>(), Some(RenderError::ShuttingDown)),
        }),
    }
}

/// Render one file with the degraded renderer (no pool needed)
fn run_fallback_command(config: &AppConfig, file: &Path, job_id: Option<String>) -> anyhow::Result<()> {
    let bytes = std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    let job_id = job_id.unwrap_or_else(|| job_id_for(file));

    let renderer = FallbackRenderer::new(
        ArtifactStore::new(config.output.resolved_dir()),
        config.page.page_spec(),
    );
    let artifact = renderer.render_degraded(&String::from_utf8_lossy(&bytes), &job_id)?;

    println!(
        "Rendered {} ({} bytes)",
        artifact.path.display(),
        artifact.size_bytes
    );
    Ok(())
}

/// Display version, environment and effective configuration
fn run_status_command() {
    const VERSION: &str = env!("CARGO_PKG_VERSION");

    let config_file = std::env::var("CONFIG_FILE").ok();
    let output_dir = std::env::var("OUTPUT_DIR").ok();
    let rust_log = std::env::var("RUST_LOG").ok();

    println!("Pressroom v{VERSION}");
    println!("Pooled HTML-to-PDF rendering with a dependency-free fallback\n");

    println!("Environment Variables:");
    println!(
        "  CONFIG_FILE = {}",
        config_file.as_deref().unwrap_or("(not set)")
    );
    println!(
        "  OUTPUT_DIR  = {}",
        output_dir.as_deref().unwrap_or("(not set)")
    );
    println!(
        "  RUST_LOG    = {}",
        rust_log.as_deref().unwrap_or("pressroom=info (default)")
    );

    let config = AppConfig::load(config_file.as_deref().map(Path::new));
    println!("\nEffective Configuration:");
    match serde_yaml::to_string(&config) {
        Ok(yaml) => {
            for line in yaml.lines() {
                println!("  {line}");
            }
        }
        Err(e) => println!("  (unavailable: {e})"),
    }
    println!(
        "  # artifacts are written to {}",
        config.output.resolved_dir().display()
    );

    println!("\nCommands:");
    println!("  pressroom render     Render files to PDF through the worker pool");
    println!("  pressroom fallback   Render a file with the degraded renderer only");
    println!("\nRun 'pressroom --help' for more details.");
}
