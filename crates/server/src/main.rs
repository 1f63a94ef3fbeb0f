//! Deckhand Server
//!
//! Runs the slide pipeline from the command line, serves it as an A2A
//! agent over HTTP, or serves a static capability directory.

mod api;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use deckhand_core::config::CoordinatorConfig;
use deckhand_core::discovery::StaticDirectory;
use deckhand_core::state::GenerationRequest;
use deckhand_core::swarm::{Coordinator, ProgressEvent};

#[derive(Parser, Clone)]
#[command(author, version, about = "Deckhand - topic in, slide deck out")]
struct Args {
    /// Coordinator config file (JSON). Missing file means defaults.
    #[arg(long, global = true, default_value = "deckhand.json")]
    config: PathBuf,
    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand, Clone)]
enum CliCommand {
    /// Serve the coordinator as an A2A agent (default)
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },
    /// Generate one presentation and print progress (no server)
    Run {
        /// Presentation topic
        topic: String,
        /// Number of slides to ask the outline stage for
        #[arg(short, long, default_value = "5")]
        slides: u32,
        /// Presentation style
        #[arg(long, default_value = "professional")]
        style: String,
    },
    /// Serve a static capability directory from a registry file
    Directory {
        /// JSON array of provider cards
        #[arg(short, long, default_value = "agents.json")]
        registry: PathBuf,
        /// Port to listen on
        #[arg(short, long, default_value = "10100")]
        port: u16,
    },
}

fn load_config(path: &Path) -> anyhow::Result<CoordinatorConfig> {
    CoordinatorConfig::load(path)?
        .apply_env()
        .context("Invalid DECKHAND_* environment settings")
}

async fn run_pipeline(config: CoordinatorConfig, request: GenerationRequest) -> anyhow::Result<()> {
    let coordinator = Coordinator::from_config(config);
    let (tx, mut rx) = mpsc::unbounded_channel::<ProgressEvent>();

    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match (event.slide_index, event.slide_total) {
                (Some(i), Some(n)) => println!("[{}/{}] {}", i, n, event.message),
                _ => println!("{}", event.message),
            }
        }
    });

    let report = coordinator.run_with_channel(request, tx).await;
    let _ = printer.await;

    if !report.degraded_slides.is_empty() {
        println!("Slides with degraded output: {:?}", report.degraded_slides);
    }
    if report.succeeded() {
        return Ok(());
    }
    anyhow::bail!(report
        .error
        .unwrap_or_else(|| "presentation generation failed".to_string()))
}

async fn serve_coordinator(config: CoordinatorConfig, port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let state = api::AppState {
        coordinator: Arc::new(Coordinator::from_config(config)),
        public_url: format!("http://{}", addr),
    };
    let app = api::router(state);

    tracing::info!("Deckhand coordinator running at http://{}", addr);
    tracing::info!("   Agent card: /.well-known/agent-card.json");
    tracing::info!("   Generate:   /api/v1/generate (POST, SSE)");
    tracing::info!("   OpenAPI:    /api/v1/openapi.json");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn serve_directory(registry: PathBuf, port: u16) -> anyhow::Result<()> {
    let directory = StaticDirectory::load(&registry).await?;
    tracing::info!(
        "Loaded {} provider cards from {}",
        directory.providers().len(),
        registry.display()
    );

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let app = api::directory::router(Arc::new(directory));
    tracing::info!("Capability directory running at http://{}/find_agent", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Missing .env is fine
    let _ = dotenvy::dotenv();

    // Default log level: INFO. Override with RUST_LOG=deckhand_core=debug etc.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    match args.command {
        Some(CliCommand::Run {
            topic,
            slides,
            style,
        }) => {
            let config = load_config(&args.config)?;
            let request = GenerationRequest::new(topic)
                .with_num_slides(slides)
                .with_style(style);
            run_pipeline(config, request).await
        }
        Some(CliCommand::Directory { registry, port }) => serve_directory(registry, port).await,
        Some(CliCommand::Serve { port }) => serve_coordinator(load_config(&args.config)?, port).await,
        None => serve_coordinator(load_config(&args.config)?, 8080).await,
    }
}
