//! refactord: HTTP front end for the safe refactoring pipeline
//!
//! `POST /api/refactor` accepts `{"code": "..."}` and answers with the
//! verified rewrite (200), a rejection (400) or a controlled failure (500).

mod server;

use std::path::PathBuf;

use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};

use refactor_core::RefactorConfig;

#[derive(Parser)]
#[command(name = "refactord")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Serve the safe refactoring pipeline over HTTP", long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(long, env = "REFACTORD_BIND", default_value = "127.0.0.1:8000")]
    bind: String,

    /// Path to a TOML config file
    #[arg(short, long, env = "REFACTOR_CONFIG")]
    config: Option<PathBuf>,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[actix_web::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    refactor_core::init_tracing(args.json, level);

    let config =
        RefactorConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    let orchestrator = web::Data::new(
        config
            .build_orchestrator()
            .context("Failed to construct refactoring pipeline")?,
    );

    info!(
        bind = %args.bind,
        model = %config.transformer.model,
        max_retries = config.max_retries,
        "refactord listening"
    );

    HttpServer::new(move || {
        App::new()
            .app_data(orchestrator.clone())
            .configure(server::configure)
    })
    .bind(&args.bind)
    .with_context(|| format!("Failed to bind {}", args.bind))?
    .run()
    .await
    .context("HTTP server terminated")?;

    Ok(())
}
