//! Safe Refactor CLI
//!
//! ## Commands
//!
//! - `run`: generate a regression suite, refactor and heal a Python file
//! - `check`: run a test file against a code file in a disposable sandbox
//! - `templates`: print the active instruction templates
//! - `report`: show a persisted job report after verifying its digest

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};

use refactor_core::{
    read_job_artifact, write_job_artifact, JobOutcome, LegacyCode, PytestExecutor, RefactorConfig,
    TemplateRole, TestArtifact, TestExecutor,
};

#[derive(Parser)]
#[command(name = "refactor")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Refactor legacy code behind a generated regression suite", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Path to a TOML config file
    #[arg(short, long, global = true, env = "REFACTOR_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Refactor a file (stdin when omitted) and print the verified result
    Run {
        /// Legacy source file
        input: Option<PathBuf>,

        /// Write the refactored code here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Override the heal retry budget
        #[arg(long)]
        max_retries: Option<u32>,

        /// Persist the job report under this directory
        #[arg(long)]
        artifacts_dir: Option<PathBuf>,

        /// Print the full job report as JSON instead of the code
        #[arg(long)]
        report: bool,
    },

    /// Run a test file against a code file
    Check {
        /// Code under test
        #[arg(long)]
        code: PathBuf,

        /// Test body (the import preamble is added automatically)
        #[arg(long)]
        tests: PathBuf,
    },

    /// Print the active instruction templates
    Templates,

    /// Show a persisted job report
    Report {
        /// Job ID
        job: String,

        /// Root directory containing job artifacts
        #[arg(long, default_value = ".refactor/jobs")]
        artifacts_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    refactor_core::init_tracing(cli.json, level);

    let config =
        RefactorConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Run {
            input,
            output,
            max_retries,
            artifacts_dir,
            report,
        } => {
            cmd_run(
                config,
                input.as_deref(),
                output.as_deref(),
                max_retries,
                artifacts_dir.as_deref(),
                report,
            )
            .await
        }
        Commands::Check { code, tests } => cmd_check(&config, &code, &tests).await,
        Commands::Templates => cmd_templates(&config),
        Commands::Report { job, artifacts_dir } => cmd_report(&job, &artifacts_dir),
    }
}

fn read_source(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read legacy source: {:?}", path)),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read legacy source from stdin")?;
            Ok(buf)
        }
    }
}

async fn cmd_run(
    mut config: RefactorConfig,
    input: Option<&Path>,
    output: Option<&Path>,
    max_retries: Option<u32>,
    artifacts_dir: Option<&Path>,
    print_report: bool,
) -> Result<()> {
    if let Some(n) = max_retries {
        config.max_retries = n;
        config.validate().context("Invalid --max-retries")?;
    }

    let source = read_source(input)?;
    if source.trim().is_empty() {
        anyhow::bail!("No code provided");
    }

    let orchestrator = config
        .build_orchestrator()
        .context("Failed to construct refactoring pipeline")?;
    let report = orchestrator
        .run_job(LegacyCode::new(source))
        .await
        .context("Refactor job failed")?;

    if let Some(dir) = artifacts_dir {
        let path = write_job_artifact(&report, dir)
            .with_context(|| format!("Failed to write job artifact under {:?}", dir))?;
        info!(path = %path.display(), "job report written");
    }

    if print_report {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    match &report.outcome {
        JobOutcome::Success { final_code } => {
            if let Some(path) = output {
                std::fs::write(path, final_code.as_str())
                    .with_context(|| format!("Failed to write refactored code to {:?}", path))?;
                eprintln!("Refactored code written to {:?}", path);
            } else if !print_report {
                println!("{}", final_code);
            }
            Ok(())
        }
        JobOutcome::Failed {
            reason,
            diagnostics,
        } => {
            eprintln!("Could not safely refactor code: {}", reason);
            if !diagnostics.is_empty() {
                eprintln!("\nLast test output:\n{}", diagnostics);
            }
            anyhow::bail!("{}", reason)
        }
    }
}

async fn cmd_check(config: &RefactorConfig, code: &Path, tests: &Path) -> Result<()> {
    let code_text = std::fs::read_to_string(code)
        .with_context(|| format!("Failed to read code file: {:?}", code))?;
    let test_text = std::fs::read_to_string(tests)
        .with_context(|| format!("Failed to read test file: {:?}", tests))?;

    let executor = PytestExecutor::new(config.executor.clone());
    let result = executor
        .run(&code_text, &TestArtifact::new(test_text))
        .await
        .context("Test execution failed")?;

    println!("{}", result.diagnostics);
    if result.passed {
        println!("PASSED");
        Ok(())
    } else {
        for node in result.failing_tests() {
            eprintln!("  - {}", node);
        }
        anyhow::bail!("tests failed")
    }
}

fn cmd_templates(config: &RefactorConfig) -> Result<()> {
    let templates = config.templates();
    for role in [TemplateRole::GenerateTests, TemplateRole::Refactor, TemplateRole::Fix] {
        println!("=== {} ({}) ===", role, role.fields().join(", "));
        println!("{}", templates.get(role).text());
    }
    Ok(())
}

fn cmd_report(job: &str, artifacts_dir: &Path) -> Result<()> {
    let report = read_job_artifact(job, artifacts_dir)
        .with_context(|| format!("Failed to read job report {} from {:?}", job, artifacts_dir))?;

    println!("job       {}", report.job_id);
    println!("started   {}", report.started_at);
    println!("finished  {} ({} ms)", report.finished_at, report.duration_ms());
    println!("attempts  {}/{}", report.attempts_used, report.max_retries);
    match &report.outcome {
        JobOutcome::Success { .. } => println!("outcome   success"),
        JobOutcome::Failed { reason, .. } => println!("outcome   failed: {}", reason),
    }
    println!();
    for record in &report.timeline {
        let attempt = record.attempt.map(|a| format!(" #{a}")).unwrap_or_default();
        let passed = match record.passed {
            Some(true) => " passed",
            Some(false) => " failed",
            None => "",
        };
        println!("  {} {}{}{}", record.at.format("%H:%M:%S%.3f"), record.stage, attempt, passed);
    }
    Ok(())
}
