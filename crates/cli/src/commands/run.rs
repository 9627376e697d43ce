//! `agentflow run`: execute one request.

use agentflow_config::AppConfig;
use agentflow_core::agent::{Completion, ExecutionRequest};
use agentflow_workflow::{History, WorkflowRuntime, WorkflowSettings};
use anyhow::{Context, anyhow};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Args)]
pub struct RunArgs {
    /// The request text
    #[arg(short, long)]
    pub message: String,

    /// Agent key; repeat to pass several (the first one runs)
    #[arg(short, long = "agent", default_value = "benefits")]
    pub agents: Vec<String>,

    /// File URL to attach; repeatable
    #[arg(short, long = "file")]
    pub files: Vec<String>,

    /// Override execution.max_iterations
    #[arg(long)]
    pub max_iterations: Option<u32>,

    /// Write the execution history to this file
    #[arg(long)]
    pub record: Option<PathBuf>,

    /// Resume from a history file (updated in place)
    #[arg(long, conflicts_with = "record")]
    pub resume: Option<PathBuf>,

    /// Print the full response as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: RunArgs) -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load config")?;

    let tools = Arc::new(agentflow_tools::default_registry());
    let agents = super::load_agents(&config, &tools)?;
    let request = ExecutionRequest {
        request_text: args.message,
        request_files: args.files,
        agents: agents.resolve(&args.agents)?,
    };

    let mut settings = WorkflowSettings::from_config(&config);
    if let Some(max) = args.max_iterations {
        settings = settings.with_max_iterations(max);
    }

    if config.api_key_for("openai").is_none() {
        eprintln!("  warning: no API key configured; set OPENAI_API_KEY or run `agentflow onboard`");
    }
    let router = agentflow_providers::build_from_config(&config)?;
    let runtime = WorkflowRuntime::new(Arc::new(router), tools, settings);

    let history = match &args.resume {
        Some(path) => History::load(path)?,
        None => History::new(),
    };

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n  Cancelling...");
            on_interrupt.cancel();
        }
    });

    let report = runtime.run(request, history, cancel).await;

    if let Some(path) = args.record.as_ref().or(args.resume.as_ref()) {
        report
            .history
            .save(path)
            .with_context(|| format!("Failed to save history to {}", path.display()))?;
    }

    let response = report.result.map_err(|e| {
        anyhow!("execution {} failed ({:?}): {e}", report.execution_id, e.kind())
    })?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        println!("{}", response.result_text);
        if let Completion::IterationLimit { iterations } = response.completion {
            eprintln!("  (stopped after {iterations} tool iterations)");
        }
    }

    Ok(())
}
