// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `orch`: the collaborator-facing CLI. Speaks the submission protocol
//! (spec §6.1) to a running `orchd`; never touches the Task Store or the
//! filesystem directly.

mod client;
mod exit_error;
mod output;

use clap::{Parser, Subcommand};
use client::DaemonClient;
use exit_error::ExitError;
use orch_core::{AnalysisType, TaskId};
use output::{print_task, OutputFormat};
use std::collections::BTreeSet;

#[derive(Parser)]
#[command(name = "orch", about = "Submit and track analysis orchestration tasks")]
struct Cli {
    /// `host:port` of a running orchd (default from `ORCH_SUBMIT_ADDR`, or
    /// 127.0.0.1:7420).
    #[arg(long, global = true)]
    addr: Option<String>,

    /// Output format.
    #[arg(long, value_enum, global = true, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Submit a new analysis task.
    Submit {
        /// Target model slug, e.g. `openai_gpt-4o`.
        model: String,
        /// Target app number.
        app_number: u32,
        /// Which analyzer services to dispatch to.
        #[arg(long, value_enum, default_value = "unified")]
        analysis_type: AnalysisTypeArg,
        /// Restrict to specific tools (repeatable). Omit to run every tool
        /// the registry knows for the selected services.
        #[arg(long = "tool")]
        tools: Vec<String>,
        /// Pipeline id for duplicate-submission prevention.
        #[arg(long)]
        pipeline_id: Option<String>,
    },
    /// Fetch the current state of a task.
    Status {
        /// Accepts the id with or without its `task_` prefix.
        task_id: String,
    },
    /// Request cancellation of a task.
    Cancel {
        /// Accepts the id with or without its `task_` prefix.
        task_id: String,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum AnalysisTypeArg {
    Static,
    Dynamic,
    Performance,
    Ai,
    Unified,
}

impl From<AnalysisTypeArg> for AnalysisType {
    fn from(value: AnalysisTypeArg) -> Self {
        match value {
            AnalysisTypeArg::Static => AnalysisType::Static,
            AnalysisTypeArg::Dynamic => AnalysisType::Dynamic,
            AnalysisTypeArg::Performance => AnalysisType::Performance,
            AnalysisTypeArg::Ai => AnalysisType::Ai,
            AnalysisTypeArg::Unified => AnalysisType::Unified,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(e.code);
    }
}

async fn run(cli: Cli) -> Result<(), ExitError> {
    let addr = cli.addr.unwrap_or_else(orch_daemon::env::submit_addr);
    let client = DaemonClient::new(addr);

    let task = match cli.command {
        Command::Submit { model, app_number, analysis_type, tools, pipeline_id } => client
            .submit(model, app_number, analysis_type.into(), BTreeSet::from_iter(tools), pipeline_id)
            .await
            .map_err(|e| ExitError::new(1, e.to_string()))?,
        Command::Status { task_id } => {
            client.get(TaskId::from(task_id)).await.map_err(|e| ExitError::new(1, e.to_string()))?
        }
        Command::Cancel { task_id } => {
            client.cancel(TaskId::from(task_id)).await.map_err(|e| ExitError::new(1, e.to_string()))?
        }
    };

    print_task(&task, cli.format).map_err(|e| ExitError::new(1, e.to_string()))
}
