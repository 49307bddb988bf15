// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Text/JSON rendering of a [`Task`], shared across the `submit`, `status`,
//! and `cancel` subcommands.

use clap::ValueEnum;
use orch_core::Task;

#[derive(Clone, Copy, Debug, Default, PartialEq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

pub fn print_task(task: &Task, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => {
            println!("task      {}", task.task_id);
            println!("target    {} app{}", task.target_model, task.target_app_number);
            println!("type      {}", task.analysis_type);
            println!("status    {}", task.status);
            println!("progress  {}%", task.progress);
            if let Some(message) = &task.error_message {
                println!("error     {message}");
            }
            if let Some(path) = &task.result_path {
                println!("result    {}", path.display());
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(task)?);
        }
    }
    Ok(())
}
