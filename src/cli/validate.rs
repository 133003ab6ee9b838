use std::fs;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;
use soulbrowser_resilience::action_gate::ValidationContext;

use super::context::CliContext;
use super::output::emit;

#[derive(Args, Clone, Debug)]
pub struct ValidateArgs {
    /// Tool that produced the result (get_content, navigate, ...)
    #[arg(long)]
    pub tool: String,

    /// Result as inline JSON, or @path to a JSON file
    #[arg(long)]
    pub result: String,

    /// Tool parameters as inline JSON, or @path
    #[arg(long)]
    pub params: Option<String>,

    /// URL before the operation
    #[arg(long)]
    pub previous_url: Option<String>,

    /// Title before the operation
    #[arg(long)]
    pub previous_title: Option<String>,

    #[arg(long)]
    pub duration_ms: Option<u64>,
}

fn parse_json_arg(raw: &str) -> Result<Value> {
    let text = match raw.strip_prefix('@') {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?
        }
        None => raw.to_string(),
    };
    serde_json::from_str(&text).context("Invalid JSON")
}

pub fn cmd_validate(args: ValidateArgs, ctx: &CliContext) -> Result<()> {
    let result = parse_json_arg(&args.result)?;
    let params = match args.params.as_deref() {
        Some(raw) => parse_json_arg(raw)?,
        None => Value::Object(Default::default()),
    };
    let mut context = ValidationContext::new();
    context.previous_url = args.previous_url;
    context.previous_title = args.previous_title;
    context.duration_ms = args.duration_ms;

    let verdict = ctx
        .orchestrator()?
        .validate(&args.tool, &result, &params, &context);
    emit(ctx.output(), &verdict, || {
        let status = if verdict.skipped {
            "skipped (result reports failure)"
        } else if verdict.valid {
            "valid"
        } else {
            "INVALID"
        };
        println!("score {}/100, {}", verdict.score, status);
        for issue in &verdict.issues {
            println!(
                "  [{:?}] {} (-{}): {}",
                issue.severity, issue.issue_type, issue.deduction, issue.message
            );
        }
    })
}
