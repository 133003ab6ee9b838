use anyhow::{bail, Result};
use clap::Args;
use serde::Serialize;
use soulbrowser_resilience::memory_center::{
    categorize, normalize_message, normalize_selector, ErrorCategory,
};

use super::context::CliContext;
use super::output::emit;

#[derive(Args, Clone, Debug)]
pub struct CategorizeArgs {
    /// Error message to classify
    pub message: String,
}

#[derive(Args, Clone, Debug)]
pub struct NormalizeArgs {
    #[arg(long)]
    pub message: Option<String>,

    #[arg(long)]
    pub selector: Option<String>,
}

#[derive(Serialize)]
struct CategoryReport<'a> {
    message: &'a str,
    category: ErrorCategory,
    locator_problem: bool,
    likely_causes: &'static [&'static str],
}

#[derive(Serialize)]
struct SignatureReport {
    message: Option<String>,
    selector: Option<String>,
}

pub fn cmd_categorize(args: CategorizeArgs, ctx: &CliContext) -> Result<()> {
    let category = categorize(&args.message);
    let report = CategoryReport {
        message: &args.message,
        category,
        locator_problem: category.is_locator_problem(),
        likely_causes: category.likely_causes(),
    };
    emit(ctx.output(), &report, || {
        println!("{}", category);
        for cause in category.likely_causes() {
            println!("  - {}", cause);
        }
    })
}

pub fn cmd_normalize(args: NormalizeArgs, ctx: &CliContext) -> Result<()> {
    if args.message.is_none() && args.selector.is_none() {
        bail!("pass --message and/or --selector");
    }
    let report = SignatureReport {
        message: args.message.as_deref().map(normalize_message),
        selector: args.selector.as_deref().map(normalize_selector),
    };
    emit(ctx.output(), &report, || {
        if let Some(message) = &report.message {
            println!("message:  {}", message);
        }
        if let Some(selector) = &report.selector {
            println!("selector: {}", selector);
        }
    })
}
