use anyhow::Result;
use clap::Args;
use soulbrowser_resilience::memory_center::{ErrorCategory, FailureRecord, Pattern};

use super::context::CliContext;
use super::output::emit;

#[derive(Args, Clone, Debug)]
pub struct ErrorsArgs {
    /// Only failures of this tool
    #[arg(long)]
    pub tool: Option<String>,

    /// Only failures of this category (e.g. selector-not-found)
    #[arg(long)]
    pub category: Option<ErrorCategory>,

    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

#[derive(Args, Clone, Debug)]
pub struct PatternsArgs {
    /// Only patterns learned for this tool
    #[arg(long)]
    pub tool: Option<String>,

    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

pub fn cmd_stats(ctx: &CliContext) -> Result<()> {
    let stats = ctx.orchestrator()?.stats();
    emit(ctx.output(), &stats, || {
        println!(
            "Failures:   {} stored, {} resolved ({:.0}%)",
            stats.errors.total_errors,
            stats.errors.resolved_errors,
            stats.errors.resolution_rate * 100.0
        );
        for (category, count) in &stats.errors.by_category {
            println!("  {:<26} {}", category, count);
        }
        println!(
            "Patterns:   {} stored, match rate {:.0}%, avg confidence {:.2}",
            stats.patterns.total_patterns,
            stats.patterns.match_rate * 100.0,
            stats.patterns.average_confidence
        );
        println!(
            "Validation: {} results, avg score {:.1}, {} failed results skipped",
            stats.validation.total_validations,
            stats.validation.average_score,
            stats.validation.skipped_validations
        );
    })
}

pub fn cmd_errors(args: ErrorsArgs, ctx: &CliContext) -> Result<()> {
    let collector = ctx.orchestrator()?.collector();
    let mut records: Vec<FailureRecord> = match (&args.tool, args.category) {
        (Some(tool), _) => collector.by_tool(tool),
        (None, Some(category)) => collector.by_category(category),
        (None, None) => collector.recent(args.limit),
    };
    if let (Some(_), Some(category)) = (&args.tool, args.category) {
        records.retain(|record| record.category == category);
    }
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    records.truncate(args.limit);

    emit(ctx.output(), &records, || {
        if records.is_empty() {
            println!("[no failures recorded]");
            return;
        }
        println!("{:<36} {:<14} {:<22} {}", "ID", "Tool", "Category", "Message");
        println!("{}", "-".repeat(100));
        for record in &records {
            let marker = if record.resolved { " (resolved)" } else { "" };
            println!(
                "{:<36} {:<14} {:<22} {}{}",
                record.id, record.tool, record.category, record.message, marker
            );
        }
    })
}

pub fn cmd_patterns(args: PatternsArgs, ctx: &CliContext) -> Result<()> {
    let learner = ctx.orchestrator()?.learner();
    let mut patterns: Vec<Pattern> = learner
        .patterns()
        .into_iter()
        .filter(|pattern| {
            args.tool
                .as_deref()
                .map_or(true, |tool| pattern.signature.tool == tool)
        })
        .collect();
    patterns.sort_by(|a, b| {
        b.metrics
            .confidence
            .partial_cmp(&a.metrics.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    patterns.truncate(args.limit);

    emit(ctx.output(), &patterns, || {
        if patterns.is_empty() {
            println!("[no patterns learned]");
            return;
        }
        for pattern in &patterns {
            println!(
                "{} [{} / {}] confidence {:.2}, {}/{} successful",
                pattern.id,
                pattern.signature.tool,
                pattern.signature.category,
                pattern.metrics.confidence,
                pattern.metrics.times_successful,
                pattern.metrics.times_matched
            );
            println!("    {}", pattern.fix.description);
        }
    })
}
