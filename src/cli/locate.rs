use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::Args;
use soulbrowser_resilience::action_locator::{
    Candidate, FindOptions, FindStrategy, HealOptions, SnapshotDom,
};
use tokio_util::sync::CancellationToken;

use super::context::CliContext;
use super::output::emit;

#[derive(Args, Clone, Debug)]
pub struct HealArgs {
    /// JSON DOM snapshot (`{viewport, elements: [...]}`)
    #[arg(long, value_name = "FILE")]
    pub dom: PathBuf,

    /// Selector that stopped matching
    #[arg(long)]
    pub selector: String,

    /// Text the element showed when the selector last worked
    #[arg(long)]
    pub text: Option<String>,

    /// Last known attribute, as name=value (repeatable)
    #[arg(long = "attr", value_name = "NAME=VALUE")]
    pub attributes: Vec<String>,

    #[arg(long, default_value_t = 5)]
    pub max: usize,
}

#[derive(Args, Clone, Debug)]
pub struct FindArgs {
    /// JSON DOM snapshot (`{viewport, elements: [...]}`)
    #[arg(long, value_name = "FILE")]
    pub dom: PathBuf,

    /// Loose description, e.g. "the blue Add to cart button"
    pub query: String,

    /// auto, text, aria, semantic or visual
    #[arg(long, default_value = "auto")]
    pub strategy: FindStrategy,

    #[arg(long, default_value_t = 0.7)]
    pub threshold: f64,

    /// Extra context words
    #[arg(long)]
    pub context: Option<String>,

    /// Return every candidate above the threshold
    #[arg(long)]
    pub multiple: bool,
}

fn load_dom(path: &Path) -> Result<SnapshotDom> {
    SnapshotDom::load(path)
        .with_context(|| format!("Failed to load DOM snapshot {}", path.display()))
}

fn print_candidates(candidates: &[Candidate]) {
    if candidates.is_empty() {
        println!("[no candidates]");
        return;
    }
    for (rank, candidate) in candidates.iter().enumerate() {
        println!(
            "{:>2}. {:<48} {:.2}  {:<14} {}",
            rank + 1,
            candidate.selector,
            candidate.confidence,
            candidate.strategy.name(),
            candidate.reason
        );
    }
}

pub async fn cmd_heal(args: HealArgs, ctx: &CliContext) -> Result<()> {
    let dom = load_dom(&args.dom)?;
    let mut options = HealOptions::default().with_max_alternatives(args.max);
    if let Some(text) = args.text {
        options = options.with_text(text);
    }
    for raw in &args.attributes {
        let (name, value) = raw
            .split_once('=')
            .ok_or_else(|| anyhow!("attribute '{}' is not NAME=VALUE", raw))?;
        options = options.with_attribute(name.trim(), value.trim());
    }

    let candidates = ctx
        .orchestrator()?
        .heal(&dom, &args.selector, &options)
        .await?;
    emit(ctx.output(), &candidates, || print_candidates(&candidates))
}

pub async fn cmd_find(args: FindArgs, ctx: &CliContext) -> Result<()> {
    let dom = load_dom(&args.dom)?;
    let mut options = FindOptions::default()
        .with_strategy(args.strategy)
        .with_threshold(args.threshold);
    options.context = args.context;
    if args.multiple {
        options = options.multiple();
    }

    let outcome = ctx
        .orchestrator()?
        .find(&dom, &args.query, &options, &CancellationToken::new())
        .await?;
    emit(ctx.output(), &outcome, || print_candidates(&outcome.candidates()))
}
