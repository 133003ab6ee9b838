use super::diagnose::{cmd_categorize, cmd_normalize};
use super::env::CliArgs;
use super::locate::{cmd_find, cmd_heal};
use super::store::{cmd_errors, cmd_patterns, cmd_stats};
use super::validate::cmd_validate;
use crate::cli::commands::Commands;
use crate::cli::context::CliContext;
use anyhow::Result;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Categorize(args) => cmd_categorize(args, ctx),
        Commands::Normalize(args) => cmd_normalize(args, ctx),
        Commands::Stats => cmd_stats(ctx),
        Commands::Errors(args) => cmd_errors(args, ctx),
        Commands::Patterns(args) => cmd_patterns(args, ctx),
        Commands::Heal(args) => cmd_heal(args, ctx).await,
        Commands::Find(args) => cmd_find(args, ctx).await,
        Commands::Validate(args) => cmd_validate(args, ctx),
    }
}
