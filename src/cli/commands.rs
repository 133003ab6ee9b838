use clap::Subcommand;

use super::diagnose::{CategorizeArgs, NormalizeArgs};
use super::locate::{FindArgs, HealArgs};
use super::store::{ErrorsArgs, PatternsArgs};
use super::validate::ValidateArgs;

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Classify an error message into the failure taxonomy
    Categorize(CategorizeArgs),

    /// Show the normalized signature of a message and/or selector
    Normalize(NormalizeArgs),

    /// Execution, failure, pattern and validation statistics
    Stats,

    /// List recorded failures
    Errors(ErrorsArgs),

    /// List learned fix patterns
    Patterns(PatternsArgs),

    /// Suggest alternatives for a broken selector against a DOM snapshot
    Heal(HealArgs),

    /// Find an element from a description against a DOM snapshot
    Find(FindArgs),

    /// Score a tool result
    Validate(ValidateArgs),
}
