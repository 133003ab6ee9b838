use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use soulbrowser_resilience::{Orchestrator, ResilienceConfig};

use super::output::OutputFormat;

pub struct CliContext {
    config: ResilienceConfig,
    output: OutputFormat,
    orchestrator: OnceCell<Orchestrator>,
}

impl CliContext {
    pub fn new(config: ResilienceConfig, output: OutputFormat) -> Self {
        Self {
            config,
            output,
            orchestrator: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &ResilienceConfig {
        &self.config
    }

    pub fn output(&self) -> OutputFormat {
        self.output
    }

    /// Stores are opened on first use so pure commands never touch disk
    pub fn orchestrator(&self) -> Result<&Orchestrator> {
        self.orchestrator
            .get_or_try_init(|| Orchestrator::new(&self.config))
            .context("Failed to open resilience stores")
    }
}
