//! soulheal - command line front end for the resilience stores

mod cli;

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    cli::app::run().await
}
