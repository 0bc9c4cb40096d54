pub mod analysis;
pub mod cli;
pub mod config;
pub mod core;
pub mod dashboard;
pub mod error;
pub mod export;
pub mod fetcher;
pub mod indicators;
pub mod models;

/// Parses the command line and runs it on a multi-threaded tokio runtime.
pub fn run() -> anyhow::Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(cli::run())
}
