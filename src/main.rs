//! Exptrack CLI: run pipelines, process artifacts, trace lineage.

use anyhow::Result;
use clap::Parser;
use exptrack::engine::arg_parser::Cli;
use exptrack::engine::handle_run;
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
