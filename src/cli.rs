use std::error::Error;
use std::io;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::DEFAULT_YEAR;

/// Convert an iCalendar file read from stdin into a sorted CSV report of
/// one year's occurrences: `date,time,duration_seconds,title`.
#[derive(Debug, Parser)]
#[command(name = "ical2csv", version)]
pub struct Cli {
    /// Year to report on
    #[arg(default_value_t = DEFAULT_YEAR)]
    pub year: i32,
}

impl Cli {
    pub fn run(&self) -> Result<(), Box<dyn Error>> {
        tracing::debug!(?self, "converting calendar...");
        let stdin = io::stdin();
        let stdout = io::stdout();
        crate::report(stdin.lock(), self.year, stdout.lock())?;
        Ok(())
    }
}

/// Logs go to stderr, filtered by `RUST_LOG` (default `warn`).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}
