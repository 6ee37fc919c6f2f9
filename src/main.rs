use std::error::Error;

use clap::Parser;
use ical2csv::cli::{init_tracing, Cli};

fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();
    Cli::parse().run()
}
