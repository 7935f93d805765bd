//! Command line arguments.

use crate::data::{parse_month, parse_year, Year};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Keeps track of monthly electricity meter readings for the main meter and the
/// Attefall sub-meter, and works out what each month and year actually used.
#[derive(Parser, Debug)]
#[command(version, long_about)]
pub(crate) struct Cli {
    /// JSON file holding the readings. Created on first save.
    #[arg(long, env = "METERS_STORE", default_value = "meters.json", global = true)]
    pub store: PathBuf,

    /// Enable debug logging (RUST_LOG takes precedence).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// List the years in the store
    Years,

    /// Add a year with no readings yet
    NewYear {
        #[arg(value_parser = parse_year)]
        year: Year,
    },

    /// Record the meter readings for a month
    Set {
        #[arg(value_parser = parse_year)]
        year: Year,
        /// Month number, 1 for January
        #[arg(value_parser = parse_month)]
        month: usize,
        /// Cumulative main meter reading; an empty value clears it
        #[arg(long)]
        main: Option<String>,
        /// Cumulative Attefall meter reading; an empty value clears it
        #[arg(long)]
        sub: Option<String>,
    },

    /// Monthly table, totals and comparison with the year before
    Show {
        /// Defaults to the latest year in the store
        #[arg(value_parser = parse_year)]
        year: Option<Year>,
    },

    /// Month by month comparison with the year before
    Compare {
        /// Defaults to the latest year in the store
        #[arg(value_parser = parse_year)]
        year: Option<Year>,
    },

    /// Monthly consumption of every year, one line per series
    Series,
}
