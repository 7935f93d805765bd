use clap::Parser;
use cli::{Cli, Command};
use compare::{compare_month_rows, compare_year};
use compute::{backward_readings, compute_year, line_series, share};
use data::{parse_user_reading, Channel, Error, Year};
use store::{ReadingStore, Readings};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use write::{
    backward_text, write_comparison_table, write_series, write_summary, write_year_table,
};

mod cli;
mod compare;
mod compute;
mod data;
mod store;
mod write;

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false).compact())
        .init();

    let mut readings = Readings::load(&cli.store);
    // like opening the tracker: this year is always there to fill in
    if readings.create_year(current_year()) {
        readings.save(&cli.store)?;
    }
    run(cli, &mut readings)
}

fn current_year() -> Year {
    jiff::Zoned::now().year()
}

fn selected_year(readings: &Readings, year: Option<Year>) -> Result<Year, Error> {
    let year = year
        .or_else(|| readings.latest_year())
        .unwrap_or_else(current_year);
    if readings.get_year(year).is_none() {
        return Err(Error::YearNotFound(year));
    }
    Ok(year)
}

fn run(cli: Cli, readings: &mut Readings) -> Result<(), anyhow::Error> {
    let stdout = std::io::stdout();
    match cli.command {
        Command::Years => {
            for year in readings.list_years() {
                println!("{year}");
            }
        }
        Command::NewYear { year } => {
            if readings.create_year(year) {
                readings.save(&cli.store)?;
                info!("Added {year}");
            } else {
                info!("{year} already exists");
            }
        }
        Command::Set {
            year,
            month,
            main,
            sub,
        } => {
            if main.is_none() && sub.is_none() {
                anyhow::bail!("nothing to record, give --main and/or --sub");
            }
            for (channel, input) in [(Channel::Main, main), (Channel::Sub, sub)] {
                if let Some(input) = input {
                    let value = parse_user_reading(&input)?;
                    readings.set_reading(year, month, channel, value);
                }
            }
            readings.save(&cli.store)?;
        }
        Command::Show { year } => {
            let year = selected_year(readings, year)?;
            let consumption = compute_year(year, &*readings);
            for backward in backward_readings(year, &*readings) {
                warn!("{}", backward_text(&backward));
            }
            if let Some(record) = readings.get_year(year) {
                write_year_table(stdout.lock(), record, &consumption)?;
            }
            write_summary(
                stdout.lock(),
                year,
                &consumption,
                share(&consumption.totals).as_ref(),
                &compare_year(year, &*readings),
            )?;
        }
        Command::Compare { year } => {
            let year = selected_year(readings, year)?;
            let previous = year.saturating_sub(1);
            if readings.get_year(previous).is_none() {
                info!("No readings for {previous}, nothing to compare with");
            }
            write_comparison_table(
                stdout.lock(),
                &compute_year(year, &*readings),
                &compute_year(previous, &*readings),
                &compare_month_rows(year, &*readings),
            )?;
        }
        Command::Series => {
            write_series(stdout.lock(), &line_series(&*readings))?;
        }
    }
    Ok(())
}
