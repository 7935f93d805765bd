use crate::{
    compare::{Direction, MonthComparison, Trend, YearComparison},
    compute::{BackwardReading, Share, YearConsumption, YearSeries},
    data::{Channel, Year, YearRecord, ENERGY_DIGITS, MONTH_NAMES, PERCENT_DIGITS},
};
use rust_decimal::Decimal;
use serde::Serialize;

/// One line of the monthly table: the readings as entered, then what they add up to.
#[derive(Serialize)]
struct MonthRow {
    month: &'static str,
    main_reading: Option<Decimal>,
    attefall_reading: Option<Decimal>,
    main_kwh: Decimal,
    attefall_kwh: Decimal,
    storhuset_kwh: Decimal,
}

fn energy(value: Decimal) -> Decimal {
    value.round_dp(ENERGY_DIGITS)
}

fn percent(value: Decimal) -> Decimal {
    value.round_dp(PERCENT_DIGITS)
}

/// CSV table of a year's readings and monthly consumption.
pub(crate) fn write_year_table<W: std::io::Write>(
    writer: W,
    record: &YearRecord,
    consumption: &YearConsumption,
) -> Result<(), anyhow::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    for ((name, entry), result) in MONTH_NAMES
        .into_iter()
        .zip(&record.months)
        .zip(&consumption.months)
    {
        wtr.serialize(MonthRow {
            month: name,
            main_reading: entry.main,
            attefall_reading: entry.sub,
            main_kwh: energy(result.main),
            attefall_kwh: energy(result.sub),
            storhuset_kwh: energy(result.derived),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct ComparisonRow {
    month: &'static str,
    main_kwh: Decimal,
    previous_main_kwh: Decimal,
    diff_kwh: Option<Decimal>,
    pct: Option<Decimal>,
    trend: &'static str,
}

/// CSV table comparing each month's main consumption with the year before.
pub(crate) fn write_comparison_table<W: std::io::Write>(
    writer: W,
    current: &YearConsumption,
    previous: &YearConsumption,
    rows: &[MonthComparison],
) -> Result<(), anyhow::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    for (i, (name, row)) in MONTH_NAMES.into_iter().zip(rows).enumerate() {
        let (diff, pct, trend) = match *row {
            MonthComparison::NoData => (None, None, "no data"),
            MonthComparison::Change { diff, pct, trend } => (
                Some(energy(diff)),
                Some(percent(pct)),
                match trend {
                    Trend::Up => "up",
                    Trend::Down => "down",
                    Trend::Neutral => "neutral",
                },
            ),
        };
        wtr.serialize(ComparisonRow {
            month: name,
            main_kwh: energy(current.months[i].main),
            previous_main_kwh: energy(previous.months[i].main),
            diff_kwh: diff,
            pct,
            trend,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// CSV with one line per year and series, months as columns.
pub(crate) fn write_series<W: std::io::Write>(
    writer: W,
    series: &[YearSeries],
) -> Result<(), anyhow::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    let mut header = vec!["year", "series"];
    header.extend(MONTH_NAMES);
    wtr.write_record(&header)?;
    for year in series {
        for (label, values) in [
            ("main", &year.main),
            ("attefall", &year.sub),
            ("storhuset", &year.derived),
        ] {
            let mut record = vec![year.year.to_string(), label.to_string()];
            record.extend(values.iter().map(|v| energy(*v).to_string()));
            wtr.write_record(&record)?;
        }
    }
    wtr.flush()?;
    Ok(())
}

/// The sentence shown under the totals, e.g.
/// "Compared with 2023: 120.00 kWh increase (8.5%)."
pub(crate) fn comparison_text(year: Year, comparison: &YearComparison) -> String {
    let previous = year.saturating_sub(1);
    match *comparison {
        YearComparison::NoPreviousYear => "No earlier yearly data yet.".to_string(),
        YearComparison::InsufficientData => {
            format!("Comparison with {previous} lacks sufficient data.")
        }
        YearComparison::Change {
            diff,
            pct,
            direction,
        } => {
            let direction = match direction {
                Direction::Increase => "increase",
                Direction::Decrease => "decrease",
            };
            format!(
                "Compared with {previous}: {} kWh {direction} ({}%).",
                energy(diff.abs()),
                percent(pct.abs())
            )
        }
    }
}

pub(crate) fn share_text(share: Option<&Share>) -> String {
    let (derived, sub) = share
        .map(|s| (percent(s.derived_pct), percent(s.sub_pct)))
        .unwrap_or_default();
    format!("Storhuset {derived}% / Attefall {sub}%")
}

pub(crate) fn backward_text(backward: &BackwardReading) -> String {
    let meter = match backward.channel {
        Channel::Main => "main",
        Channel::Sub => "attefall",
    };
    format!(
        "{}: {meter} reading {} is below the previous {}, counted as 0 kWh",
        MONTH_NAMES[backward.month], backward.current, backward.previous
    )
}

/// Totals, split and comparison, for the end of `show`.
pub(crate) fn write_summary<W: std::io::Write>(
    mut writer: W,
    year: Year,
    consumption: &YearConsumption,
    share: Option<&Share>,
    comparison: &YearComparison,
) -> Result<(), anyhow::Error> {
    let totals = &consumption.totals;
    writeln!(writer)?;
    writeln!(writer, "Total main:      {} kWh", energy(totals.main))?;
    writeln!(writer, "Total attefall:  {} kWh", energy(totals.sub))?;
    writeln!(writer, "Total storhuset: {} kWh", energy(totals.derived))?;
    writeln!(writer, "{}", share_text(share))?;
    writeln!(writer, "{}", comparison_text(year, comparison))?;
    Ok(())
}
