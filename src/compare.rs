use crate::{
    compute::compute_year,
    data::{MonthResult, Year, YearTotals, MONTHS},
    store::ReadingStore,
};
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    Increase,
    Decrease,
}

/// Main meter total of a year against the year before.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum YearComparison {
    NoPreviousYear,
    /// The previous year exists but adds up to zero.
    InsufficientData,
    Change {
        diff: Decimal,
        pct: Decimal,
        direction: Direction,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Trend {
    Up,
    Down,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MonthComparison {
    NoData,
    Change {
        diff: Decimal,
        pct: Decimal,
        trend: Trend,
    },
}

/// Signed difference and percentage of it relative to `previous`, which must not
/// be zero.
fn change(current: Decimal, previous: Decimal) -> Option<(Decimal, Decimal)> {
    let diff = current.checked_sub(previous)?;
    let pct = diff.checked_div(previous)?.checked_mul(Decimal::ONE_HUNDRED)?;
    Some((diff, pct))
}

pub(crate) fn compare_years(current: &YearTotals, previous: Option<&YearTotals>) -> YearComparison {
    let Some(previous) = previous else {
        return YearComparison::NoPreviousYear;
    };
    if previous.main.is_zero() {
        return YearComparison::InsufficientData;
    }
    match change(current.main, previous.main) {
        Some((diff, pct)) => YearComparison::Change {
            diff,
            pct,
            direction: if diff >= Decimal::ZERO {
                Direction::Increase
            } else {
                Direction::Decrease
            },
        },
        None => YearComparison::InsufficientData,
    }
}

/// `compare_years` for `year` and the one before it, straight from the store.
pub(crate) fn compare_year<S: ReadingStore>(year: Year, store: &S) -> YearComparison {
    let previous = year
        .checked_sub(1)
        .filter(|previous| store.get_year(*previous).is_some())
        .map(|previous| compute_year(previous, store).totals);
    compare_years(&compute_year(year, store).totals, previous.as_ref())
}

fn compare_month(current: &MonthResult, previous: &MonthResult) -> MonthComparison {
    if previous.main.is_zero() {
        return MonthComparison::NoData;
    }
    let Some((diff, pct)) = change(current.main, previous.main) else {
        return MonthComparison::NoData;
    };
    let trend = if diff > Decimal::ZERO {
        Trend::Up
    } else if diff < Decimal::ZERO {
        Trend::Down
    } else {
        Trend::Neutral
    };
    MonthComparison::Change { diff, pct, trend }
}

pub(crate) fn compare_months(
    current: &[MonthResult; MONTHS],
    previous: &[MonthResult; MONTHS],
) -> [MonthComparison; MONTHS] {
    std::array::from_fn(|i| compare_month(&current[i], &previous[i]))
}

/// Month by month comparison of `year` with the year before; all `NoData` when
/// there is no year before.
pub(crate) fn compare_month_rows<S: ReadingStore>(
    year: Year,
    store: &S,
) -> [MonthComparison; MONTHS] {
    match year
        .checked_sub(1)
        .filter(|previous| store.get_year(*previous).is_some())
    {
        Some(previous) => compare_months(
            &compute_year(year, store).months,
            &compute_year(previous, store).months,
        ),
        None => [MonthComparison::NoData; MONTHS],
    }
}
