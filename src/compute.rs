use crate::{
    data::{Channel, MonthEntry, MonthResult, Year, YearTotals, MONTHS},
    store::ReadingStore,
};
use rust_decimal::Decimal;

/// What a year of readings works out to.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct YearConsumption {
    pub months: [MonthResult; MONTHS],
    pub totals: YearTotals,
}

/// A reading lower than the one before it on the same meter. It's counted as
/// zero consumption, but may just as well be a meter swap or a typo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BackwardReading {
    pub month: usize,
    pub channel: Channel,
    pub previous: Decimal,
    pub current: Decimal,
}

/// Per-month outcome for a single meter.
#[derive(Debug, Default, Clone, Copy)]
struct Step {
    delta: Decimal,
    backward_from: Option<Decimal>,
}

/// Walks one meter's readings through the year. Each present reading is diffed
/// against the last present one before it (which may be December of the year
/// before), so gaps are bridged rather than counted as zero readings.
fn walk(
    mut previous: Option<Decimal>,
    readings: impl Iterator<Item = Option<Decimal>>,
) -> [Step; MONTHS] {
    let mut steps = [Step::default(); MONTHS];
    for (step, current) in steps.iter_mut().zip(readings) {
        if let (Some(prev), Some(cur)) = (previous, current) {
            if cur < prev {
                step.backward_from = Some(prev);
            } else {
                step.delta = cur.saturating_sub(prev);
            }
        }
        previous = current.or(previous);
    }
    steps
}

/// December of the year before, the starting point of January's consumption.
fn seed<S: ReadingStore>(year: Year, store: &S) -> MonthEntry {
    year.checked_sub(1)
        .and_then(|previous| store.get_year(previous))
        .map(|record| *record.december())
        .unwrap_or_default()
}

fn walk_channel<S: ReadingStore>(year: Year, store: &S, channel: Channel) -> [Step; MONTHS] {
    let readings = store
        .get_year(year)
        .map(|record| record.months)
        .unwrap_or_default();
    walk(
        seed(year, store).reading(channel),
        readings.iter().map(|entry| entry.reading(channel)),
    )
}

/// Monthly and yearly consumption for `year`. A year without a record comes out
/// as all zeros, and so does every month that has nothing earlier to diff against.
pub(crate) fn compute_year<S: ReadingStore>(year: Year, store: &S) -> YearConsumption {
    let mains = walk_channel(year, store, Channel::Main);
    let subs = walk_channel(year, store, Channel::Sub);
    let mut consumption = YearConsumption::default();
    for ((result, main), sub) in consumption.months.iter_mut().zip(mains).zip(subs) {
        *result = MonthResult {
            main: main.delta,
            sub: sub.delta,
            derived: main.delta.saturating_sub(sub.delta).max(Decimal::ZERO),
        };
        consumption.totals += *result;
    }
    consumption
}

/// Every place in `year` where a meter went backwards, main meter first.
pub(crate) fn backward_readings<S: ReadingStore>(year: Year, store: &S) -> Vec<BackwardReading> {
    let Some(record) = store.get_year(year) else {
        return Vec::new();
    };
    [Channel::Main, Channel::Sub]
        .into_iter()
        .flat_map(|channel| {
            walk_channel(year, store, channel)
                .into_iter()
                .enumerate()
                .filter_map(move |(month, step)| {
                    Some(BackwardReading {
                        month,
                        channel,
                        previous: step.backward_from?,
                        current: record.months[month].reading(channel)?,
                    })
                })
        })
        .collect()
}

/// How the year's consumption splits between the main house and the sub-meter
/// building, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Share {
    pub derived_pct: Decimal,
    pub sub_pct: Decimal,
}

/// `None` when there is nothing to split yet.
pub(crate) fn share(totals: &YearTotals) -> Option<Share> {
    let total = totals.derived.checked_add(totals.sub)?;
    if total <= Decimal::ZERO {
        return None;
    }
    Some(Share {
        derived_pct: totals.derived / total * Decimal::ONE_HUNDRED,
        sub_pct: totals.sub / total * Decimal::ONE_HUNDRED,
    })
}

/// One year's monthly values, the way a multi-year line chart plots them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct YearSeries {
    pub year: Year,
    pub main: [Decimal; MONTHS],
    pub sub: [Decimal; MONTHS],
    pub derived: [Decimal; MONTHS],
}

pub(crate) fn line_series<S: ReadingStore>(store: &S) -> Vec<YearSeries> {
    store
        .list_years()
        .into_iter()
        .map(|year| {
            let months = compute_year(year, store).months;
            YearSeries {
                year,
                main: months.map(|m| m.main),
                sub: months.map(|m| m.sub),
                derived: months.map(|m| m.derived),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::YearRecord;
    use crate::store::Readings;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    /// Builds a store from `(year, month index, main, sub)` rows.
    fn readings(rows: &[(Year, usize, Option<Decimal>, Option<Decimal>)]) -> Readings {
        let mut readings = Readings::new();
        for &(year, month, main, sub) in rows {
            readings.create_year(year);
            if main.is_some() {
                readings.set_reading(year, month, Channel::Main, main);
            }
            if sub.is_some() {
                readings.set_reading(year, month, Channel::Sub, sub);
            }
        }
        readings
    }

    fn result(main: Decimal, sub: Decimal, derived: Decimal) -> MonthResult {
        MonthResult { main, sub, derived }
    }

    #[test]
    fn test_empty_year() {
        let mut store = Readings::new();
        store.create_year(2024);
        assert_eq!(compute_year(2024, &store), YearConsumption::default());
        // no record at all behaves the same
        assert_eq!(compute_year(1990, &store), YearConsumption::default());
    }

    #[test]
    fn test_two_months_without_previous_year() {
        let store = readings(&[
            (2024, 0, Some(dec!(50)), Some(dec!(5))),
            (2024, 1, Some(dec!(70)), Some(dec!(10))),
        ]);
        let consumption = compute_year(2024, &store);
        assert_eq!(consumption.months[0], MonthResult::default());
        assert_eq!(
            consumption.months[1],
            result(dec!(20), dec!(5), dec!(15))
        );
        assert!(consumption.months[2..]
            .iter()
            .all(|m| *m == MonthResult::default()));
        assert_eq!(
            consumption.totals,
            YearTotals {
                main: dec!(20),
                sub: dec!(5),
                derived: dec!(15),
            }
        );
    }

    #[test]
    fn test_gap_skipping() {
        let store = readings(&[
            (2024, 0, Some(dec!(10)), None),
            (2024, 3, Some(dec!(25)), None),
        ]);
        let months = compute_year(2024, &store).months;
        assert_eq!(months[1].main, dec!(0));
        assert_eq!(months[2].main, dec!(0));
        assert_eq!(months[3].main, dec!(15));
    }

    #[test]
    fn test_year_boundary_seeding() {
        let store = readings(&[
            (2023, 11, Some(dec!(100)), Some(dec!(40))),
            (2024, 0, Some(dec!(110)), Some(dec!(43))),
        ]);
        assert_eq!(
            compute_year(2024, &store).months[0],
            result(dec!(10), dec!(3), dec!(7))
        );
    }

    #[test]
    fn test_no_seed_from_absent_december() {
        // 2023 exists but December was never filled in
        let store = readings(&[
            (2023, 10, Some(dec!(90)), None),
            (2024, 0, Some(dec!(110)), None),
        ]);
        assert_eq!(compute_year(2024, &store).months[0].main, dec!(0));
    }

    #[test]
    fn test_no_seed_across_missing_year() {
        let store = readings(&[
            (2022, 11, Some(dec!(100)), None),
            (2024, 0, Some(dec!(110)), None),
        ]);
        assert_eq!(compute_year(2024, &store).months[0].main, dec!(0));
    }

    #[test]
    fn test_channels_carry_independently() {
        let store = readings(&[
            (2024, 0, Some(dec!(100)), Some(dec!(10))),
            (2024, 1, Some(dec!(130)), None),
            (2024, 2, None, Some(dec!(18))),
            (2024, 3, Some(dec!(150)), Some(dec!(20))),
        ]);
        let months = compute_year(2024, &store).months;
        assert_eq!(months[1], result(dec!(30), dec!(0), dec!(30)));
        assert_eq!(months[2], result(dec!(0), dec!(8), dec!(0)));
        assert_eq!(months[3], result(dec!(20), dec!(2), dec!(18)));
    }

    #[test]
    fn test_derived_never_negative() {
        let store = readings(&[
            (2024, 0, Some(dec!(100)), Some(dec!(10))),
            (2024, 1, Some(dec!(105)), Some(dec!(30))),
        ]);
        let consumption = compute_year(2024, &store);
        assert_eq!(consumption.months[1], result(dec!(5), dec!(20), dec!(0)));
        for m in consumption.months {
            assert_eq!(m.derived, (m.main - m.sub).max(dec!(0)));
        }
    }

    #[test]
    fn test_backward_reading_clamps_and_moves_carry() {
        let store = readings(&[
            (2024, 0, Some(dec!(500)), None),
            (2024, 1, Some(dec!(20)), None),
            (2024, 2, Some(dec!(35)), None),
        ]);
        let months = compute_year(2024, &store).months;
        assert_eq!(months[1].main, dec!(0));
        // the next month diffs against the lower reading
        assert_eq!(months[2].main, dec!(15));
        assert_eq!(
            backward_readings(2024, &store),
            [BackwardReading {
                month: 1,
                channel: Channel::Main,
                previous: dec!(500),
                current: dec!(20),
            }]
        );
    }

    #[test]
    fn test_backward_across_year_boundary() {
        let store = readings(&[
            (2023, 11, None, Some(dec!(80))),
            (2024, 0, None, Some(dec!(2))),
        ]);
        assert_eq!(
            backward_readings(2024, &store),
            [BackwardReading {
                month: 0,
                channel: Channel::Sub,
                previous: dec!(80),
                current: dec!(2),
            }]
        );
        assert!(backward_readings(2023, &store).is_empty());
        assert!(backward_readings(2030, &store).is_empty());
    }

    #[test]
    fn test_huge_stored_reading_still_seeds() {
        let mut december = vec![r#"{"mainReading": "", "attefallReading": ""}"#; 11];
        december.push(r#"{"mainReading": "1e30", "attefallReading": ""}"#);
        let store = Readings::from_json(&format!(
            r#"{{"2023": [{}], "2024": [{{"mainReading": "500", "attefallReading": ""}}]}}"#,
            december.join(",")
        ));
        // an out of range reading is kept as a very large one, not as zero
        assert_eq!(compute_year(2024, &store).months[0].main, dec!(0));
        assert_eq!(backward_readings(2024, &store).len(), 1);
    }

    #[test]
    fn test_telescoping_total() {
        let mut rows = vec![(2023, 11, Some(dec!(1000)), Some(dec!(200)))];
        let mut main = dec!(1000);
        let mut sub = dec!(200);
        for month in 0..MONTHS {
            main += Decimal::from(month as u32 * 7 + 3);
            sub += Decimal::from(month as u32 % 3);
            rows.push((2024, month, Some(main), Some(sub)));
        }
        let totals = compute_year(2024, &readings(&rows)).totals;
        assert_eq!(totals.main, main - dec!(1000));
        assert_eq!(totals.sub, sub - dec!(200));
    }

    #[test]
    fn test_idempotent() {
        let store = readings(&[
            (2023, 11, Some(dec!(3.5)), None),
            (2024, 0, Some(dec!(7.25)), Some(dec!(1))),
            (2024, 6, Some(dec!(19)), Some(dec!(4))),
        ]);
        assert_eq!(compute_year(2024, &store), compute_year(2024, &store));
    }

    #[test]
    fn test_any_store() {
        // the engine only needs the read-only trait
        struct Fixture {
            years: BTreeMap<Year, YearRecord>,
        }
        impl ReadingStore for Fixture {
            fn get_year(&self, year: Year) -> Option<&YearRecord> {
                self.years.get(&year)
            }
            fn list_years(&self) -> Vec<Year> {
                self.years.keys().copied().collect()
            }
        }
        let mut record = YearRecord::default();
        record.months[0].main = Some(dec!(1));
        record.months[11].main = Some(dec!(12));
        let fixture = Fixture {
            years: BTreeMap::from([(2024, record)]),
        };
        assert_eq!(compute_year(2024, &fixture).months[11].main, dec!(11));
        assert_eq!(compute_year(2024, &fixture).totals.main, dec!(11));
    }

    #[test]
    fn test_share() {
        assert_eq!(share(&YearTotals::default()), None);
        assert_eq!(
            share(&YearTotals {
                main: dec!(100),
                sub: dec!(25),
                derived: dec!(75),
            }),
            Some(Share {
                derived_pct: dec!(75),
                sub_pct: dec!(25),
            })
        );
    }

    #[test]
    fn test_line_series() {
        let store = readings(&[
            (2023, 0, Some(dec!(10)), None),
            (2023, 11, Some(dec!(40)), None),
            (2024, 0, Some(dec!(45)), Some(dec!(1))),
        ]);
        let series = line_series(&store);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].year, 2023);
        assert_eq!(series[0].main[11], dec!(30));
        assert_eq!(series[1].year, 2024);
        assert_eq!(series[1].main[0], dec!(5));
        assert_eq!(series[1].sub, [dec!(0); MONTHS]);
        assert_eq!(series[1].derived[0], dec!(5));
    }
}
