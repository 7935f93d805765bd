use anyhow::Context;
use crate::data::{parse_year, Channel, MonthEntry, RawMonthEntry, Year, YearRecord, MONTHS};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// Read-only view of the readings, which is all the calculations get to see.
/// Implemented by `Readings` for real use and by small fixtures in tests.
pub(crate) trait ReadingStore {
    fn get_year(&self, year: Year) -> Option<&YearRecord>;
    /// Years with a record, oldest first.
    fn list_years(&self) -> Vec<Year>;
}

/// All recorded years, kept in a single JSON file: an object mapping the year
/// ("2024") to the list of its twelve month entries.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct Readings {
    years: BTreeMap<Year, YearRecord>,
}

impl ReadingStore for Readings {
    fn get_year(&self, year: Year) -> Option<&YearRecord> {
        self.years.get(&year)
    }

    fn list_years(&self) -> Vec<Year> {
        self.years.keys().copied().collect()
    }
}

impl Readings {
    pub fn new() -> Self {
        Self {
            years: BTreeMap::new(),
        }
    }

    /// Loads the store file. A missing file is a fresh start and a broken one is
    /// logged and replaced by an empty store; neither is an error for the caller.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => Self::from_json(&json),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No store at {}, starting empty", path.display());
                Self::new()
            }
            Err(e) => {
                warn!("Can't read store {}: {e}, starting empty", path.display());
                Self::new()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), anyhow::Error> {
        std::fs::write(path, self.to_json()?)
            .with_context(|| format!("Failed to save store {}", path.display()))?;
        debug!("Saved {} years to {}", self.years.len(), path.display());
        Ok(())
    }

    pub fn from_json(json: &str) -> Self {
        let parsed: BTreeMap<String, serde_json::Value> = match serde_json::from_str(json) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Store is not a JSON object ({e}), starting empty");
                return Self::new();
            }
        };
        let mut readings = Self::new();
        for (key, value) in parsed {
            // keys are written as exactly four digits; " 2024" would shadow "2024"
            let year = match parse_year(&key) {
                Ok(year) if key.trim() == key => year,
                _ => {
                    warn!("Skipping store entry {key:?}: not a year");
                    continue;
                }
            };
            let raw: Vec<RawMonthEntry> = match serde_json::from_value(value) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!("Skipping year {year}: {e}");
                    continue;
                }
            };
            if raw.len() != MONTHS {
                warn!(
                    "Year {year} has {} months instead of {MONTHS}, fixing up",
                    raw.len()
                );
            }
            let mut record = YearRecord::default();
            for (entry, raw) in record.months.iter_mut().zip(&raw) {
                *entry = MonthEntry::from(raw);
            }
            readings.years.insert(year, record);
        }
        readings
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let raw: BTreeMap<String, Vec<RawMonthEntry>> = self
            .years
            .iter()
            .map(|(year, record)| {
                (
                    format!("{year:04}"),
                    record.months.iter().map(RawMonthEntry::from).collect(),
                )
            })
            .collect();
        serde_json::to_string_pretty(&raw)
    }

    /// Adds an all-absent year unless it's already there. Returns whether it was
    /// created.
    pub fn create_year(&mut self, year: Year) -> bool {
        if self.years.contains_key(&year) {
            return false;
        }
        self.years.insert(year, YearRecord::default());
        debug!("Created year {year}");
        true
    }

    /// Records (or clears, with `None`) one reading. The year is created on the
    /// fly if needed. `month` is the 0-based index.
    pub fn set_reading(
        &mut self,
        year: Year,
        month: usize,
        channel: Channel,
        value: Option<Decimal>,
    ) {
        let record = self.years.entry(year).or_default();
        if let Some(entry) = record.months.get_mut(month) {
            entry.set(channel, value);
        }
    }

    pub fn latest_year(&self) -> Option<Year> {
        self.years.keys().next_back().copied()
    }
}
