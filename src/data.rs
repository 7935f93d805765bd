use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::ops::AddAssign;
use std::str::FromStr;
use thiserror::Error;

pub type Year = i16;

pub const MONTHS: usize = 12;
pub const DECEMBER: usize = MONTHS - 1;

/// Display precision for energy values and percentages.
pub const ENERGY_DIGITS: u32 = 2;
pub const PERCENT_DIGITS: u32 = 1;

pub const MONTH_NAMES: [&str; MONTHS] = [
    "Januari",
    "Februari",
    "Mars",
    "April",
    "Maj",
    "Juni",
    "Juli",
    "Augusti",
    "September",
    "Oktober",
    "November",
    "December",
];

/// Which of the two meters a reading belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Channel {
    Main,
    Sub,
}

/// One month of cumulative readings. `None` means nothing has been recorded yet,
/// which is not the same thing as a recorded zero.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MonthEntry {
    pub main: Option<Decimal>,
    pub sub: Option<Decimal>,
}

impl MonthEntry {
    pub fn reading(&self, channel: Channel) -> Option<Decimal> {
        match channel {
            Channel::Main => self.main,
            Channel::Sub => self.sub,
        }
    }

    pub fn set(&mut self, channel: Channel, value: Option<Decimal>) {
        match channel {
            Channel::Main => self.main = value,
            Channel::Sub => self.sub = value,
        }
    }
}

/// A year of readings, January first. The array type is what guarantees there are
/// always exactly twelve entries; a fresh record has every reading absent.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct YearRecord {
    pub months: [MonthEntry; MONTHS],
}

impl YearRecord {
    pub fn december(&self) -> &MonthEntry {
        &self.months[DECEMBER]
    }
}

/// Consumption for one month. `derived` is what's left for the main house once
/// the sub-meter building is taken out; all three are never negative.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MonthResult {
    pub main: Decimal,
    pub sub: Decimal,
    pub derived: Decimal,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct YearTotals {
    pub main: Decimal,
    pub sub: Decimal,
    pub derived: Decimal,
}

impl AddAssign<MonthResult> for YearTotals {
    fn add_assign(&mut self, month: MonthResult) {
        self.main = self.main.saturating_add(month.main);
        self.sub = self.sub.saturating_add(month.sub);
        self.derived = self.derived.saturating_add(month.derived);
    }
}

/// Month entry as it sits in the store file. Both fields are strings, the empty
/// string standing for "not recorded"; the field names are kept from the browser
/// version of the tracker so existing data still loads.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct RawMonthEntry {
    #[serde(rename = "mainReading", default, deserialize_with = "raw_reading")]
    pub main: String,
    #[serde(rename = "attefallReading", default, deserialize_with = "raw_reading")]
    pub sub: String,
}

/// Accepts strings, numbers, booleans and null. Anything else is kept as text so
/// that it counts as a present (but unparseable) reading.
fn raw_reading<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        serde_json::Value::Bool(b) => u8::from(b).to_string(),
        other => other.to_string(),
    })
}

/// Tolerant decoding of a stored reading: empty is absent, anything else is
/// present and read the way the browser version's `Number()` did, falling back
/// to zero when that isn't a finite number.
pub(crate) fn coerce_reading(raw: &str) -> Option<Decimal> {
    if raw.is_empty() {
        return None;
    }
    let trimmed = raw.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}');
    Some(loose_number(trimmed).unwrap_or_default())
}

/// `None` for anything that isn't a finite number. Whitespace only reads as zero.
fn loose_number(s: &str) -> Option<Decimal> {
    if s.is_empty() {
        return Some(Decimal::ZERO);
    }
    let radix = match s.get(..2) {
        Some("0x" | "0X") => Some(16),
        Some("0o" | "0O") => Some(8),
        Some("0b" | "0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        return radix_integer(&s[2..], radix);
    }
    if !is_decimal_literal(s) {
        return None;
    }
    let exact = if s.contains(['e', 'E']) {
        Decimal::from_scientific(s)
    } else {
        Decimal::from_str(s)
    };
    exact
        .ok()
        .or_else(|| s.parse::<f64>().ok().and_then(clamp_float))
}

/// Unsigned integer in base 2, 8 or 16, without separators.
fn radix_integer(digits: &str, radix: u32) -> Option<Decimal> {
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    u128::from_str_radix(digits, radix)
        .ok()
        .and_then(Decimal::from_u128)
        .or_else(|| {
            let approx = digits.chars().fold(0.0_f64, |acc, c| {
                acc * f64::from(radix) + f64::from(c.to_digit(radix).unwrap_or(0))
            });
            clamp_float(approx)
        })
}

/// `[+-] digits [. digits] [(e|E) [+-] digits]`, with digits allowed on only one
/// side of the point. No separators, no `inf`/`nan`.
fn is_decimal_literal(s: &str) -> bool {
    let digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    let unsigned = s.strip_prefix(['+', '-']).unwrap_or(s);
    let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
        Some(at) => (&unsigned[..at], Some(&unsigned[at + 1..])),
        None => (unsigned, None),
    };
    let (int, frac) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let exponent_ok = exponent.map_or(true, |e| {
        let e = e.strip_prefix(['+', '-']).unwrap_or(e);
        !e.is_empty() && digits(e)
    });
    (!int.is_empty() || !frac.is_empty()) && digits(int) && digits(frac) && exponent_ok
}

/// Finite floats beyond what `Decimal` holds saturate at its bounds; tiny ones
/// round to zero.
fn clamp_float(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Decimal::from_f64(value).or(Some(if value.abs() < 1.0 {
        Decimal::ZERO
    } else if value > 0.0 {
        Decimal::MAX
    } else {
        Decimal::MIN
    }))
}

impl From<&RawMonthEntry> for MonthEntry {
    fn from(raw: &RawMonthEntry) -> Self {
        Self {
            main: coerce_reading(&raw.main),
            sub: coerce_reading(&raw.sub),
        }
    }
}

impl From<&MonthEntry> for RawMonthEntry {
    fn from(entry: &MonthEntry) -> Self {
        let encode = |reading: Option<Decimal>| reading.map(|r| r.to_string()).unwrap_or_default();
        Self {
            main: encode(entry.main),
            sub: encode(entry.sub),
        }
    }
}

/// Strict parsing of a year typed by the user: exactly four digits.
pub(crate) fn parse_year(input: &str) -> Result<Year, Error> {
    let trimmed = input.trim();
    if trimmed.len() != 4 || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidYear(input.to_string()));
    }
    trimmed
        .parse()
        .map_err(|_| Error::InvalidYear(input.to_string()))
}

/// Calendar month (1 = January) to index into `YearRecord::months`.
pub(crate) fn parse_month(input: &str) -> Result<usize, Error> {
    match input.trim().parse::<usize>() {
        Ok(month @ 1..=MONTHS) => Ok(month - 1),
        _ => Err(Error::InvalidMonth(input.to_string())),
    }
}

/// Strict parsing of a reading typed by the user. The empty string clears it.
pub(crate) fn parse_user_reading(input: &str) -> Result<Option<Decimal>, Error> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let value =
        Decimal::from_str(trimmed).map_err(|_| Error::InvalidReading(input.to_string()))?;
    if value.is_sign_negative() && !value.is_zero() {
        return Err(Error::NegativeReading(value));
    }
    Ok(Some(value))
}

/// Rejections happen at the command line; the calculations themselves never fail.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid year {0:?}, write 4 digits such as 2026")]
    InvalidYear(String),
    #[error("Invalid month {0:?}, expected a number from 1 to 12")]
    InvalidMonth(String),
    #[error("Invalid meter reading {0:?}")]
    InvalidReading(String),
    #[error("Meter readings can't be negative (got {0})")]
    NegativeReading(Decimal),
    #[error("Year {0} has no readings")]
    YearNotFound(Year),
}
