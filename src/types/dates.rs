//! Date handling for values that arrive from sheet cells.
//!
//! A date cell can hold a native date, a serial day count (days since
//! 1899-12-30, the spreadsheet epoch) or text. Text is read as `dd.mm.yyyy`
//! first and falls back to ISO 8601 and a few other common layouts.

use std::cmp::Ordering;
use std::ops::RangeInclusive;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeDelta};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::types::Cell;

const DATE_FORMAT: &str = "%d.%m.%Y";
const FALLBACK_DATE_TIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];
const FALLBACK_DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Parses a cell into a calendar date, returning `None` for blank or unparseable values.
///
/// Text matching `dd.mm.yyyy` that does not name a real calendar day (e.g. `31.02.2025`)
/// is rejected outright rather than handed to the fallback parsers.
pub fn parse_date(value: &Cell) -> Option<NaiveDate> {
    match value {
        Cell::Date(date) => Some(*date),
        Cell::Number(days) => from_serial(*days),
        Cell::Text(text) => parse_date_text(text),
        Cell::Empty | Cell::Bool(_) => None
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Number of days in the zero-based `month0` of `year`.
pub fn last_day_of_month(year: i32, month0: u32) -> u32 {
    let (next_year, next_month) = if month0 >= 11 {
        (year + 1, 1)
    } else {
        (year, month0 + 2)
    };

    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(31)
}

/// Moves `date` into the month and year of `today`, keeping its day of month
/// capped to the length of the target month.
pub fn clamp_to_current_month(date: NaiveDate, today: NaiveDate) -> NaiveDate {
    let day = date.day().min(last_day_of_month(today.year(), today.month0()));

    NaiveDate::from_ymd_opt(today.year(), today.month(), day).unwrap_or(today)
}

/// Orders `date` against the calendar month containing `today`.
pub fn compare_month(date: NaiveDate, today: NaiveDate) -> Ordering {
    (date.year(), date.month()).cmp(&(today.year(), today.month()))
}

fn from_serial(days: Decimal) -> Option<NaiveDate> {
    let whole_days = days.floor().to_i64()?;
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;

    epoch.checked_add_signed(TimeDelta::try_days(whole_days)?)
}

fn parse_date_text(value: &str) -> Option<NaiveDate> {
    let value = value.trim();

    if value.is_empty() {
        return None;
    }

    if let Some((day, month, year)) = split_dotted(value) {
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    if let Ok(date_time) = DateTime::parse_from_rfc3339(value) {
        return Some(date_time.date_naive());
    }

    FALLBACK_DATE_TIME_FORMATS.iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok().map(|date_time| date_time.date()))
        .or_else(|| {
            FALLBACK_DATE_FORMATS.iter().find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        })
}

fn split_dotted(value: &str) -> Option<(u32, u32, i32)> {
    let mut parts = value.split('.');
    let (day, month, year) = (parts.next()?, parts.next()?, parts.next()?);

    if parts.next().is_some() {
        return None;
    }

    let is_digits = |part: &str, width: RangeInclusive<usize>| {
        width.contains(&part.len()) && part.bytes().all(|byte| byte.is_ascii_digit())
    };

    if !is_digits(day, 1..=2) || !is_digits(month, 1..=2) || !is_digits(year, 4..=4) {
        return None;
    }

    Some((day.parse().ok()?, month.parse().ok()?, year.parse().ok()?))
}
