//! Journal-level derived data: parsed dates, thru-hiker extraction, per-entry deltas
//! and pace statistics.
//!
//! Journal dates look like `"Sunday, March 6, 2016"`. Commas are stripped and the rest
//! parsed with [`JournalConfig::date_format`]. A date that does not parse is reported
//! as [`JournalError::UnparsableDate`]; anything computed from it (delta days, miles
//! per day, elapsed days) is left out rather than guessed.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate};
use log::warn;
use thiserror::Error;

use crate::{EntryDirection, Hiker, HikerDirection, JournalEntry, LocationMatch};

/// Errors raised while deriving journal data.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum JournalError {
    #[error("Hiker {hiker_id}, entry {entry_num}: unparsable date '{date}'")]
    UnparsableDate { hiker_id: u64, entry_num: u32, date: String },
}

/// Configuration for date handling and thru-hiker detection.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JournalConfig {
    /// Trip mileage at which a hiker counts as a thru-hiker.
    /// Default: 2000.0 miles
    pub thru_hike_miles: f64,

    /// chrono format applied after commas are removed.
    /// Default: "%A %B %d %Y"
    pub date_format: String,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            thru_hike_miles: 2000.0,
            date_format: "%A %B %d %Y".to_string(),
        }
    }
}

// ============================================================================
// Dates
// ============================================================================

/// Parse a journal date string.
///
/// Scraped weekdays are sometimes wrong for the date they accompany; when the format
/// leads with `%A` and the strict parse fails, the weekday token is ignored.
///
/// ```rust
/// use chrono::NaiveDate;
/// use trail_matcher::journal::parse_journal_date;
///
/// let date = parse_journal_date("Sunday, March 6, 2016", "%A %B %d %Y");
/// assert_eq!(date, NaiveDate::from_ymd_opt(2016, 3, 6));
/// assert_eq!(parse_journal_date("sometime in spring", "%A %B %d %Y"), None);
/// ```
pub fn parse_journal_date(date: &str, format: &str) -> Option<NaiveDate> {
    let cleaned = date.replace(',', "");
    let cleaned = cleaned.trim();

    if let Ok(parsed) = NaiveDate::parse_from_str(cleaned, format) {
        return Some(parsed);
    }

    let rest_format = format.strip_prefix("%A ")?;
    let (_, rest) = cleaned.split_once(char::is_whitespace)?;
    NaiveDate::parse_from_str(rest.trim_start(), rest_format).ok()
}

/// Parsed date of one entry, or an `UnparsableDate` naming the hiker and entry.
pub fn entry_date(hiker_id: u64, entry: &JournalEntry, config: &JournalConfig) -> Result<NaiveDate, JournalError> {
    parse_journal_date(&entry.date, &config.date_format).ok_or_else(|| JournalError::UnparsableDate {
        hiker_id,
        entry_num: entry.entry_num,
        date: entry.date.clone(),
    })
}

/// Parse every entry date once, logging failures.
fn parse_dates(hiker: &Hiker, config: &JournalConfig) -> (BTreeMap<u32, NaiveDate>, Vec<JournalError>) {
    let mut dates = BTreeMap::new();
    let mut errors = Vec::new();
    for (&num, entry) in &hiker.journal {
        match entry_date(hiker.id, entry, config) {
            Ok(d) => {
                dates.insert(num, d);
            }
            Err(e) => {
                warn!("[Journal] {}", e);
                errors.push(e);
            }
        }
    }
    (dates, errors)
}

// ============================================================================
// Thru-hikers
// ============================================================================

/// First entry (by entry number) whose trip mileage reaches the thru-hike threshold.
pub fn thru_hiker_entry(hiker: &Hiker, config: &JournalConfig) -> Option<u32> {
    hiker
        .journal
        .values()
        .find(|e| e.trip_mileage >= config.thru_hike_miles)
        .map(|e| e.entry_num)
}

pub fn is_thru_hiker(hiker: &Hiker, config: &JournalConfig) -> bool {
    thru_hiker_entry(hiker, config).is_some()
}

/// Days from the first journal entry to the qualifying thru-hike entry.
///
/// `Ok(None)` for hikers who never qualify. Can be negative when entry numbers and
/// dates disagree.
pub fn elapsed_days(hiker: &Hiker, config: &JournalConfig) -> Result<Option<i64>, JournalError> {
    let Some(qualifying) = thru_hiker_entry(hiker, config) else {
        return Ok(None);
    };
    let Some(first) = hiker.journal.values().next() else {
        return Ok(None);
    };
    let start = entry_date(hiker.id, first, config)?;
    let end = entry_date(hiker.id, &hiker.journal[&qualifying], config)?;
    Ok(Some((end - start).num_days()))
}

/// Histogram of elapsed days (non-negative only) over the thru-hikers in `hikers`.
pub fn days_taken_histogram<'h>(
    hikers: impl IntoIterator<Item = &'h Hiker>,
    config: &JournalConfig,
) -> (BTreeMap<i64, usize>, Vec<JournalError>) {
    let mut histogram = BTreeMap::new();
    let mut errors = Vec::new();
    for hiker in hikers {
        match elapsed_days(hiker, config) {
            Ok(Some(days)) if days >= 0 => *histogram.entry(days).or_default() += 1,
            Ok(_) => {}
            Err(e) => {
                warn!("[Journal] {}", e);
                errors.push(e);
            }
        }
    }
    (histogram, errors)
}

/// Days-taken histograms split by the classifier's hiker verdict.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DaysTakenByDirection {
    pub northbound: BTreeMap<i64, usize>,
    pub southbound: BTreeMap<i64, usize>,
}

/// [`days_taken_histogram`] for northbound and southbound hikers separately.
/// Hikers without a North/South verdict are skipped.
pub fn days_taken_by_direction<'h>(
    hikers: impl IntoIterator<Item = &'h Hiker>,
    config: &JournalConfig,
) -> (DaysTakenByDirection, Vec<JournalError>) {
    let (north, south): (Vec<&Hiker>, Vec<&Hiker>) = hikers
        .into_iter()
        .filter(|h| matches!(h.direction, Some(HikerDirection::North | HikerDirection::South)))
        .partition(|h| h.direction == Some(HikerDirection::North));

    let (northbound, mut errors) = days_taken_histogram(north, config);
    let (southbound, south_errors) = days_taken_histogram(south, config);
    errors.extend(south_errors);
    (DaysTakenByDirection { northbound, southbound }, errors)
}

/// Departure month (1-12, from the first entry) tally over the thru-hikers in `hikers`.
pub fn departure_months<'h>(
    hikers: impl IntoIterator<Item = &'h Hiker>,
    config: &JournalConfig,
) -> (BTreeMap<u32, usize>, Vec<JournalError>) {
    let mut months = BTreeMap::new();
    let mut errors = Vec::new();
    for hiker in hikers.into_iter().filter(|h| is_thru_hiker(h, config)) {
        let Some(first) = hiker.journal.values().next() else { continue };
        match entry_date(hiker.id, first, config) {
            Ok(date) => *months.entry(date.month()).or_default() += 1,
            Err(e) => {
                warn!("[Journal] {}", e);
                errors.push(e);
            }
        }
    }
    (months, errors)
}

// ============================================================================
// Per-entry data
// ============================================================================

/// The location on an entry that carries a classifier direction, start first.
fn directed_location(entry: &JournalEntry) -> Option<&LocationMatch> {
    [entry.start_loc.as_ref(), entry.dest.as_ref()]
        .into_iter()
        .flatten()
        .find(|loc| loc.direction.is_some())
}

/// LOCDIR composite, e.g. `"12N"` or `"4UD"`. `None` until the entry is classified.
pub fn loc_dir(entry: &JournalEntry) -> Option<String> {
    let loc = directed_location(entry)?;
    loc.direction.map(|d| format!("{}{}", loc.shelter_id, d.label()))
}

/// Downstream view of one classified entry.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnnotatedEntry {
    pub entry_num: u32,
    pub start_shelter_id: Option<u32>,
    pub dest_shelter_id: Option<u32>,
    pub direction: Option<EntryDirection>,
    pub trip_mileage: f64,
    pub date: Option<NaiveDate>,
}

/// Flatten a classified hiker into the records consumed by statistics code.
pub fn annotate(hiker: &Hiker, config: &JournalConfig) -> (Vec<AnnotatedEntry>, Vec<JournalError>) {
    let (dates, errors) = parse_dates(hiker, config);
    let entries = hiker
        .journal
        .values()
        .map(|e| AnnotatedEntry {
            entry_num: e.entry_num,
            start_shelter_id: e.start_loc.as_ref().map(|l| l.shelter_id),
            dest_shelter_id: e.dest.as_ref().map(|l| l.shelter_id),
            direction: directed_location(e).and_then(|l| l.direction),
            trip_mileage: e.trip_mileage,
            date: dates.get(&e.entry_num).copied(),
        })
        .collect();
    (entries, errors)
}

/// Change between an entry and the next one in entry-number order.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntryDelta {
    pub entry_num: u32,
    pub next_entry_num: u32,
    pub loc_dir: Option<String>,
    pub delta_mileage: f64,
    /// `None` when either date is unparsable
    pub delta_days: Option<i64>,
    /// 0 when no days elapsed; `None` when `delta_days` is `None`
    pub miles_per_day: Option<f64>,
}

/// Deltas for every adjacent entry pair; the last entry has none.
pub fn entry_deltas(hiker: &Hiker, config: &JournalConfig) -> (Vec<EntryDelta>, Vec<JournalError>) {
    let (dates, errors) = parse_dates(hiker, config);
    let entries: Vec<&JournalEntry> = hiker.journal.values().collect();

    let deltas = entries
        .windows(2)
        .map(|w| {
            let (one, two) = (w[0], w[1]);
            let delta_mileage = two.trip_mileage - one.trip_mileage;
            let delta_days = match (dates.get(&one.entry_num), dates.get(&two.entry_num)) {
                (Some(a), Some(b)) => Some((*b - *a).num_days()),
                _ => None,
            };
            EntryDelta {
                entry_num: one.entry_num,
                next_entry_num: two.entry_num,
                loc_dir: loc_dir(one),
                delta_mileage,
                delta_days,
                miles_per_day: delta_days.map(|d| miles_per_day(delta_mileage, d)),
            }
        })
        .collect();

    (deltas, errors)
}

#[inline]
fn miles_per_day(delta_mileage: f64, delta_days: i64) -> f64 {
    if delta_days == 0 {
        0.0
    } else {
        delta_mileage / delta_days as f64
    }
}

// ============================================================================
// Pace
// ============================================================================

/// Mean miles/day over deltas that have one.
pub fn average_miles_per_day(deltas: &[EntryDelta]) -> Option<f64> {
    let values: Vec<f64> = deltas.iter().filter_map(|d| d.miles_per_day).collect();
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HikerPace {
    pub hiker_id: u64,
    pub average_miles_per_day: Option<f64>,
    /// Hiker average minus corpus mean
    pub bias: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PaceSummary {
    /// Mean of the per-hiker averages
    pub corpus_mean: Option<f64>,
    pub hikers: Vec<HikerPace>,
}

/// Per-hiker average pace and bias relative to the corpus mean.
pub fn pace_summary<'h>(
    hikers: impl IntoIterator<Item = &'h Hiker>,
    config: &JournalConfig,
) -> (PaceSummary, Vec<JournalError>) {
    let mut errors = Vec::new();
    let mut paces: Vec<HikerPace> = Vec::new();

    for hiker in hikers {
        let (deltas, errs) = entry_deltas(hiker, config);
        errors.extend(errs);
        paces.push(HikerPace {
            hiker_id: hiker.id,
            average_miles_per_day: average_miles_per_day(&deltas),
            bias: None,
        });
    }

    let averages: Vec<f64> = paces.iter().filter_map(|p| p.average_miles_per_day).collect();
    let corpus_mean = (!averages.is_empty()).then(|| averages.iter().sum::<f64>() / averages.len() as f64);

    if let Some(mean) = corpus_mean {
        for pace in &mut paces {
            pace.bias = pace.average_miles_per_day.map(|avg| avg - mean);
        }
    }

    (PaceSummary { corpus_mean, hikers: paces }, errors)
}

/// Entry numbers with unparsable dates, for reporting.
pub fn unparsable_entries(errors: &[JournalError]) -> BTreeSet<(u64, u32)> {
    errors
        .iter()
        .map(|JournalError::UnparsableDate { hiker_id, entry_num, .. }| (*hiker_id, *entry_num))
        .collect()
}
