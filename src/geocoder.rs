//! Fuzzy geocoding of journal location text against the shelter [`Catalog`].
//!
//! Every catalog shelter is scored against the text and the best one is kept using a
//! greater-or-equal update, so among equally scored shelters the one scanned **last**
//! (highest id) wins. A best score under `threshold` resolves to nothing.
//!
//! A journal entry survives geocoding when its start location or its destination
//! resolves. The side that did not resolve is kept as an explicit `None`.

use std::collections::BTreeMap;

use log::{debug, info};

use crate::gazetteer::Catalog;
use crate::similarity::{PartialRatio, Similarity};
use crate::{Hiker, JournalEntry, LocationMatch, RawHiker, RawJournalEntry};

/// Configuration for text-to-shelter resolution.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeocoderConfig {
    /// Minimum best score (0-100) for a match to be accepted.
    /// Default: 90 (some historical runs used 85)
    pub threshold: u8,

    /// Record the top three score bands per lookup in the geocode report.
    /// Default: false
    pub keep_ranked: bool,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            threshold: 90,
            keep_ranked: false,
        }
    }
}

/// A successful resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeocodeMatch {
    pub shelter_id: u32,
    pub score: u8,
}

/// Outcome of a single lookup: the shelter id when the best score reaches the
/// threshold, and the best score either way (0 when nothing was scanned).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Resolution {
    pub shelter_id: Option<u32>,
    pub score: u8,
}

impl Resolution {
    pub fn matched(&self) -> Option<GeocodeMatch> {
        self.shelter_id.map(|shelter_id| GeocodeMatch { shelter_id, score: self.score })
    }
}

/// One distinct score level seen during a scan, with the last shelter that hit it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScoreBand {
    pub score: u8,
    pub shelter_id: u32,
}

/// Diagnostic view of a scan: the selected match plus the three highest distinct
/// score bands (highest first). `best` is exactly what [`Geocoder::resolve`] returns.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RankedMatches {
    pub best: Option<GeocodeMatch>,
    pub bands: Vec<ScoreBand>,
}

/// Resolves location text against a borrowed, read-only catalog.
pub struct Geocoder<'a, S = PartialRatio> {
    catalog: &'a Catalog,
    similarity: S,
    config: GeocoderConfig,
}

impl<'a> Geocoder<'a, PartialRatio> {
    pub fn new(catalog: &'a Catalog, config: GeocoderConfig) -> Self {
        Self::with_similarity(catalog, config, PartialRatio::default())
    }
}

impl<'a, S: Similarity> Geocoder<'a, S> {
    pub fn with_similarity(catalog: &'a Catalog, config: GeocoderConfig, similarity: S) -> Self {
        Self { catalog, similarity, config }
    }

    pub fn config(&self) -> &GeocoderConfig {
        &self.config
    }

    /// Resolve one location string.
    ///
    /// `None` or blank text returns `None` without scanning the catalog.
    ///
    /// ```rust
    /// use trail_matcher::{Catalog, Shelter, ShelterType, Geocoder, GeocoderConfig};
    ///
    /// let catalog = Catalog::from_shelters(vec![Shelter {
    ///     id: 1,
    ///     name: "Springer Mtn Shelter".into(),
    ///     latitude: 34.627,
    ///     longitude: -84.194,
    ///     shelter_type: ShelterType::Shelter,
    ///     dataset_origin: "ATC".into(),
    /// }]);
    /// let geocoder = Geocoder::new(&catalog, GeocoderConfig::default());
    ///
    /// let found = geocoder.resolve(Some("springer mountain shelter")).unwrap();
    /// assert_eq!(found.shelter_id, 1);
    /// assert!(geocoder.resolve(None).is_none());
    /// ```
    pub fn resolve(&self, text: Option<&str>) -> Option<GeocodeMatch> {
        self.lookup(text).matched()
    }

    /// Resolve one location string, keeping the best score when it misses the threshold.
    ///
    /// ```rust
    /// use trail_matcher::{Catalog, Shelter, ShelterType, Geocoder, GeocoderConfig};
    ///
    /// let catalog = Catalog::from_shelters(vec![Shelter {
    ///     id: 1,
    ///     name: "Hawk Mountain Shelter".into(),
    ///     latitude: 34.666,
    ///     longitude: -84.137,
    ///     shelter_type: ShelterType::Shelter,
    ///     dataset_origin: "ATC".into(),
    /// }]);
    /// let geocoder = Geocoder::new(&catalog, GeocoderConfig::default());
    ///
    /// let near_miss = geocoder.lookup(Some("Hawk Mtn Gap"));
    /// assert_eq!(near_miss.shelter_id, None);
    /// assert!(near_miss.score > 0 && near_miss.score < 90);
    /// ```
    pub fn lookup(&self, text: Option<&str>) -> Resolution {
        let Some(text) = text.filter(|t| !t.trim().is_empty()) else {
            return Resolution::default();
        };
        match self.scan(text, None) {
            Some(best) => Resolution {
                shelter_id: self.accept(best).map(|m| m.shelter_id),
                score: best.score,
            },
            None => Resolution::default(),
        }
    }

    /// Like [`resolve`](Self::resolve), also reporting the top three score bands.
    pub fn resolve_ranked(&self, text: Option<&str>) -> RankedMatches {
        let Some(text) = text.filter(|t| !t.trim().is_empty()) else {
            return RankedMatches::default();
        };

        let mut bands: Vec<ScoreBand> = Vec::with_capacity(4);
        let best = self.scan(text, Some(&mut bands)).and_then(|m| self.accept(m));
        RankedMatches { best, bands }
    }

    /// Highest-scoring shelter regardless of threshold; ties go to the later shelter.
    /// Fills `bands` on the same pass when given.
    fn scan(&self, text: &str, mut bands: Option<&mut Vec<ScoreBand>>) -> Option<GeocodeMatch> {
        let mut best: Option<GeocodeMatch> = None;
        for shelter in self.catalog.iter() {
            let score = self.similarity.score(text, &shelter.name);
            if best.map_or(true, |b| score >= b.score) {
                best = Some(GeocodeMatch { shelter_id: shelter.id, score });
            }
            if let Some(bands) = bands.as_deref_mut() {
                record_band(bands, ScoreBand { score, shelter_id: shelter.id });
            }
        }
        best
    }

    fn accept(&self, best: GeocodeMatch) -> Option<GeocodeMatch> {
        (best.score >= self.config.threshold).then_some(best)
    }

    fn location_for(&self, m: GeocodeMatch) -> Option<LocationMatch> {
        self.catalog.get(m.shelter_id).map(LocationMatch::from_shelter)
    }

    /// Geocode both locations of one entry. Returns `None` when neither resolves.
    pub fn geocode_entry(&self, entry: &RawJournalEntry) -> Option<JournalEntry> {
        self.validated_entry(
            entry,
            self.resolve(entry.start_loc.as_deref()),
            self.resolve(entry.dest.as_deref()),
        )
    }

    fn validated_entry(
        &self,
        entry: &RawJournalEntry,
        start: Option<GeocodeMatch>,
        dest: Option<GeocodeMatch>,
    ) -> Option<JournalEntry> {
        let start_loc = start.and_then(|m| self.location_for(m));
        let dest = dest.and_then(|m| self.location_for(m));

        if start_loc.is_none() && dest.is_none() {
            return None;
        }

        Some(JournalEntry {
            entry_num: entry.entry_num,
            date: entry.date.clone(),
            trip_mileage: entry.trip_mileage,
            start_loc,
            dest,
        })
    }

    /// Geocode a whole hiker. The self-reported direction is dropped.
    pub fn geocode_hiker(&self, raw: &RawHiker) -> (Hiker, GeocodeReport) {
        let mut report = GeocodeReport::new(raw.id);
        let mut journal = BTreeMap::new();

        if raw.direction.is_some() {
            debug!("[Geocoder] Hiker {}: discarding self-reported direction", raw.id);
        }

        for (&entry_num, entry) in &raw.journal {
            let validated = if self.config.keep_ranked {
                let start = self.resolve_ranked(entry.start_loc.as_deref());
                let dest = self.resolve_ranked(entry.dest.as_deref());
                let validated = self.validated_entry(entry, start.best, dest.best);
                report.ranked.insert(entry_num, (start, dest));
                validated
            } else {
                self.geocode_entry(entry)
            };

            match validated {
                Some(validated) => {
                    if validated.start_loc.is_none() {
                        report.note_unmatched_start(entry_num, entry.start_loc.as_deref());
                    }
                    if validated.dest.is_none() {
                        report.note_unmatched_dest(entry_num, entry.dest.as_deref());
                    }
                    journal.insert(entry_num, validated);
                }
                None => {
                    debug!("[Geocoder] Hiker {}: entry {} dropped, no location matched", raw.id, entry_num);
                    report.note_unmatched_start(entry_num, entry.start_loc.as_deref());
                    report.note_unmatched_dest(entry_num, entry.dest.as_deref());
                    report.num_dropped += 1;
                }
            }
        }

        report.num_validated = journal.len();

        let hiker = Hiker {
            id: raw.id,
            name: raw.name.clone(),
            journal,
            direction: None,
        };
        (hiker, report)
    }
}

/// Insert into the top-three distinct score bands, later shelters overwriting equal scores.
fn record_band(bands: &mut Vec<ScoreBand>, band: ScoreBand) {
    if let Some(existing) = bands.iter_mut().find(|b| b.score == band.score) {
        existing.shelter_id = band.shelter_id;
        return;
    }
    bands.push(band);
    bands.sort_by(|a, b| b.score.cmp(&a.score));
    bands.truncate(3);
}

// ============================================================================
// Statistics
// ============================================================================

/// Per-hiker geocoding outcome.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeocodeReport {
    pub hiker_id: u64,
    /// Start texts that failed to resolve, by entry number
    pub unmatched_start: BTreeMap<u32, String>,
    /// Destination texts that failed to resolve, by entry number
    pub unmatched_dest: BTreeMap<u32, String>,
    /// Entries kept in the validated journal
    pub num_validated: usize,
    /// Entries dropped because neither location resolved
    pub num_dropped: usize,
    /// Top-three bands per entry (start, dest); only filled with `keep_ranked`
    pub ranked: BTreeMap<u32, (RankedMatches, RankedMatches)>,
}

impl GeocodeReport {
    fn new(hiker_id: u64) -> Self {
        Self { hiker_id, ..Self::default() }
    }

    // Missing text is not a failed lookup, so only present text is recorded.
    fn note_unmatched_start(&mut self, entry_num: u32, text: Option<&str>) {
        if let Some(text) = text {
            self.unmatched_start.insert(entry_num, text.to_string());
        }
    }

    fn note_unmatched_dest(&mut self, entry_num: u32, text: Option<&str>) {
        if let Some(text) = text {
            self.unmatched_dest.insert(entry_num, text.to_string());
        }
    }

    /// Failed start plus failed destination lookups.
    pub fn num_unvalidated(&self) -> usize {
        self.unmatched_start.len() + self.unmatched_dest.len()
    }
}

/// Corpus-wide geocoding statistics.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeocodeSummary {
    pub num_valid_start: usize,
    pub num_valid_dest: usize,
    pub num_unvalid_start: usize,
    pub num_unvalid_dest: usize,
    /// How often each unresolved start text occurred
    pub frequency_start: BTreeMap<String, usize>,
    /// How often each unresolved destination text occurred
    pub frequency_dest: BTreeMap<String, usize>,
}

impl GeocodeSummary {
    pub fn from_results<'h>(
        hikers: impl IntoIterator<Item = &'h Hiker>,
        reports: impl IntoIterator<Item = &'h GeocodeReport>,
    ) -> Self {
        let mut summary = Self::default();

        for hiker in hikers {
            for entry in hiker.journal.values() {
                if entry.start_loc.is_some() {
                    summary.num_valid_start += 1;
                }
                if entry.dest.is_some() {
                    summary.num_valid_dest += 1;
                }
            }
        }

        for report in reports {
            summary.num_unvalid_start += report.unmatched_start.len();
            summary.num_unvalid_dest += report.unmatched_dest.len();
            for text in report.unmatched_start.values() {
                *summary.frequency_start.entry(text.clone()).or_default() += 1;
            }
            for text in report.unmatched_dest.values() {
                *summary.frequency_dest.entry(text.clone()).or_default() += 1;
            }
        }

        info!(
            "[Geocoder] valid start={} dest={}, unresolved start={} dest={}",
            summary.num_valid_start,
            summary.num_valid_dest,
            summary.num_unvalid_start,
            summary.num_unvalid_dest
        );
        summary
    }
}
