//! # Trail Matcher
//!
//! Geospatial matching and sequencing for long-distance trail journals.
//!
//! This library turns free-text hiker journals and a messy, duplicate-laden shelter
//! list into a consistent dataset:
//! - **Gazetteer** - dedup raw shelter records into a canonical, id-stable [`Catalog`]
//! - **Geocoder** - resolve journal location text to catalog shelters by fuzzy match
//! - **Sequencer** - order raw trail centerline points into a south-to-north path
//! - **Direction** - infer per-entry and per-hiker direction of travel
//!
//! ## Features
//!
//! - **`serde`** (default) - deserialize raw hiker journals, serialize annotated output
//! - **`parallel`** - process hikers in parallel with rayon
//! - **`full`** - enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use trail_matcher::{
//!     gazetteer::RawShelterRecord, pipeline::{Pipeline, PipelineConfig},
//!     RawHiker, RawJournalEntry, HikerDirection,
//! };
//!
//! let shelters = vec![
//!     RawShelterRecord::new("Springer Mountain Shelter", "ATC", 34.627, -84.194, "shelter"),
//!     RawShelterRecord::new("Hawk Mountain Shelter", "ATC", 34.666, -84.137, "shelter"),
//!     RawShelterRecord::new("Gooch Mountain Shelter", "ATC", 34.652, -84.039, "shelter"),
//! ];
//! let pipeline = Pipeline::from_raw_shelters(&shelters, PipelineConfig::default());
//!
//! let hiker = RawHiker::new(7, "Wanderer", vec![
//!     RawJournalEntry::new(1, "Sunday March 6 2016", 0.0, Some("Springer Mtn"), Some("Hawk Mountain")),
//!     RawJournalEntry::new(2, "Monday March 7 2016", 8.1, Some("Hawk Mountain"), Some("Gooch Mountain")),
//!     RawJournalEntry::new(3, "Tuesday March 8 2016", 15.8, Some("Gooch Mtn Shelter"), None),
//! ]);
//!
//! let output = pipeline.run(&[hiker]);
//! assert_eq!(output.hikers[0].direction, Some(HikerDirection::North));
//! ```

use std::collections::BTreeMap;

pub mod geo_utils;
pub mod similarity;
pub use similarity::{PartialRatio, Similarity};

// Canonical shelter catalog construction
pub mod gazetteer;
pub use gazetteer::{Catalog, GazetteerConfig, RawShelterRecord};

// Free text -> shelter resolution
pub mod geocoder;
pub use geocoder::{GeocodeMatch, GeocodeReport, GeocodeSummary, Geocoder, GeocoderConfig, Resolution};

// Centerline ordering
pub mod sequencer;
pub use sequencer::{sequence, SequenceError, SOUTHERN_TERMINUS};

// Direction of travel inference
pub mod direction;
pub use direction::{
    classify_hiker, ClassifierConfig, ClassifyError, DirectionStrategy, DirectionTally,
    LocationAnchor,
};

// Dates, thru-hiker extraction and per-entry deltas
pub mod journal;
pub use journal::{JournalConfig, JournalError};

pub mod records;
pub use records::RecordError;

pub mod pipeline;
pub use pipeline::{Pipeline, PipelineConfig, PipelineOutput};

// ============================================================================
// Core Types
// ============================================================================

/// A coordinate with latitude and longitude in decimal degrees.
///
/// # Example
/// ```
/// use trail_matcher::TrailPoint;
/// let springer = TrailPoint::new(34.6267, -84.1938);
/// assert!(springer.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrailPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl TrailPoint {
    /// Create a new point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Kind of overnight location in the gazetteer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ShelterType {
    Shelter,
    Hostel,
    Other,
}

impl ShelterType {
    /// Parse a free-form type column; anything unrecognized is `Other`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "shelter" | "lean-to" => ShelterType::Shelter,
            "hostel" => ShelterType::Hostel,
            _ => ShelterType::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ShelterType::Shelter => "shelter",
            ShelterType::Hostel => "hostel",
            ShelterType::Other => "other",
        }
    }
}

/// A canonical gazetteer entry. Created once by the gazetteer builder and never
/// mutated; everything downstream refers to it by `id`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Shelter {
    /// Stable, sequential, unique identifier
    pub id: u32,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub shelter_type: ShelterType,
    /// Which source dataset the record was accepted from
    pub dataset_origin: String,
}

impl Shelter {
    pub fn location(&self) -> TrailPoint {
        TrailPoint::new(self.latitude, self.longitude)
    }
}

/// Direction label assigned to a single journal entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EntryDirection {
    #[cfg_attr(feature = "serde", serde(rename = "N"))]
    North,
    #[cfg_attr(feature = "serde", serde(rename = "S"))]
    South,
    /// Bearing fell in an East or West sector
    #[cfg_attr(feature = "serde", serde(rename = "unknown"))]
    Unknown,
    /// No predecessor, or no movement between shelters
    #[cfg_attr(feature = "serde", serde(rename = "UD"))]
    Undetermined,
}

impl EntryDirection {
    /// Short label, as used in LOCDIR composites.
    pub fn label(&self) -> &'static str {
        match self {
            EntryDirection::North => "N",
            EntryDirection::South => "S",
            EntryDirection::Unknown => "unknown",
            EntryDirection::Undetermined => "UD",
        }
    }
}

impl std::fmt::Display for EntryDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Majority direction of a whole hiker journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HikerDirection {
    #[cfg_attr(feature = "serde", serde(rename = "N"))]
    North,
    #[cfg_attr(feature = "serde", serde(rename = "S"))]
    South,
    #[cfg_attr(feature = "serde", serde(rename = "UD"))]
    Undetermined,
}

/// A journal location resolved to a catalog shelter.
///
/// Shelter fields are copied from the catalog at geocoding time; `direction` is
/// only ever set by the direction classifier.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LocationMatch {
    pub shelter_id: u32,
    pub shelter_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub shelter_type: ShelterType,
    pub direction: Option<EntryDirection>,
}

impl LocationMatch {
    pub fn from_shelter(shelter: &Shelter) -> Self {
        Self {
            shelter_id: shelter.id,
            shelter_name: shelter.name.clone(),
            latitude: shelter.latitude,
            longitude: shelter.longitude,
            shelter_type: shelter.shelter_type,
            direction: None,
        }
    }

    pub fn location(&self) -> TrailPoint {
        TrailPoint::new(self.latitude, self.longitude)
    }
}

/// A journal entry as scraped, before geocoding.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawJournalEntry {
    /// Ordering key; filled from the journal map key when deserializing
    #[cfg_attr(feature = "serde", serde(default))]
    pub entry_num: u32,
    pub date: String,
    pub trip_mileage: f64,
    pub start_loc: Option<String>,
    pub dest: Option<String>,
}

impl RawJournalEntry {
    pub fn new(
        entry_num: u32,
        date: &str,
        trip_mileage: f64,
        start_loc: Option<&str>,
        dest: Option<&str>,
    ) -> Self {
        Self {
            entry_num,
            date: date.to_string(),
            trip_mileage,
            start_loc: start_loc.map(str::to_string),
            dest: dest.map(str::to_string),
        }
    }
}

/// A hiker as scraped, before geocoding.
///
/// `direction` is the self-reported direction from the source site. It is kept only
/// so it can be explicitly discarded; nothing downstream reads it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawHiker {
    #[cfg_attr(feature = "serde", serde(rename = "identifier"))]
    pub id: u64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub name: String,
    pub journal: BTreeMap<u32, RawJournalEntry>,
    #[cfg_attr(feature = "serde", serde(rename = "dir", default))]
    pub direction: Option<String>,
}

impl RawHiker {
    pub fn new(id: u64, name: &str, entries: Vec<RawJournalEntry>) -> Self {
        Self {
            id,
            name: name.to_string(),
            journal: entries.into_iter().map(|e| (e.entry_num, e)).collect(),
            direction: None,
        }
    }

    /// Parse a hiker from its JSON record. Journal keys are entry numbers.
    ///
    /// ```
    /// use trail_matcher::RawHiker;
    ///
    /// let json = r#"{
    ///     "identifier": 42,
    ///     "name": "Sunshine",
    ///     "dir": "North",
    ///     "journal": {
    ///         "3": {"date": "Tuesday, March 8, 2016", "trip_mileage": 15.8,
    ///               "start_loc": "Gooch Mountain Shelter", "dest": null}
    ///     }
    /// }"#;
    /// let hiker = RawHiker::from_json(json).unwrap();
    /// assert_eq!(hiker.journal[&3].entry_num, 3);
    /// ```
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let mut hiker: RawHiker = serde_json::from_str(json)?;
        for (entry_num, entry) in hiker.journal.iter_mut() {
            entry.entry_num = *entry_num;
        }
        Ok(hiker)
    }
}

/// A geocoded journal entry. At least one of `start_loc` / `dest` is set.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JournalEntry {
    pub entry_num: u32,
    pub date: String,
    pub trip_mileage: f64,
    pub start_loc: Option<LocationMatch>,
    pub dest: Option<LocationMatch>,
}

/// A hiker with a validated journal, ordered by entry number.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Hiker {
    pub id: u64,
    pub name: String,
    pub journal: BTreeMap<u32, JournalEntry>,
    /// Set only by the direction classifier
    pub direction: Option<HikerDirection>,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trail_point_validation() {
        assert!(TrailPoint::new(34.6267, -84.1938).is_valid());
        assert!(!TrailPoint::new(91.0, 0.0).is_valid());
        assert!(!TrailPoint::new(0.0, 181.0).is_valid());
        assert!(!TrailPoint::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_shelter_type_parse() {
        assert_eq!(ShelterType::parse("Shelter"), ShelterType::Shelter);
        assert_eq!(ShelterType::parse(" hostel\r"), ShelterType::Hostel);
        assert_eq!(ShelterType::parse("campsite"), ShelterType::Other);
    }

    #[test]
    fn test_raw_hiker_orders_by_entry_num() {
        let hiker = RawHiker::new(1, "Slowpoke", vec![
            RawJournalEntry::new(10, "Monday March 7 2016", 8.1, Some("Hawk"), None),
            RawJournalEntry::new(2, "Sunday March 6 2016", 0.0, Some("Springer"), None),
        ]);
        let keys: Vec<u32> = hiker.journal.keys().copied().collect();
        assert_eq!(keys, vec![2, 10]);
    }

    #[test]
    fn test_entry_direction_labels() {
        assert_eq!(EntryDirection::North.label(), "N");
        assert_eq!(EntryDirection::Undetermined.to_string(), "UD");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_raw_hiker_from_json() {
        let json = r#"{
            "identifier": 9,
            "dir": "South",
            "journal": {
                "12": {"date": "Monday March 7 2016", "trip_mileage": 8.1,
                       "start_loc": "Hawk Mountain Shelter", "dest": "Gooch Gap"},
                "4": {"date": "Sunday March 6 2016", "trip_mileage": 0.0,
                      "start_loc": null, "dest": "Hawk Mountain Shelter"}
            }
        }"#;
        let hiker = RawHiker::from_json(json).unwrap();
        assert_eq!(hiker.id, 9);
        assert_eq!(hiker.direction.as_deref(), Some("South"));
        assert_eq!(hiker.journal.keys().copied().collect::<Vec<_>>(), vec![4, 12]);
        assert_eq!(hiker.journal[&12].entry_num, 12);
        assert!(hiker.journal[&4].start_loc.is_none());
    }
}
