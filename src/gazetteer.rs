//! Gazetteer construction: dedup a raw shelter list into a canonical [`Catalog`].
//!
//! Raw shelter exports from different organizations list the same shelter several
//! times with slightly different names and coordinates. A candidate record is a
//! duplicate of an already-accepted shelter when both hold:
//!
//! 1. the fuzzy name score is at or above `similarity_threshold`, and
//! 2. the rounded latitude **or** the rounded longitude are equal.
//!
//! The OR in the second check is loose: two same-named shelters that
//! happen to share a rounded latitude merge even if they are far apart in longitude.
//!
//! Accepted records get sequential ids starting at `id_base`, in input order.

use std::collections::BTreeMap;

use log::{debug, info};

use crate::geo_utils::round_coordinate;
use crate::similarity::{PartialRatio, Similarity};
use crate::{Shelter, ShelterType};

/// Configuration for shelter deduplication.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GazetteerConfig {
    /// Minimum fuzzy name score (0-100) for two records to be name-duplicates.
    /// Default: 90
    pub similarity_threshold: u8,

    /// Id assigned to the first accepted shelter.
    /// Default: 1
    pub id_base: u32,

    /// Decimal places kept when comparing coordinates.
    /// Default: 3 (~110m of latitude)
    pub coordinate_decimals: u32,
}

impl Default for GazetteerConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 90,
            id_base: 1,
            coordinate_decimals: 3,
        }
    }
}

/// A shelter row as exported by one of the source datasets.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawShelterRecord {
    pub name: String,
    pub dataset: String,
    pub latitude: f64,
    pub longitude: f64,
    pub shelter_type: String,
}

impl RawShelterRecord {
    pub fn new(name: &str, dataset: &str, latitude: f64, longitude: f64, shelter_type: &str) -> Self {
        Self {
            name: name.to_string(),
            dataset: dataset.to_string(),
            latitude,
            longitude,
            shelter_type: shelter_type.to_string(),
        }
    }
}

/// Canonical, deduplicated shelters keyed by id.
///
/// Iteration is in ascending id order, which is also acceptance order. The geocoder's
/// tie-break depends on this order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    shelters: BTreeMap<u32, Shelter>,
}

impl Catalog {
    /// Build a catalog from already-canonical shelters (e.g. a previously exported
    /// catalog). Later shelters with a repeated id replace earlier ones.
    pub fn from_shelters(shelters: impl IntoIterator<Item = Shelter>) -> Self {
        Self {
            shelters: shelters.into_iter().map(|s| (s.id, s)).collect(),
        }
    }

    /// Dedup `records` with the default partial-ratio scorer.
    ///
    /// ```rust
    /// use trail_matcher::{Catalog, GazetteerConfig, RawShelterRecord};
    ///
    /// let records = vec![
    ///     RawShelterRecord::new("Mt. Collins Shelter", "ATC", 35.5953, -83.4688, "shelter"),
    ///     RawShelterRecord::new("Mount Collins Shelter", "TNL", 35.5951, -83.4701, "shelter"),
    ///     RawShelterRecord::new("Icewater Spring Shelter", "ATC", 35.6306, -83.3868, "shelter"),
    /// ];
    /// let catalog = Catalog::build(&records, &GazetteerConfig::default());
    ///
    /// assert_eq!(catalog.len(), 2);
    /// assert_eq!(catalog.get(1).unwrap().name, "Mount Collins Shelter");
    /// assert_eq!(catalog.get(2).unwrap().name, "Icewater Spring Shelter");
    /// ```
    pub fn build(records: &[RawShelterRecord], config: &GazetteerConfig) -> Self {
        build_with(records, config, &PartialRatio::default())
    }

    pub fn get(&self, id: u32) -> Option<&Shelter> {
        self.shelters.get(&id)
    }

    pub fn len(&self) -> usize {
        self.shelters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shelters.is_empty()
    }

    /// Shelters in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Shelter> {
        self.shelters.values()
    }

    /// Convert back into raw records, e.g. to re-run deduplication.
    pub fn to_raw_records(&self) -> Vec<RawShelterRecord> {
        self.iter()
            .map(|s| RawShelterRecord {
                name: s.name.clone(),
                dataset: s.dataset_origin.clone(),
                latitude: s.latitude,
                longitude: s.longitude,
                shelter_type: s.shelter_type.as_str().to_string(),
            })
            .collect()
    }
}

/// Expand the "Mt." abbreviation to "Mount" where it stands as its own word.
pub fn canonicalize_name(name: &str) -> String {
    name.trim()
        .split(' ')
        .map(|token| if token == "Mt." { "Mount" } else { token })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Dedup `records` using a caller-supplied similarity measure.
///
/// O(n·m) score evaluations, where m is the number of shelters accepted so far.
/// Empty input yields an empty catalog.
pub fn build_with<S: Similarity + ?Sized>(
    records: &[RawShelterRecord],
    config: &GazetteerConfig,
    similarity: &S,
) -> Catalog {
    let mut accepted: Vec<Shelter> = Vec::with_capacity(records.len());
    let mut next_id = config.id_base;
    let mut merged = 0usize;

    for record in records {
        let name = canonicalize_name(&record.name);

        let duplicate_of = accepted.iter().find(|existing| {
            similarity.score(&name, &existing.name) >= config.similarity_threshold
                && same_rounded_position(record, existing, config.coordinate_decimals)
        });

        if let Some(existing) = duplicate_of {
            debug!(
                "[Gazetteer] '{}' ({}) merged into #{} '{}'",
                name, record.dataset, existing.id, existing.name
            );
            merged += 1;
            continue;
        }

        accepted.push(Shelter {
            id: next_id,
            name,
            latitude: record.latitude,
            longitude: record.longitude,
            shelter_type: ShelterType::parse(&record.shelter_type),
            dataset_origin: record.dataset.clone(),
        });
        next_id += 1;
    }

    info!(
        "[Gazetteer] {} raw records -> {} shelters ({} duplicates merged)",
        records.len(),
        accepted.len(),
        merged
    );

    Catalog::from_shelters(accepted)
}

/// Rounded latitude OR rounded longitude equal.
fn same_rounded_position(record: &RawShelterRecord, shelter: &Shelter, decimals: u32) -> bool {
    round_coordinate(record.latitude, decimals) == round_coordinate(shelter.latitude, decimals)
        || round_coordinate(record.longitude, decimals) == round_coordinate(shelter.longitude, decimals)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, lat: f64, lon: f64) -> RawShelterRecord {
        RawShelterRecord::new(name, "ATC", lat, lon, "shelter")
    }

    #[test]
    fn test_empty_input() {
        let catalog = Catalog::build(&[], &GazetteerConfig::default());
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_first_record_always_accepted_with_base_id() {
        let config = GazetteerConfig { id_base: 100, ..GazetteerConfig::default() };
        let catalog = Catalog::build(&[record("Springer Mountain Shelter", 34.627, -84.194)], &config);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get(100).unwrap().name, "Springer Mountain Shelter");
    }

    #[test]
    fn test_sequential_ids() {
        let records = vec![
            record("Springer Mountain Shelter", 34.627, -84.194),
            record("Stover Creek Shelter", 34.647, -84.196),
            record("Hawk Mountain Shelter", 34.666, -84.137),
        ];
        let catalog = Catalog::build(&records, &GazetteerConfig::default());
        let ids: Vec<u32> = catalog.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_same_name_same_place_merged() {
        let records = vec![
            record("Hawk Mountain Shelter", 34.6661, -84.1369),
            RawShelterRecord::new("Hawk Mtn Shelter", "TNL", 34.6659, -84.1401, "Shelter"),
        ];
        let catalog = Catalog::build(&records, &GazetteerConfig::default());
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get(1).unwrap().dataset_origin, "ATC");
    }

    #[test]
    fn test_same_name_far_apart_kept() {
        let records = vec![
            record("Hawk Mountain Shelter", 34.666, -84.137),
            record("Hawk Mountain Shelter", 42.100, -73.500),
        ];
        let catalog = Catalog::build(&records, &GazetteerConfig::default());
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_or_condition_merges_on_latitude_alone() {
        // Rounded latitude matches, longitude is nowhere near: still merged.
        let records = vec![
            record("Rocky Gap Shelter", 37.250, -80.900),
            record("Rocky Gap Shelter", 37.250, -70.100),
        ];
        let catalog = Catalog::build(&records, &GazetteerConfig::default());
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_different_names_same_place_kept() {
        let records = vec![
            record("Stover Creek Shelter", 34.647, -84.196),
            record("Springer Mountain Shelter", 34.647, -84.196),
        ];
        let catalog = Catalog::build(&records, &GazetteerConfig::default());
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_mt_expanded_before_storage() {
        assert_eq!(canonicalize_name("Mt. Rogers Shelter "), "Mount Rogers Shelter");
        assert_eq!(canonicalize_name("Mount Rogers"), "Mount Rogers");
        assert_eq!(canonicalize_name("Top of Mt."), "Top of Mount");
    }

    #[test]
    fn test_mt_inside_a_word_is_left_alone() {
        assert_eq!(canonicalize_name("Mt.Rogers Shelter"), "Mt.Rogers Shelter");
        assert_eq!(canonicalize_name("Summt. Camp"), "Summt. Camp");
        assert_eq!(canonicalize_name("Mt.  Collins"), "Mount  Collins");
    }

    #[test]
    fn test_shelter_type_parsed() {
        let records = vec![RawShelterRecord::new("Fontana Hilton", "ATC", 35.45, -83.81, "Hostel")];
        let catalog = Catalog::build(&records, &GazetteerConfig::default());
        assert_eq!(catalog.get(1).unwrap().shelter_type, ShelterType::Hostel);
    }

    #[test]
    fn test_dedup_idempotent() {
        let records = vec![
            record("Mt. Collins Shelter", 35.5953, -83.4688),
            record("Mount Collins Shelter", 35.5951, -83.4701),
            record("Icewater Spring Shelter", 35.6306, -83.3868),
            record("Icewater Spring Shelter", 35.6312, -83.3868),
            record("Pecks Corner Shelter", 35.6502, -83.3053),
        ];
        let config = GazetteerConfig::default();
        let once = Catalog::build(&records, &config);
        let twice = Catalog::build(&once.to_raw_records(), &config);
        assert_eq!(once, twice);
        assert_eq!(once.len(), 3);
    }

    #[test]
    fn test_custom_similarity() {
        let exact = |a: &str, b: &str| if a == b { 100 } else { 0 };
        let records = vec![
            record("Hawk Mountain Shelter", 34.666, -84.137),
            record("Hawk Mtn Shelter", 34.666, -84.137),
        ];
        let catalog = build_with(&records, &GazetteerConfig::default(), &exact);
        assert_eq!(catalog.len(), 2);
    }
}
