//! Direction-of-travel inference for geocoded journals.
//!
//! Each entry is labeled from the pair (previous anchored entry, this entry), walking
//! the journal in ascending entry number. The first anchored entry has no predecessor
//! and is `Undetermined`. Two rules are available and they can disagree on the same
//! journal:
//!
//! - [`DirectionStrategy::IndexDelta`] compares catalog ids. Catalog ids increase
//!   roughly south to north, so a higher next id means northbound.
//! - [`DirectionStrategy::Bearing`] maps the initial compass bearing between the two
//!   shelters into a 45° sector and keeps only its North/South component.
//!
//! [`compare_strategies`] runs both and reports where they differ instead of picking
//! one. A hiker's direction is the majority of `N` vs `S` entry labels; a tie is
//! `Undetermined`.

use std::collections::BTreeMap;

use log::{debug, warn};
use thiserror::Error;

use crate::geo_utils::{initial_bearing, CompassSector};
use crate::{EntryDirection, Hiker, HikerDirection, JournalEntry, LocationMatch};

/// Errors that can occur while classifying a hiker.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClassifyError {
    #[error("Hiker {hiker_id}: {matched_entries} anchored entries, need at least 2 to infer direction")]
    DegenerateJournal { hiker_id: u64, matched_entries: usize },
}

/// Which location of each entry drives classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LocationAnchor {
    #[default]
    Start,
    Dest,
}

impl LocationAnchor {
    fn of<'e>(&self, entry: &'e JournalEntry) -> Option<&'e LocationMatch> {
        match self {
            LocationAnchor::Start => entry.start_loc.as_ref(),
            LocationAnchor::Dest => entry.dest.as_ref(),
        }
    }

    fn of_mut<'e>(&self, entry: &'e mut JournalEntry) -> Option<&'e mut LocationMatch> {
        match self {
            LocationAnchor::Start => entry.start_loc.as_mut(),
            LocationAnchor::Dest => entry.dest.as_mut(),
        }
    }
}

/// A rule labeling movement from one matched shelter to the next.
pub trait DirectionRule {
    fn label(&self, from: &LocationMatch, to: &LocationMatch) -> EntryDirection;
}

/// Compare catalog ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexDelta;

impl DirectionRule for IndexDelta {
    fn label(&self, from: &LocationMatch, to: &LocationMatch) -> EntryDirection {
        use std::cmp::Ordering;
        match to.shelter_id.cmp(&from.shelter_id) {
            Ordering::Less => EntryDirection::South,
            Ordering::Greater => EntryDirection::North,
            Ordering::Equal => EntryDirection::Undetermined,
        }
    }
}

/// Compass sector of the initial bearing, collapsed to N / S / unknown.
#[derive(Debug, Clone, Copy, Default)]
pub struct BearingSector;

impl DirectionRule for BearingSector {
    /// Identical points give atan2(0, 0) = 0°, which lands in the North sector.
    fn label(&self, from: &LocationMatch, to: &LocationMatch) -> EntryDirection {
        sector_direction(CompassSector::from_bearing(initial_bearing(&from.location(), &to.location())))
    }
}

/// Collapse a sector to a binary label by its name: anything containing "North" is
/// `N`, "South" is `S`, pure East/West is `unknown`.
pub fn sector_direction(sector: CompassSector) -> EntryDirection {
    let name = sector.name();
    if name.contains("North") {
        EntryDirection::North
    } else if name.contains("South") {
        EntryDirection::South
    } else {
        EntryDirection::Unknown
    }
}

/// Selectable direction rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DirectionStrategy {
    #[default]
    IndexDelta,
    Bearing,
}

impl DirectionRule for DirectionStrategy {
    fn label(&self, from: &LocationMatch, to: &LocationMatch) -> EntryDirection {
        match self {
            DirectionStrategy::IndexDelta => IndexDelta.label(from, to),
            DirectionStrategy::Bearing => BearingSector.label(from, to),
        }
    }
}

/// Configuration for the classifier stage.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClassifierConfig {
    /// Default: IndexDelta
    pub strategy: DirectionStrategy,
    /// Default: Start
    pub anchor: LocationAnchor,
}

/// Label a sequence of matched shelters, already in journal order.
///
/// ```rust
/// use trail_matcher::{EntryDirection::*, LocationMatch, ShelterType};
/// use trail_matcher::direction::{label_sequence, IndexDelta};
///
/// let at = |id: u32| LocationMatch {
///     shelter_id: id, shelter_name: format!("#{id}"), latitude: 35.0, longitude: -84.0,
///     shelter_type: ShelterType::Shelter, direction: None,
/// };
/// let stops = [at(5), at(3), at(3), at(8)];
/// let refs: Vec<&LocationMatch> = stops.iter().collect();
/// assert_eq!(label_sequence(&refs, &IndexDelta), vec![Undetermined, South, Undetermined, North]);
/// ```
pub fn label_sequence<R: DirectionRule + ?Sized>(stops: &[&LocationMatch], rule: &R) -> Vec<EntryDirection> {
    let mut labels = Vec::with_capacity(stops.len());
    if stops.is_empty() {
        return labels;
    }
    labels.push(EntryDirection::Undetermined);
    labels.extend(stops.windows(2).map(|w| rule.label(w[0], w[1])));
    labels
}

/// Count of entry labels across a journal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DirectionTally {
    pub north: usize,
    pub south: usize,
    pub unknown: usize,
    pub undetermined: usize,
}

impl DirectionTally {
    pub fn from_labels<'a>(labels: impl IntoIterator<Item = &'a EntryDirection>) -> Self {
        let mut tally = Self::default();
        for label in labels {
            match label {
                EntryDirection::North => tally.north += 1,
                EntryDirection::South => tally.south += 1,
                EntryDirection::Unknown => tally.unknown += 1,
                EntryDirection::Undetermined => tally.undetermined += 1,
            }
        }
        tally
    }

    /// Majority of N vs S; exact tie (including 0-0) is undetermined.
    pub fn verdict(&self) -> HikerDirection {
        use std::cmp::Ordering;
        match self.north.cmp(&self.south) {
            Ordering::Greater => HikerDirection::North,
            Ordering::Less => HikerDirection::South,
            Ordering::Equal => HikerDirection::Undetermined,
        }
    }
}

/// Classify a geocoded hiker, returning a new direction-annotated hiker.
///
/// Every validated entry is kept. Only entries carrying the anchor location take part
/// in labeling; the others keep `direction: None`. Any direction already present on
/// either location is cleared before labels are written to the anchor location.
/// Fewer than two anchored entries is a [`ClassifyError::DegenerateJournal`].
pub fn classify_hiker(hiker: &Hiker, config: &ClassifierConfig) -> Result<Hiker, ClassifyError> {
    let labels = journal_labels(hiker, config.anchor, &config.strategy)?;

    let mut journal = BTreeMap::new();
    for (&entry_num, original) in &hiker.journal {
        let mut entry = original.clone();
        for loc in [entry.start_loc.as_mut(), entry.dest.as_mut()].into_iter().flatten() {
            loc.direction = None;
        }
        if let (Some(anchor), Some(label)) = (config.anchor.of_mut(&mut entry), labels.get(&entry_num)) {
            anchor.direction = Some(*label);
        }
        journal.insert(entry_num, entry);
    }

    let tally = DirectionTally::from_labels(labels.values());
    let direction = tally.verdict();
    debug!(
        "[Direction] Hiker {}: N={} S={} -> {:?} ({:?})",
        hiker.id, tally.north, tally.south, direction, config.strategy
    );

    Ok(Hiker {
        id: hiker.id,
        name: hiker.name.clone(),
        journal,
        direction: Some(direction),
    })
}

/// Labels keyed by entry number for entries carrying the anchor location.
fn journal_labels<R: DirectionRule + ?Sized>(
    hiker: &Hiker,
    anchor: LocationAnchor,
    rule: &R,
) -> Result<BTreeMap<u32, EntryDirection>, ClassifyError> {
    let anchored: Vec<(u32, &LocationMatch)> = hiker
        .journal
        .iter()
        .filter_map(|(&num, entry)| anchor.of(entry).map(|loc| (num, loc)))
        .collect();

    if anchored.len() < 2 {
        return Err(ClassifyError::DegenerateJournal {
            hiker_id: hiker.id,
            matched_entries: anchored.len(),
        });
    }

    let stops: Vec<&LocationMatch> = anchored.iter().map(|(_, loc)| *loc).collect();
    let labels = label_sequence(&stops, rule);

    Ok(anchored.iter().map(|(num, _)| *num).zip(labels).collect())
}

/// Where the two strategies disagree on one hiker.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StrategyDivergence {
    pub hiker_id: u64,
    /// (entry number, index-delta label, bearing label) for differing entries
    pub differing_entries: Vec<(u32, EntryDirection, EntryDirection)>,
    pub index_delta_verdict: HikerDirection,
    pub bearing_verdict: HikerDirection,
}

impl StrategyDivergence {
    pub fn verdicts_agree(&self) -> bool {
        self.index_delta_verdict == self.bearing_verdict
    }
}

/// Run both strategies over the same journal and report every disagreement.
pub fn compare_strategies(hiker: &Hiker, anchor: LocationAnchor) -> Result<StrategyDivergence, ClassifyError> {
    let by_index = journal_labels(hiker, anchor, &IndexDelta)?;
    let by_bearing = journal_labels(hiker, anchor, &BearingSector)?;

    let differing_entries = by_index
        .iter()
        .filter_map(|(num, a)| {
            let b = by_bearing.get(num)?;
            (a != b).then_some((*num, *a, *b))
        })
        .collect();

    let divergence = StrategyDivergence {
        hiker_id: hiker.id,
        differing_entries,
        index_delta_verdict: DirectionTally::from_labels(by_index.values()).verdict(),
        bearing_verdict: DirectionTally::from_labels(by_bearing.values()).verdict(),
    };

    if !divergence.verdicts_agree() {
        warn!(
            "[Direction] Hiker {}: index-delta says {:?}, bearing says {:?}",
            hiker.id, divergence.index_delta_verdict, divergence.bearing_verdict
        );
    }
    Ok(divergence)
}

/// Hiker ids split by inferred direction. Unclassified hikers count as undetermined.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DirectionPartition {
    pub northbound: Vec<u64>,
    pub southbound: Vec<u64>,
    pub undetermined: Vec<u64>,
}

pub fn partition_by_direction<'h>(hikers: impl IntoIterator<Item = &'h Hiker>) -> DirectionPartition {
    let mut partition = DirectionPartition::default();
    for hiker in hikers {
        match hiker.direction {
            Some(HikerDirection::North) => partition.northbound.push(hiker.id),
            Some(HikerDirection::South) => partition.southbound.push(hiker.id),
            _ => partition.undetermined.push(hiker.id),
        }
    }
    partition
}
