//! End-to-end stage chain: Gazetteer Builder → Geocoder → Direction Classifier.
//!
//! The catalog is built once and then only read. Each hiker flows through the
//! geocoder and classifier independently, producing new values at every stage, so
//! hikers can be processed in any order (or in parallel with the `parallel` feature)
//! and the output is the same.
//!
//! Per-hiker failures do not stop a run. A hiker whose validated journal is too short
//! to classify stays in [`PipelineOutput::hikers`] with no direction, and its error is
//! listed in [`PipelineOutput::excluded`]. Unresolved location text is counted in the
//! geocode reports.

use std::time::Instant;

use log::{info, warn};

use crate::direction::{
    classify_hiker, compare_strategies, partition_by_direction, ClassifierConfig, ClassifyError,
    DirectionPartition, StrategyDivergence,
};
use crate::gazetteer::{build_with, Catalog, GazetteerConfig, RawShelterRecord};
use crate::geocoder::{GeocodeReport, GeocodeSummary, Geocoder, GeocoderConfig};
use crate::journal::JournalConfig;
use crate::similarity::{PartialRatio, Similarity};
use crate::{Hiker, RawHiker};

/// Configuration for every stage of a run.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PipelineConfig {
    pub gazetteer: GazetteerConfig,
    pub geocoder: GeocoderConfig,
    pub classifier: ClassifierConfig,
    /// Not used by the stages themselves; carried for journal statistics on the output.
    pub journal: JournalConfig,
}

/// One hiker after geocoding and classification.
#[derive(Debug, Clone, PartialEq)]
pub struct HikerRun {
    /// Validated journal before classification
    pub geocoded: Hiker,
    pub report: GeocodeReport,
    pub classified: Result<Hiker, ClassifyError>,
}

/// Result of a run over a hiker corpus, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    /// Every validated hiker. Those that could not be classified have `direction: None`.
    pub hikers: Vec<Hiker>,
    /// Why hikers were left out of direction-dependent aggregates
    pub excluded: Vec<ClassifyError>,
    pub reports: Vec<GeocodeReport>,
    pub geocode: GeocodeSummary,
}

impl PipelineOutput {
    /// Hiker ids split by verdict. Unclassified hikers count as undetermined.
    pub fn partition(&self) -> DirectionPartition {
        partition_by_direction(&self.hikers)
    }

    /// Run both direction strategies over every hiker with enough anchored entries.
    pub fn strategy_divergences(&self, config: &ClassifierConfig) -> Vec<StrategyDivergence> {
        self.hikers
            .iter()
            .filter_map(|h| compare_strategies(h, config.anchor).ok())
            .collect()
    }
}

/// A built catalog plus the configuration to run hikers against it.
///
/// # Example
/// ```rust
/// use trail_matcher::{Catalog, Pipeline, PipelineConfig, RawHiker, RawJournalEntry};
///
/// let pipeline = Pipeline::with_catalog(Catalog::default(), PipelineConfig::default());
/// let hiker = RawHiker::new(1, "Nobody", vec![
///     RawJournalEntry::new(1, "Sunday March 6 2016", 0.0, Some("Springer"), None),
/// ]);
/// let output = pipeline.run(&[hiker]);
/// assert_eq!(output.hikers.len(), 1);
/// assert_eq!(output.hikers[0].direction, None);
/// assert_eq!(output.excluded.len(), 1);
/// ```
pub struct Pipeline<S = PartialRatio> {
    catalog: Catalog,
    config: PipelineConfig,
    similarity: S,
}

impl Pipeline<PartialRatio> {
    /// Build the catalog from raw shelter records with the default scorer.
    pub fn from_raw_shelters(records: &[RawShelterRecord], config: PipelineConfig) -> Self {
        Self::with_similarity(records, config, PartialRatio::default())
    }

    /// Use an already-built catalog (e.g. one parsed with [`crate::records::parse_catalog`]).
    pub fn with_catalog(catalog: Catalog, config: PipelineConfig) -> Self {
        Self {
            catalog,
            config,
            similarity: PartialRatio::default(),
        }
    }
}

impl<S: Similarity> Pipeline<S> {
    /// Build the catalog and geocode with a custom scorer.
    pub fn with_similarity(records: &[RawShelterRecord], config: PipelineConfig, similarity: S) -> Self {
        let start = Instant::now();
        let catalog = build_with(records, &config.gazetteer, &similarity);
        info!("[Pipeline] Catalog of {} shelters built in {:?}", catalog.len(), start.elapsed());
        Self { catalog, config, similarity }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn geocoder(&self) -> Geocoder<'_, Shared<'_, S>> {
        Geocoder::with_similarity(&self.catalog, self.config.geocoder.clone(), Shared(&self.similarity))
    }

    /// Geocode and classify a single hiker.
    pub fn process_hiker(&self, raw: &RawHiker) -> HikerRun {
        let (geocoded, report) = self.geocoder().geocode_hiker(raw);
        let classified = classify_hiker(&geocoded, &self.config.classifier);
        HikerRun { geocoded, report, classified }
    }

    /// Process every hiker sequentially.
    pub fn run(&self, hikers: &[RawHiker]) -> PipelineOutput {
        let start = Instant::now();
        let runs: Vec<HikerRun> = hikers.iter().map(|h| self.process_hiker(h)).collect();
        let output = collect_output(runs);
        info!("[Pipeline] {} hikers processed in {:?}", hikers.len(), start.elapsed());
        output
    }

    /// Process hikers in parallel with rayon. Output order matches [`run`](Self::run).
    #[cfg(feature = "parallel")]
    pub fn run_parallel(&self, hikers: &[RawHiker]) -> PipelineOutput
    where
        S: Sync,
    {
        use rayon::prelude::*;

        let start = Instant::now();
        info!("[Pipeline] Using PARALLEL processing (rayon)");
        let runs: Vec<HikerRun> = hikers.par_iter().map(|h| self.process_hiker(h)).collect();
        let output = collect_output(runs);
        info!("[Pipeline] {} hikers processed in {:?}", hikers.len(), start.elapsed());
        output
    }
}

/// Lends the pipeline's scorer to a geocoder.
struct Shared<'s, S>(&'s S);

impl<S: Similarity> Similarity for Shared<'_, S> {
    fn score(&self, a: &str, b: &str) -> u8 {
        self.0.score(a, b)
    }
}

fn collect_output(runs: Vec<HikerRun>) -> PipelineOutput {
    let geocode = GeocodeSummary::from_results(runs.iter().map(|r| &r.geocoded), runs.iter().map(|r| &r.report));

    let mut hikers = Vec::with_capacity(runs.len());
    let mut excluded = Vec::new();
    let mut reports = Vec::with_capacity(runs.len());

    for run in runs {
        match run.classified {
            Ok(hiker) => hikers.push(hiker),
            Err(e) => {
                warn!("[Pipeline] Excluding from direction aggregates: {}", e);
                excluded.push(e);
                hikers.push(run.geocoded);
            }
        }
        reports.push(run.report);
    }

    info!("[Pipeline] {} classified, {} excluded", hikers.len() - excluded.len(), excluded.len());
    PipelineOutput {
        hikers,
        excluded,
        reports,
        geocode,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EntryDirection, HikerDirection, RawJournalEntry};

    fn shelters() -> Vec<RawShelterRecord> {
        vec![
            RawShelterRecord::new("Springer Mountain Shelter", "ATC", 34.627, -84.194, "shelter"),
            RawShelterRecord::new("Springer Mtn Shelter", "TNL", 34.627, -84.1936, "shelter"),
            RawShelterRecord::new("Hawk Mountain Shelter", "ATC", 34.666, -84.137, "shelter"),
            RawShelterRecord::new("Gooch Mountain Shelter", "ATC", 34.652, -84.039, "shelter"),
        ]
    }

    fn northbound(id: u64) -> RawHiker {
        RawHiker::new(id, "Northbound", vec![
            RawJournalEntry::new(1, "Sunday March 6 2016", 0.0, Some("Springer Mtn"), Some("Hawk Mountain")),
            RawJournalEntry::new(2, "Monday March 7 2016", 8.1, Some("Hawk Mountain"), Some("Gooch Mountain")),
            RawJournalEntry::new(3, "Tuesday March 8 2016", 15.8, Some("Gooch Mtn Shelter"), None),
        ])
    }

    fn southbound(id: u64) -> RawHiker {
        RawHiker::new(id, "Southbound", vec![
            RawJournalEntry::new(1, "Sunday March 6 2016", 0.0, Some("Gooch Mountain Shelter"), None),
            RawJournalEntry::new(2, "Monday March 7 2016", 7.7, Some("Hawk Mountain Shelter"), None),
            RawJournalEntry::new(3, "Tuesday March 8 2016", 15.8, Some("Springer Mountain Shelter"), None),
        ])
    }

    #[test]
    fn test_catalog_dedup_on_build() {
        let pipeline = Pipeline::from_raw_shelters(&shelters(), PipelineConfig::default());
        assert_eq!(pipeline.catalog().len(), 3);
    }

    #[test]
    fn test_run_classifies_both_directions() {
        let pipeline = Pipeline::from_raw_shelters(&shelters(), PipelineConfig::default());
        let output = pipeline.run(&[northbound(1), southbound(2)]);

        assert_eq!(output.hikers.len(), 2);
        assert_eq!(output.hikers[0].direction, Some(HikerDirection::North));
        assert_eq!(output.hikers[1].direction, Some(HikerDirection::South));

        let labels: Vec<Option<EntryDirection>> = output.hikers[0]
            .journal
            .values()
            .map(|e| e.start_loc.as_ref().and_then(|l| l.direction))
            .collect();
        assert_eq!(
            labels,
            vec![Some(EntryDirection::Undetermined), Some(EntryDirection::North), Some(EntryDirection::North)]
        );

        let partition = output.partition();
        assert_eq!(partition.northbound, vec![1]);
        assert_eq!(partition.southbound, vec![2]);
    }

    #[test]
    fn test_degenerate_hiker_kept_without_direction() {
        let pipeline = Pipeline::from_raw_shelters(&shelters(), PipelineConfig::default());
        let lost = RawHiker::new(3, "Lost", vec![
            RawJournalEntry::new(1, "Sunday March 6 2016", 0.0, Some("Springer Mountain"), None),
            RawJournalEntry::new(2, "Monday March 7 2016", 4.0, Some("Neels Gap"), None),
        ]);
        let output = pipeline.run(&[northbound(1), lost]);
        assert_eq!(output.hikers.len(), 2);
        assert_eq!(
            output.excluded,
            vec![ClassifyError::DegenerateJournal { hiker_id: 3, matched_entries: 1 }]
        );

        let kept = &output.hikers[1];
        assert_eq!(kept.id, 3);
        assert_eq!(kept.direction, None);
        assert_eq!(kept.journal.keys().copied().collect::<Vec<_>>(), vec![1]);
        assert_eq!(kept.journal[&1].start_loc.as_ref().map(|l| l.shelter_id), Some(1));

        let partition = output.partition();
        assert_eq!(partition.northbound, vec![1]);
        assert!(partition.southbound.is_empty());
        assert_eq!(partition.undetermined, vec![3]);
        assert_eq!(output.strategy_divergences(&pipeline.config().classifier).len(), 1);
        assert_eq!(output.reports.len(), 2);
        assert_eq!(output.geocode.frequency_start.get("Neels Gap"), Some(&1));
    }

    #[test]
    fn test_custom_similarity_threads_through() {
        let exact = |a: &str, b: &str| if a.eq_ignore_ascii_case(b) { 100 } else { 0 };
        let pipeline = Pipeline::with_similarity(&shelters(), PipelineConfig::default(), exact);
        // Exact matching keeps both Springer spellings
        assert_eq!(pipeline.catalog().len(), 4);
        let output = pipeline.run(&[southbound(1), northbound(2)]);
        assert_eq!(output.hikers[0].direction, Some(HikerDirection::South));
        assert_eq!(output.hikers[1].direction, None);
        assert_eq!(output.excluded.len(), 1);
    }

    #[test]
    fn test_strategy_divergences_agree_on_clean_journal() {
        let pipeline = Pipeline::from_raw_shelters(&shelters(), PipelineConfig::default());
        let output = pipeline.run(&[northbound(1)]);
        let divergences = output.strategy_divergences(&pipeline.config().classifier);
        assert_eq!(divergences.len(), 1);
        assert!(divergences[0].verdicts_agree());
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_matches_sequential() {
        let pipeline = Pipeline::from_raw_shelters(&shelters(), PipelineConfig::default());
        let hikers: Vec<RawHiker> = (0..20)
            .map(|i| if i % 2 == 0 { northbound(i) } else { southbound(i) })
            .collect();
        assert_eq!(pipeline.run(&hikers), pipeline.run_parallel(&hikers));
    }
}
