//! Greedy nearest-neighbor ordering of trail centerline points.
//!
//! GIS centerline exports come as an unordered bag of coordinates. Starting from a
//! designated terminus, the sequencer repeatedly appends the unvisited point closest
//! (haversine) to the last appended point. There is no lookahead or backtracking, so
//! stretches where the trail doubles back near itself can come out locally zig-zagged.
//!
//! ## Example
//!
//! ```rust
//! use trail_matcher::{sequence, TrailPoint};
//!
//! let terminus = TrailPoint::new(34.6267, -84.1938);
//! let points = vec![
//!     TrailPoint::new(34.80, -84.05),
//!     terminus,
//!     TrailPoint::new(34.70, -84.10),
//! ];
//!
//! let ordered = sequence(&points, terminus).unwrap();
//! assert_eq!(ordered, vec![terminus, TrailPoint::new(34.70, -84.10), TrailPoint::new(34.80, -84.05)]);
//! ```

use std::time::Instant;

use log::{debug, info};
use thiserror::Error;

use crate::geo_utils::haversine_distance;
use crate::TrailPoint;

/// Southern terminus of the Appalachian Trail as it appears in the centerline export.
pub const SOUTHERN_TERMINUS: TrailPoint = TrailPoint {
    latitude: 34.62669316200002,
    longitude: -84.19382841799994,
};

/// Errors that can occur while sequencing a centerline.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SequenceError {
    #[error("No centerline points to sequence")]
    EmptyInput,

    #[error("Terminus ({latitude}, {longitude}) not present in centerline points")]
    TerminusNotFound { latitude: f64, longitude: f64 },
}

/// Order `points` into a path starting at `terminus`.
///
/// `terminus` is located by exact coordinate equality; if it is absent the whole
/// operation fails and no partial ordering is returned. The output contains every
/// input point exactly once (duplicates included) with `terminus` first.
///
/// O(n²) distance evaluations. Exact distance ties go to the point seen first in
/// the remaining input order.
pub fn sequence(points: &[TrailPoint], terminus: TrailPoint) -> Result<Vec<TrailPoint>, SequenceError> {
    if points.is_empty() {
        return Err(SequenceError::EmptyInput);
    }

    let terminus_index = points
        .iter()
        .position(|p| *p == terminus)
        .ok_or(SequenceError::TerminusNotFound {
            latitude: terminus.latitude,
            longitude: terminus.longitude,
        })?;

    let start = Instant::now();
    let mut pool: Vec<TrailPoint> = points.to_vec();
    pool.remove(terminus_index);

    let mut ordered = Vec::with_capacity(points.len());
    ordered.push(terminus);
    let mut current = terminus;

    while let Some(index) = nearest_index(&pool, &current) {
        current = pool.remove(index);
        ordered.push(current);

        if ordered.len() % 10_000 == 0 {
            debug!("[Sequencer] {} / {} points ordered", ordered.len(), points.len());
        }
    }

    info!(
        "[Sequencer] Ordered {} centerline points in {:?}",
        ordered.len(),
        start.elapsed()
    );
    Ok(ordered)
}

/// Index of the pool point closest to `origin`; first-seen wins on exact ties.
pub fn nearest_index(pool: &[TrailPoint], origin: &TrailPoint) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, p) in pool.iter().enumerate() {
        let d = haversine_distance(origin, p);
        if best.map_or(true, |(_, best_d)| d < best_d) {
            best = Some((i, d));
        }
    }
    best.map(|(i, _)| i)
}
