//! # Geographic Utilities
//!
//! Spherical geometry shared by the sequencer and the bearing-based direction strategy.
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance`] | Great-circle distance between two points, in meters |
//! | [`initial_bearing`] | Initial compass bearing from one point to another, in `[0, 360)` |
//! | [`CompassSector::from_bearing`] | 45°-wide cardinal/intercardinal sector of a bearing |
//! | [`round_coordinate`] | Fixed-decimal rounding used by the gazetteer proximity check |
//!
//! ## Example
//!
//! ```rust
//! use trail_matcher::{TrailPoint, geo_utils};
//!
//! let springer = TrailPoint::new(34.6267, -84.1938);
//! let hawk = TrailPoint::new(34.6660, -84.1370);
//!
//! let meters = geo_utils::haversine_distance(&springer, &hawk);
//! assert!(meters > 5_000.0 && meters < 8_000.0);
//!
//! let bearing = geo_utils::initial_bearing(&springer, &hawk);
//! assert_eq!(geo_utils::CompassSector::from_bearing(bearing).name(), "Northeast");
//! ```
//!
//! ## Coordinate System
//!
//! All functions expect WGS84 latitude/longitude in decimal degrees.

use geo::{Distance, Haversine, Point};

use crate::TrailPoint;

// =============================================================================
// Distance Functions
// =============================================================================

/// Great-circle distance between two points using the Haversine formula.
///
/// Returns meters along a spherical Earth (radius 6,371 km, as used by `geo`).
/// Callers that only compare distances can treat the unit as opaque.
///
/// # Example
///
/// ```rust
/// use trail_matcher::{TrailPoint, geo_utils};
///
/// let springer = TrailPoint::new(34.6267, -84.1938);
/// let katahdin = TrailPoint::new(45.9044, -68.9216);
///
/// let distance = geo_utils::haversine_distance(&springer, &katahdin);
/// assert!((distance - 1_800_000.0).abs() < 100_000.0);
/// ```
#[inline]
pub fn haversine_distance(p1: &TrailPoint, p2: &TrailPoint) -> f64 {
    let point1 = Point::new(p1.longitude, p1.latitude);
    let point2 = Point::new(p2.longitude, p2.latitude);
    Haversine::distance(point1, point2)
}

// =============================================================================
// Bearing Functions
// =============================================================================

/// Initial compass bearing from `from` to `to`, in degrees normalized into `[0, 360)`.
///
/// θ = atan2(sin Δλ · cos φ2, cos φ1 · sin φ2 − sin φ1 · cos φ2 · cos Δλ)
///
/// Identical points yield 0°.
pub fn initial_bearing(from: &TrailPoint, to: &TrailPoint) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let delta_lon = (to.longitude - from.longitude).to_radians();

    let x = delta_lon.sin() * lat2.cos();
    let y = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_lon.cos();

    normalize_bearing(x.atan2(y).to_degrees())
}

/// Fold any angle in degrees into `[0, 360)`.
#[inline]
pub fn normalize_bearing(degrees: f64) -> f64 {
    let folded = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if folded >= 360.0 {
        0.0
    } else {
        folded
    }
}

/// One of the eight 45°-wide compass sectors.
///
/// Sectors start at their named direction and run clockwise: North is `[0, 45)`,
/// Northeast `[45, 90)`, and so on through Northwest `[315, 360)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompassSector {
    North,
    Northeast,
    East,
    Southeast,
    South,
    Southwest,
    West,
    Northwest,
}

impl CompassSector {
    const ALL: [CompassSector; 8] = [
        CompassSector::North,
        CompassSector::Northeast,
        CompassSector::East,
        CompassSector::Southeast,
        CompassSector::South,
        CompassSector::Southwest,
        CompassSector::West,
        CompassSector::Northwest,
    ];

    /// Sector containing `bearing` (degrees). A bearing of exactly 360° is North.
    ///
    /// ```rust
    /// use trail_matcher::geo_utils::CompassSector;
    ///
    /// assert_eq!(CompassSector::from_bearing(44.9), CompassSector::North);
    /// assert_eq!(CompassSector::from_bearing(45.0), CompassSector::Northeast);
    /// assert_eq!(CompassSector::from_bearing(360.0), CompassSector::North);
    /// ```
    pub fn from_bearing(bearing: f64) -> Self {
        let index = (bearing.rem_euclid(360.0) / 45.0).floor() as usize;
        Self::ALL[index % 8]
    }

    /// Display name, e.g. `"Southwest"`.
    pub fn name(&self) -> &'static str {
        match self {
            CompassSector::North => "North",
            CompassSector::Northeast => "Northeast",
            CompassSector::East => "East",
            CompassSector::Southeast => "Southeast",
            CompassSector::South => "South",
            CompassSector::Southwest => "Southwest",
            CompassSector::West => "West",
            CompassSector::Northwest => "Northwest",
        }
    }
}

impl std::fmt::Display for CompassSector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Rounding
// =============================================================================

/// Round a coordinate to `decimals` places, returned as a scaled integer so that
/// equality comparisons are exact (34.6267 at 3 decimals becomes 34627).
#[inline]
pub fn round_coordinate(value: f64, decimals: u32) -> i64 {
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round() as i64
}

// =============================================================================
// Unit Tests
// =============================================================================
