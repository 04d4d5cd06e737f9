//! Parsers for the delimited text inputs.
//!
//! - Raw shelter lists: `name,dataset,lat,lon,type`
//! - Canonical catalogs (as previously built): `id,name,dataset,lat,lon,type`
//! - GIS centerline exports: `lon,lat` (any further columns are ignored)
//!
//! Every input starts with a header row. Fields are trimmed and CRLF line endings are
//! accepted. A malformed row is reported and skipped; the remaining rows still parse.
//! Callers read the text however they like; nothing here touches the filesystem.

use csv::{ReaderBuilder, StringRecord, Trim};
use log::{debug, warn};
use thiserror::Error;

use crate::gazetteer::{Catalog, RawShelterRecord};
use crate::{Shelter, ShelterType, TrailPoint};

/// Errors for a single delimited row.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Line {line}: expected {expected} columns, found {found}")]
    MissingColumn { line: u64, expected: usize, found: usize },

    #[error("Line {line}: invalid {column} '{value}'")]
    InvalidNumber { line: u64, column: &'static str, value: String },
}

/// Parse a raw shelter list. The `type` column may be left empty.
///
/// ```rust
/// use trail_matcher::records::parse_shelter_records;
///
/// let text = "name,dataset,lat,lon,type\n\
///             Springer Mountain Shelter,ATC,34.627,-84.194,shelter\n\
///             Hawk Mountain Shelter,ATC,north-ish,-84.137,shelter\n";
/// let (records, errors) = parse_shelter_records(text);
/// assert_eq!(records.len(), 1);
/// assert_eq!(errors.len(), 1);
/// ```
pub fn parse_shelter_records(text: &str) -> (Vec<RawShelterRecord>, Vec<RecordError>) {
    let (records, errors) = parse_rows(text, 5, |record, line| {
        Ok(RawShelterRecord {
            name: field(record, 0).to_string(),
            dataset: field(record, 1).to_string(),
            latitude: parse_f64(record, 2, "latitude", line)?,
            longitude: parse_f64(record, 3, "longitude", line)?,
            shelter_type: field(record, 4).to_string(),
        })
    });
    debug!("[Records] {} shelter rows, {} rejected", records.len(), errors.len());
    (records, errors)
}

/// Parse a canonical catalog, keeping the ids as written.
pub fn parse_catalog(text: &str) -> (Catalog, Vec<RecordError>) {
    let (shelters, errors) = parse_rows(text, 6, |record, line| {
        let id = field(record, 0);
        let id = id.parse::<u32>().map_err(|_| RecordError::InvalidNumber {
            line,
            column: "id",
            value: id.to_string(),
        })?;
        Ok(Shelter {
            id,
            name: field(record, 1).to_string(),
            dataset_origin: field(record, 2).to_string(),
            latitude: parse_f64(record, 3, "latitude", line)?,
            longitude: parse_f64(record, 4, "longitude", line)?,
            shelter_type: ShelterType::parse(field(record, 5)),
        })
    });
    (Catalog::from_shelters(shelters), errors)
}

/// Parse a centerline export. Note the column order: longitude first.
pub fn parse_centerline(text: &str) -> (Vec<TrailPoint>, Vec<RecordError>) {
    parse_rows(text, 2, |record, line| {
        let longitude = parse_f64(record, 0, "longitude", line)?;
        let latitude = parse_f64(record, 1, "latitude", line)?;
        Ok(TrailPoint::new(latitude, longitude))
    })
}

// ============================================================================
// Helpers
// ============================================================================

fn parse_rows<T>(
    text: &str,
    columns: usize,
    mut parse: impl FnMut(&StringRecord, u64) -> Result<T, RecordError>,
) -> (Vec<T>, Vec<RecordError>) {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    let mut errors = Vec::new();

    for result in reader.records() {
        let outcome = result.map_err(RecordError::from).and_then(|record| {
            let line = record.position().map_or(0, |p| p.line());
            if record.len() < columns {
                return Err(RecordError::MissingColumn {
                    line,
                    expected: columns,
                    found: record.len(),
                });
            }
            parse(&record, line)
        });

        match outcome {
            Ok(row) => rows.push(row),
            Err(e) => {
                warn!("[Records] Skipping row: {}", e);
                errors.push(e);
            }
        }
    }

    (rows, errors)
}

#[inline]
fn field(record: &StringRecord, index: usize) -> &str {
    record.get(index).unwrap_or("")
}

fn parse_f64(record: &StringRecord, index: usize, column: &'static str, line: u64) -> Result<f64, RecordError> {
    let raw = field(record, index);
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| RecordError::InvalidNumber {
            line,
            column,
            value: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shelter_rows() {
        let text = "name,dataset,lat,lon,type\r\n Mt. Collins Shelter , ATC ,35.5953,-83.4688,Shelter\r\nFontana Hilton,TNL,35.45,-83.81,\r\n";
        let (records, errors) = parse_shelter_records(text);
        assert!(errors.is_empty());
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "Mt. Collins Shelter");
        assert_eq!(records[0].dataset, "ATC");
        assert_eq!(records[0].shelter_type, "Shelter");
        assert_eq!(records[1].shelter_type, "");
    }

    #[test]
    fn test_short_row_reported_with_line() {
        let text = "name,dataset,lat,lon,type\nSpringer Mountain Shelter,ATC,34.627\nStover Creek Shelter,ATC,34.647,-84.196,shelter\n";
        let (records, errors) = parse_shelter_records(text);
        assert_eq!(records.len(), 1);
        assert!(matches!(
            errors[0],
            RecordError::MissingColumn { line: 2, expected: 5, found: 3 }
        ));
    }

    #[test]
    fn test_bad_number() {
        let text = "name,dataset,lat,lon,type\nHawk Mountain Shelter,ATC,34.666,NaN,shelter\n";
        let (records, errors) = parse_shelter_records(text);
        assert!(records.is_empty());
        match &errors[0] {
            RecordError::InvalidNumber { column, value, .. } => {
                assert_eq!(*column, "longitude");
                assert_eq!(value, "NaN");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_catalog_keeps_ids() {
        let text = "id,name,dataset,lat,lon,type\n7,Springer Mountain Shelter,ATC,34.627,-84.194,shelter\n9,Hiker Hostel,TNL,34.55,-84.25,hostel\nx,Bad Row,ATC,1,2,shelter\n";
        let (catalog, errors) = parse_catalog(text);
        assert_eq!(catalog.len(), 2);
        assert_eq!(errors.len(), 1);
        assert_eq!(catalog.get(7).unwrap().name, "Springer Mountain Shelter");
        assert_eq!(catalog.get(9).unwrap().shelter_type, ShelterType::Hostel);
    }

    #[test]
    fn test_centerline_lon_lat_order() {
        let text = "X,Y,OBJECTID\n-84.19382841799994,34.62669316200002,1\n-84.1901,34.6301,2\n";
        let (points, errors) = parse_centerline(text);
        assert!(errors.is_empty());
        assert_eq!(points[0], crate::SOUTHERN_TERMINUS);
        assert_eq!(points[1], TrailPoint::new(34.6301, -84.1901));
    }

    #[test]
    fn test_header_only() {
        let (points, errors) = parse_centerline("lon,lat\n");
        assert!(points.is_empty());
        assert!(errors.is_empty());
    }
}
