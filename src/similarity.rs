//! Fuzzy string similarity used for entity resolution against the shelter catalog.
//!
//! Matching policy (thresholds, tie-breaks) lives in the gazetteer and geocoder; this
//! module only answers "how alike are these two strings" on a 0-100 scale, behind the
//! [`Similarity`] trait so the scorer can be swapped in tests or experiments.
//!
//! The default scorer, [`PartialRatio`], slides the shorter string across the longer
//! one and keeps the best indel ratio (`2 * LCS / (len_a + len_b)`) over all equal-length
//! windows. This makes "Katahdin" a perfect match for "Mount Katahdin" while still
//! penalizing misspellings.

/// A similarity measure between two strings, scored 0 (unrelated) to 100 (identical).
///
/// Any `Fn(&str, &str) -> u8` closure is also a `Similarity`:
///
/// ```rust
/// use trail_matcher::similarity::Similarity;
///
/// let exact = |a: &str, b: &str| if a == b { 100 } else { 0 };
/// assert_eq!(exact.score("Gooch Gap", "Gooch Gap"), 100);
/// ```
pub trait Similarity {
    fn score(&self, a: &str, b: &str) -> u8;
}

impl<F> Similarity for F
where
    F: Fn(&str, &str) -> u8,
{
    fn score(&self, a: &str, b: &str) -> u8 {
        self(a, b)
    }
}

/// Partial-ratio fuzzy score tolerant of case, punctuation and common trail
/// abbreviations.
///
/// ```rust
/// use trail_matcher::similarity::{PartialRatio, Similarity};
///
/// let scorer = PartialRatio::default();
/// assert_eq!(scorer.score("springer mountain shelter", "Springer Mtn Shelter"), 100);
/// assert!(scorer.score("Stover Creek Shelter", "Springer Mountain Shelter") < 90);
/// ```
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PartialRatio {
    /// Lowercase, strip punctuation and expand abbreviations before scoring.
    /// Default: true
    pub normalize: bool,
}

impl Default for PartialRatio {
    fn default() -> Self {
        Self { normalize: true }
    }
}

impl Similarity for PartialRatio {
    fn score(&self, a: &str, b: &str) -> u8 {
        if self.normalize {
            partial_ratio(&normalize_text(a), &normalize_text(b))
        } else {
            partial_ratio(a, b)
        }
    }
}

/// Abbreviations seen in journal text and gazetteer exports.
const ABBREVIATIONS: [(&str, &str); 3] = [
    ("mt", "mount"),
    ("mtn", "mountain"),
    ("shltr", "shelter"),
];

/// Lowercase, replace anything non-alphanumeric with a space, collapse whitespace
/// and expand known abbreviations token by token.
pub fn normalize_text(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { ' ' })
        .collect();

    cleaned
        .split_whitespace()
        .map(|token| {
            ABBREVIATIONS
                .iter()
                .find(|(short, _)| *short == token)
                .map_or(token, |(_, long)| *long)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Best indel ratio of the shorter string against every equal-length window of the
/// longer one, rounded to an integer percentage. Empty input scores 0.
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let (shorter, longer) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };
    let window = shorter.len();

    let mut best = 0.0f64;
    for start in 0..=(longer.len() - window) {
        let r = ratio(shorter, &longer[start..start + window]);
        if r > best {
            best = r;
            if best >= 100.0 {
                break;
            }
        }
    }

    best.round() as u8
}

/// Indel similarity of two character sequences as a percentage.
fn ratio(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }
    200.0 * longest_common_subsequence(a, b) as f64 / total as f64
}

fn longest_common_subsequence(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}
