//! Plate codes, candidates and per-image recognition results

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Shortest plate code accepted (inclusive)
pub const MIN_PLATE_LEN: usize = 4;

/// Longest plate code accepted (inclusive)
pub const MAX_PLATE_LEN: usize = 7;

/// Why a string is not a valid plate code
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlateCodeError {
    #[error("plate code must be {MIN_PLATE_LEN}-{MAX_PLATE_LEN} characters, got {0}")]
    Length(usize),

    #[error("plate code may only contain A-Z and 0-9, found {0:?}")]
    Character(char),
}

/// Normalized plate code: uppercase ASCII letters and digits, 4-7 characters.
///
/// The inner string is private so every value in circulation has passed
/// validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlateCode(String);

impl PlateCode {
    /// Validate an already-normalized code (no case folding, no stripping).
    pub fn new(code: impl Into<String>) -> Result<Self, PlateCodeError> {
        let code = code.into();
        if let Some(bad) = code
            .chars()
            .find(|c| !(c.is_ascii_uppercase() || c.is_ascii_digit()))
        {
            return Err(PlateCodeError::Character(bad));
        }
        if !is_valid_len(code.len()) {
            return Err(PlateCodeError::Length(code.len()));
        }
        Ok(Self(code))
    }

    /// Normalize operator input the same way OCR text is tightened:
    /// drop everything except ASCII letters/digits, then uppercase.
    ///
    /// `"京A12345"` and `"a1-23 45"` both become `"A12345"`.
    pub fn normalize(raw: &str) -> Result<Self, PlateCodeError> {
        Self::new(tight_form(raw).to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Never true for a validated code
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<String> for PlateCode {
    type Error = PlateCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PlateCode> for String {
    fn from(code: PlateCode) -> Self {
        code.0
    }
}

impl fmt::Display for PlateCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PlateCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

pub(crate) fn is_valid_len(len: usize) -> bool {
    (MIN_PLATE_LEN..=MAX_PLATE_LEN).contains(&len)
}

/// Keep only ASCII letters and digits (case preserved)
pub(crate) fn tight_form(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

/// One plate-code guess produced from one OCR fragment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub text: PlateCode,
    /// OCR confidence in [0, 1]
    pub confidence: f64,
}

impl Candidate {
    /// Build a candidate, clamping confidence into [0, 1] (NaN becomes 0).
    pub fn new(text: PlateCode, confidence: f64) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self { text, confidence }
    }
}

/// Candidates for one image, best first.
///
/// Only [`crate::rank_candidates`] builds one, so the ordering
/// `(length desc, confidence desc)` always holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecognitionResult {
    candidates: Vec<Candidate>,
}

impl RecognitionResult {
    pub(crate) fn from_sorted(candidates: Vec<Candidate>) -> Self {
        Self { candidates }
    }

    /// Highest-ranked candidate, `None` when no plate was found
    pub fn best(&self) -> Option<&Candidate> {
        self.candidates.first()
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn into_best(self) -> Option<Candidate> {
        self.candidates.into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_accepts_boundary_lengths() {
        assert!(PlateCode::new("AB12").is_ok());
        assert!(PlateCode::new("AB12345").is_ok());
    }

    #[test]
    fn test_new_rejects_out_of_range_lengths() {
        assert_eq!(PlateCode::new("AB1"), Err(PlateCodeError::Length(3)));
        assert_eq!(PlateCode::new("AB123456"), Err(PlateCodeError::Length(8)));
        assert_eq!(PlateCode::new(""), Err(PlateCodeError::Length(0)));
    }

    #[test]
    fn test_new_rejects_lowercase_and_separators() {
        assert_eq!(PlateCode::new("ab1234"), Err(PlateCodeError::Character('a')));
        assert_eq!(PlateCode::new("AB-1234"), Err(PlateCodeError::Character('-')));
    }

    #[test]
    fn test_normalize_strips_and_uppercases() {
        assert_eq!(PlateCode::normalize("京A12345").unwrap().as_str(), "A12345");
        assert_eq!(PlateCode::normalize(" xy 98-765 ").unwrap().as_str(), "XY98765");
        assert!(PlateCode::normalize("粤##").is_err());
    }

    #[test]
    fn test_serde_validates_on_deserialize() {
        let code: PlateCode = serde_json::from_str("\"AB1234\"").unwrap();
        assert_eq!(code.as_str(), "AB1234");
        assert!(serde_json::from_str::<PlateCode>("\"ab\"").is_err());
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"AB1234\"");
    }

    #[test]
    fn test_candidate_clamps_confidence() {
        let plate = PlateCode::new("AB1234").unwrap();
        assert_eq!(Candidate::new(plate.clone(), 1.7).confidence, 1.0);
        assert_eq!(Candidate::new(plate.clone(), -0.2).confidence, 0.0);
        assert_eq!(Candidate::new(plate, f64::NAN).confidence, 0.0);
    }
}
