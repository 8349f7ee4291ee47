//! Candidate extraction and ranking over raw OCR output
//!
//! OCR output on real plates mixes the plate characters with province or
//! authority glyphs, separators and noise. Extraction runs in two passes per
//! fragment:
//!
//! 1. Tight form: every ASCII letter/digit in the fragment, uppercased. Used
//!    when its length is already a valid plate length.
//! 2. Longest run: the longest maximal `[A-Z0-9]` run of the uppercased
//!    fragment (first one wins on ties), used when it is a valid length.
//!
//! A fragment yields at most one candidate. No candidate is not an error.

use crate::plate::{is_valid_len, tight_form, Candidate, PlateCode, RecognitionResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One text fragment reported by the OCR engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrFragment {
    pub text: String,
    pub confidence: f64,
    /// Polygon around the text in image coordinates, when the engine reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<Vec<[f32; 2]>>,
}

impl OcrFragment {
    pub fn new(text: impl Into<String>, confidence: f64) -> Self {
        Self {
            text: text.into(),
            confidence,
            region: None,
        }
    }
}

/// Turn one OCR fragment into at most one plate candidate
pub fn extract_candidate(fragment: &str, confidence: f64) -> Option<Candidate> {
    let tight = tight_form(fragment);
    if is_valid_len(tight.len()) {
        let code = PlateCode::new(tight.to_ascii_uppercase()).ok()?;
        return Some(Candidate::new(code, confidence));
    }

    let upper = fragment.to_uppercase();
    let run = longest_alnum_run(&upper)?;
    if !is_valid_len(run.len()) {
        return None;
    }
    PlateCode::new(run).ok().map(|code| Candidate::new(code, confidence))
}

/// Apply [`extract_candidate`] to every fragment of one image
pub fn extract_candidates<'a, I>(fragments: I) -> Vec<Candidate>
where
    I: IntoIterator<Item = &'a OcrFragment>,
{
    fragments
        .into_iter()
        .filter_map(|f| extract_candidate(&f.text, f.confidence))
        .collect()
}

/// Order candidates by length, then confidence, both descending
pub fn rank_candidates(mut candidates: Vec<Candidate>) -> RecognitionResult {
    candidates.sort_by(compare_rank);
    RecognitionResult::from_sorted(candidates)
}

fn compare_rank(a: &Candidate, b: &Candidate) -> Ordering {
    b.text
        .len()
        .cmp(&a.text.len())
        .then_with(|| b.confidence.total_cmp(&a.confidence))
}

/// Longest maximal run of `[A-Z0-9]`; first-seen wins on equal length
fn longest_alnum_run(upper: &str) -> Option<&str> {
    fn consider<'a>(run: &'a str, best: &mut Option<&'a str>) {
        if best.map_or(true, |b| run.len() > b.len()) {
            *best = Some(run);
        }
    }

    let mut best: Option<&str> = None;
    let mut start: Option<usize> = None;

    for (idx, ch) in upper.char_indices() {
        let in_run = ch.is_ascii_uppercase() || ch.is_ascii_digit();
        match (in_run, start) {
            (true, None) => start = Some(idx),
            (false, Some(s)) => {
                consider(&upper[s..idx], &mut best);
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        consider(&upper[s..], &mut best);
    }

    best
}
