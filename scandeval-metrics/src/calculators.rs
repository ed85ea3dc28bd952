pub mod classification;
pub mod sequence_labeling;
pub mod span_extraction;

pub use classification::*;
pub use sequence_labeling::*;
pub use span_extraction::*;

use scandeval_core::{CoreError, Result};

/// Index of the largest score. The first maximum wins ties; NaN scores never win.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (index, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((index, score)),
        }
    }
    best.map(|(index, _)| index)
}

/// Harmonic mean of precision and recall, 0 when both are 0.
pub fn f1_score(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

pub(crate) fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

pub(crate) fn check_lengths(metric: &str, predictions: usize, references: usize) -> Result<()> {
    if predictions != references {
        return Err(CoreError::Validation(format!(
            "{}: got {} predictions for {} references",
            metric, predictions, references
        )));
    }
    if references == 0 {
        return Err(CoreError::Validation(format!(
            "{}: cannot score an empty set of predictions",
            metric
        )));
    }
    Ok(())
}
