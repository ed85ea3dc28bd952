use scandeval_core::{CoreError, MetricCalculator, MetricMap, Result};
use std::collections::BTreeSet;

use super::{argmax, check_lengths, f1_score, ratio};

pub const MACRO_F1: &str = "macro_f1";

/// Macro-averaged F1 over the classes that occur in either the references or
/// the argmax predictions.
#[derive(Debug, Clone, Copy, Default)]
pub struct MacroF1Calculator;

impl MacroF1Calculator {
    pub fn new() -> Self {
        Self
    }

    /// Macro F1 of already decided class ids.
    pub fn score(predicted: &[usize], references: &[usize]) -> Result<f64> {
        check_lengths(MACRO_F1, predicted.len(), references.len())?;

        let classes: BTreeSet<usize> = predicted.iter().chain(references).copied().collect();
        let total: f64 = classes
            .iter()
            .map(|&class| {
                let mut tp = 0;
                let mut fp = 0;
                let mut fn_ = 0;
                for (&p, &r) in predicted.iter().zip(references) {
                    match (p == class, r == class) {
                        (true, true) => tp += 1,
                        (true, false) => fp += 1,
                        (false, true) => fn_ += 1,
                        (false, false) => {}
                    }
                }
                f1_score(ratio(tp, tp + fp), ratio(tp, tp + fn_))
            })
            .sum();

        Ok(total / classes.len() as f64)
    }
}

impl MetricCalculator for MacroF1Calculator {
    type Prediction = Vec<f32>;
    type Reference = usize;

    fn calculate(&self, predictions: &[Vec<f32>], references: &[usize]) -> Result<MetricMap> {
        let predicted = predictions
            .iter()
            .enumerate()
            .map(|(index, scores)| {
                argmax(scores).ok_or_else(|| {
                    CoreError::Validation(format!("Example {} has no class scores", index))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let macro_f1 = Self::score(&predicted, references)?;
        tracing::debug!(macro_f1, examples = references.len(), "Computed macro F1");

        Ok(MetricMap::from([(MACRO_F1.to_string(), macro_f1)]))
    }
}
