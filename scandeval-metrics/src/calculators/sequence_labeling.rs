use scandeval_core::{CoreError, MetricCalculator, MetricMap, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::{check_lengths, f1_score, ratio};

pub const MICRO_F1: &str = "micro_f1";
pub const MICRO_F1_NO_MISC: &str = "micro_f1_no_misc";

/// A labelled chunk of consecutive tokens, `end` exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entity {
    pub kind: String,
    pub start: usize,
    pub end: usize,
}

fn split_tag(tag: &str) -> (char, &str) {
    match tag.split_once('-') {
        Some((prefix, kind)) if prefix.len() == 1 => (prefix.chars().next().unwrap_or('O'), kind),
        _ if tag == "O" => ('O', ""),
        // A bare type without a prefix is read as the inside of a chunk
        _ => ('I', tag),
    }
}

/// Chunks BIO/IOB2 tags into entities.
///
/// An `I-X` after `O` or after a chunk of another type starts a new chunk.
pub fn extract_entities<S: AsRef<str>>(tags: &[S]) -> Vec<Entity> {
    let mut entities = Vec::new();
    let mut current: Option<(String, usize)> = None;

    for (index, tag) in tags.iter().enumerate() {
        let (prefix, kind) = split_tag(tag.as_ref());

        let continues = matches!(
            (&current, prefix),
            (Some((current_kind, _)), 'I') if current_kind == kind
        );
        if continues {
            continue;
        }

        if let Some((current_kind, start)) = current.take() {
            entities.push(Entity {
                kind: current_kind,
                start,
                end: index,
            });
        }
        if prefix != 'O' {
            current = Some((kind.to_string(), index));
        }
    }

    if let Some((kind, start)) = current {
        entities.push(Entity {
            kind,
            start,
            end: tags.len(),
        });
    }

    entities
}

/// Entity-level micro F1, with and without `MISC` entities.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntityF1Calculator;

impl EntityF1Calculator {
    pub fn new() -> Self {
        Self
    }

    fn micro_f1(
        predictions: &[Vec<String>],
        references: &[Vec<String>],
        keep: impl Fn(&Entity) -> bool,
    ) -> f64 {
        let mut num_predicted = 0;
        let mut num_gold = 0;
        let mut num_correct = 0;

        for (predicted, gold) in predictions.iter().zip(references) {
            let predicted: HashSet<Entity> =
                extract_entities(predicted).into_iter().filter(&keep).collect();
            let gold: HashSet<Entity> = extract_entities(gold).into_iter().filter(&keep).collect();

            num_predicted += predicted.len();
            num_gold += gold.len();
            num_correct += predicted.intersection(&gold).count();
        }

        f1_score(ratio(num_correct, num_predicted), ratio(num_correct, num_gold))
    }
}

impl MetricCalculator for EntityF1Calculator {
    type Prediction = Vec<String>;
    type Reference = Vec<String>;

    fn calculate(
        &self,
        predictions: &[Vec<String>],
        references: &[Vec<String>],
    ) -> Result<MetricMap> {
        check_lengths(MICRO_F1, predictions.len(), references.len())?;
        for (index, (predicted, gold)) in predictions.iter().zip(references).enumerate() {
            if predicted.len() != gold.len() {
                return Err(CoreError::Validation(format!(
                    "Example {} has {} predicted tags for {} gold tags",
                    index,
                    predicted.len(),
                    gold.len()
                )));
            }
        }

        let micro_f1 = Self::micro_f1(predictions, references, |_| true);
        let micro_f1_no_misc = Self::micro_f1(predictions, references, |e| e.kind != "MISC");

        Ok(MetricMap::from([
            (MICRO_F1.to_string(), micro_f1),
            (MICRO_F1_NO_MISC.to_string(), micro_f1_no_misc),
        ]))
    }
}
