use regex::Regex;
use scandeval_core::{CoreError, MetricCalculator, MetricMap, Result};
use std::collections::HashMap;
use std::sync::OnceLock;

use super::{check_lengths, f1_score, ratio};

pub const EXACT_MATCH: &str = "exact_match";
pub const SPAN_F1: &str = "f1";

fn articles() -> &'static Regex {
    static ARTICLES: OnceLock<Regex> = OnceLock::new();
    ARTICLES.get_or_init(|| Regex::new(r"\b(a|an|the)\b").expect("article pattern is valid"))
}

/// Lower-cases, drops punctuation and English articles, and collapses whitespace.
pub fn normalize_answer(text: &str) -> String {
    let lowered: String = text
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_ascii_punctuation())
        .collect();
    let without_articles = articles().replace_all(&lowered, " ");
    without_articles.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn exact_match(prediction: &str, gold: &str) -> bool {
    normalize_answer(prediction) == normalize_answer(gold)
}

/// Token-overlap F1 between normalised answers.
pub fn token_f1(prediction: &str, gold: &str) -> f64 {
    let prediction = normalize_answer(prediction);
    let gold = normalize_answer(gold);
    let predicted_tokens: Vec<&str> = prediction.split_whitespace().collect();
    let gold_tokens: Vec<&str> = gold.split_whitespace().collect();

    let mut gold_counts: HashMap<&str, usize> = HashMap::new();
    for token in &gold_tokens {
        *gold_counts.entry(token).or_insert(0) += 1;
    }

    let mut num_same = 0;
    for token in &predicted_tokens {
        if let Some(count) = gold_counts.get_mut(token) {
            if *count > 0 {
                *count -= 1;
                num_same += 1;
            }
        }
    }

    if num_same == 0 {
        return 0.0;
    }
    f1_score(
        ratio(num_same, predicted_tokens.len()),
        ratio(num_same, gold_tokens.len()),
    )
}

/// SQuAD exact match and F1, best over the gold answers, on a 0-100 scale.
#[derive(Debug, Clone, Copy, Default)]
pub struct SquadCalculator;

impl SquadCalculator {
    pub fn new() -> Self {
        Self
    }
}

impl MetricCalculator for SquadCalculator {
    type Prediction = String;
    type Reference = Vec<String>;

    fn calculate(&self, predictions: &[String], references: &[Vec<String>]) -> Result<MetricMap> {
        check_lengths(EXACT_MATCH, predictions.len(), references.len())?;

        let mut total_exact = 0.0;
        let mut total_f1 = 0.0;
        for (index, (prediction, answers)) in predictions.iter().zip(references).enumerate() {
            if answers.is_empty() {
                return Err(CoreError::Validation(format!(
                    "Example {} has no gold answers",
                    index
                )));
            }
            let exact = answers.iter().any(|gold| exact_match(prediction, gold));
            let f1 = answers
                .iter()
                .map(|gold| token_f1(prediction, gold))
                .fold(0.0, f64::max);

            total_exact += if exact { 1.0 } else { 0.0 };
            total_f1 += f1;
        }

        let n = predictions.len() as f64;
        Ok(MetricMap::from([
            (EXACT_MATCH.to_string(), 100.0 * total_exact / n),
            (SPAN_F1.to_string(), 100.0 * total_f1 / n),
        ]))
    }
}
