use scandeval_core::{
    CoreError, Dataset, Encoding, LabelMapping, MetricCalculator, MetricMap, ModelFamily,
    ModelOutput, Record, Result, RuleBasedPipeline, TaskHead, Tokenizer,
};
use scandeval_metrics::{
    argmax, EntityF1Calculator, MacroF1Calculator, SquadCalculator, EXACT_MATCH, MACRO_F1,
    MICRO_F1, MICRO_F1_NO_MISC, SPAN_F1,
};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::preprocess::{
    encode_classification, encode_sequence_labeling, encode_span_extraction, EncodedExample,
    Target,
};

/// Longest answer, in tokens, considered when decoding span predictions.
pub const MAX_ANSWER_TOKENS: usize = 30;

const OUTSIDE_TAG: &str = "O";

/// The closed set of supported task variants.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Classification,
    SequenceLabeling,
    SpanExtraction,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Classification => f.write_str("text classification"),
            TaskKind::SequenceLabeling => f.write_str("sequence labeling"),
            TaskKind::SpanExtraction => f.write_str("span extraction"),
        }
    }
}

impl TaskKind {
    pub fn head(&self) -> TaskHead {
        match self {
            TaskKind::Classification => TaskHead::SequenceClassification,
            TaskKind::SequenceLabeling => TaskHead::TokenClassification,
            TaskKind::SpanExtraction => TaskHead::QuestionAnswering,
        }
    }

    pub fn supports(&self, family: ModelFamily) -> bool {
        match family {
            ModelFamily::Transformer => true,
            ModelFamily::RuleBased => matches!(self, TaskKind::SequenceLabeling),
        }
    }

    pub fn ensure_supported(&self, family: ModelFamily) -> Result<()> {
        if self.supports(family) {
            return Ok(());
        }
        Err(CoreError::invalid_benchmark(format!(
            "Evaluation of {} predictions for {} models is not yet implemented",
            self, family
        )))
    }

    /// Every metric this variant reports, primary first.
    pub fn metrics(&self) -> &'static [&'static str] {
        match self {
            TaskKind::Classification => &[MACRO_F1],
            TaskKind::SequenceLabeling => &[MICRO_F1, MICRO_F1_NO_MISC],
            TaskKind::SpanExtraction => &[SPAN_F1, EXACT_MATCH],
        }
    }

    pub fn default_metric(&self) -> &'static str {
        self.metrics()[0]
    }

    /// Whether scores are fractions that are reported multiplied by 100.
    pub fn scales_scores(&self) -> bool {
        !matches!(self, TaskKind::SpanExtraction)
    }

    pub fn metric_pretty_name(metric: &str) -> &'static str {
        match metric {
            MACRO_F1 => "macro-average F1-score",
            MICRO_F1 => "micro-average F1-score",
            MICRO_F1_NO_MISC => "micro-average F1-score without MISC tags",
            EXACT_MATCH => "exact match score",
            SPAN_F1 => "F1-score",
            _ => "score",
        }
    }

    /// Plural of [`TaskKind::metric_pretty_name`], as used in summaries.
    pub fn metric_pretty_plural(metric: &str) -> &'static str {
        match metric {
            MACRO_F1 => "macro-average F1-scores",
            MICRO_F1 => "micro-average F1-scores",
            MICRO_F1_NO_MISC => "micro-average F1-scores without MISC tags",
            EXACT_MATCH => "exact match scores",
            SPAN_F1 => "F1-scores",
            _ => "scores",
        }
    }

    pub fn encode(
        &self,
        dataset: &Dataset,
        tokenizer: &dyn Tokenizer,
        labels: &LabelMapping,
        max_length: usize,
    ) -> Result<Vec<EncodedExample>> {
        dataset
            .iter()
            .map(|record| match self {
                TaskKind::Classification => {
                    encode_classification(record, tokenizer, labels, max_length)
                }
                TaskKind::SequenceLabeling => {
                    encode_sequence_labeling(record, tokenizer, labels, max_length)
                }
                TaskKind::SpanExtraction => encode_span_extraction(record, tokenizer, max_length),
            })
            .collect()
    }

    /// Scores unpadded model outputs against the gold annotations of `dataset`.
    pub fn compute_metrics(
        &self,
        dataset: &Dataset,
        encoded: &[EncodedExample],
        outputs: Vec<ModelOutput>,
        labels: &LabelMapping,
    ) -> Result<MetricMap> {
        if outputs.len() != encoded.len() || encoded.len() != dataset.len() {
            return Err(CoreError::Validation(format!(
                "Got {} outputs for {} encoded examples of {} records",
                outputs.len(),
                encoded.len(),
                dataset.len()
            )));
        }

        match self {
            TaskKind::Classification => {
                let scores = outputs
                    .into_iter()
                    .map(|output| match output {
                        ModelOutput::Sequence(scores) => Ok(scores),
                        other => Err(unexpected_output("sequence", &other)),
                    })
                    .collect::<Result<Vec<_>>>()?;
                let references = encoded
                    .iter()
                    .map(|example| match example.target {
                        Target::Class(class) => Ok(class),
                        _ => Err(CoreError::Validation(
                            "Classification example without a class target".to_string(),
                        )),
                    })
                    .collect::<Result<Vec<_>>>()?;
                MacroF1Calculator::new().calculate(&scores, &references)
            }
            TaskKind::SequenceLabeling => {
                let mut predictions = Vec::with_capacity(dataset.len());
                let mut references = Vec::with_capacity(dataset.len());
                for ((record, example), output) in dataset.iter().zip(encoded).zip(outputs) {
                    let token_scores = match output {
                        ModelOutput::Tokens(token_scores) => token_scores,
                        other => return Err(unexpected_output("token", &other)),
                    };
                    let num_words = record.words().len();
                    predictions.push(decode_tags(&example.encoding, &token_scores, num_words, labels)?);
                    references.push(gold_tags(record)?);
                }
                EntityF1Calculator::new().calculate(&predictions, &references)
            }
            TaskKind::SpanExtraction => {
                let mut predictions = Vec::with_capacity(dataset.len());
                let mut references = Vec::with_capacity(dataset.len());
                for ((record, example), output) in dataset.iter().zip(encoded).zip(outputs) {
                    let (start, end) = match output {
                        ModelOutput::Span { start, end } => (start, end),
                        other => return Err(unexpected_output("span", &other)),
                    };
                    let context = record.context.as_deref().unwrap_or_default();
                    predictions.push(decode_answer(&example.encoding, &start, &end, context));
                    references.push(gold_answers(record)?);
                }
                SquadCalculator::new().calculate(&predictions, &references)
            }
        }
    }

    /// Scores a fixed pipeline on `dataset` without any fine-tuning.
    pub fn evaluate_rule_based(
        &self,
        dataset: &Dataset,
        pipeline: &dyn RuleBasedPipeline,
    ) -> Result<MetricMap> {
        self.ensure_supported(ModelFamily::RuleBased)?;

        let mut predictions = Vec::with_capacity(dataset.len());
        let mut references = Vec::with_capacity(dataset.len());
        for record in dataset {
            let words = record.words();
            let tags = pipeline.tag(&words)?;
            if tags.len() != words.len() {
                return Err(CoreError::Model(format!(
                    "Pipeline produced {} tags for {} words",
                    tags.len(),
                    words.len()
                )));
            }
            predictions.push(tags);
            references.push(gold_tags(record)?);
        }
        EntityF1Calculator::new().calculate(&predictions, &references)
    }
}

fn unexpected_output(expected: &str, output: &ModelOutput) -> CoreError {
    let found = match output {
        ModelOutput::Sequence(_) => "sequence",
        ModelOutput::Tokens(_) => "token",
        ModelOutput::Span { .. } => "span",
    };
    CoreError::Model(format!(
        "Expected {} scores from the model, got {} scores",
        expected, found
    ))
}

fn gold_tags(record: &Record) -> Result<Vec<String>> {
    record
        .orig_label
        .as_tags()
        .map(<[String]>::to_vec)
        .ok_or_else(|| CoreError::Dataset("Record has no tags".to_string()))
}

fn gold_answers(record: &Record) -> Result<Vec<String>> {
    record
        .orig_label
        .as_answers()
        .map(|answers| answers.iter().map(|answer| answer.text.clone()).collect())
        .ok_or_else(|| CoreError::Dataset("Record has no answers".to_string()))
}

/// One tag per word, read from the first sub-token of each word.
///
/// Words cut off by truncation are tagged `O`.
pub fn decode_tags(
    encoding: &Encoding,
    token_scores: &[Vec<f32>],
    num_words: usize,
    labels: &LabelMapping,
) -> Result<Vec<String>> {
    let mut tags: Vec<Option<String>> = vec![None; num_words];

    for (word_id, scores) in encoding.word_ids.iter().zip(token_scores) {
        let Some(word) = *word_id else { continue };
        let Some(slot) = tags.get_mut(word) else { continue };
        if slot.is_some() {
            continue;
        }
        let id = argmax(scores)
            .ok_or_else(|| CoreError::Model("Empty score vector for a token".to_string()))?;
        let label = labels
            .label(id)
            .ok_or_else(|| CoreError::Model(format!("Model predicted unknown label id {}", id)))?;
        *slot = Some(label.to_string());
    }

    Ok(tags
        .into_iter()
        .map(|tag| tag.unwrap_or_else(|| OUTSIDE_TAG.to_string()))
        .collect())
}

/// The highest scoring span inside the context segment, as context text.
///
/// Spans run forwards and are at most [`MAX_ANSWER_TOKENS`] long; the first
/// best span wins. Returns an empty answer when no context token survived.
pub fn decode_answer(encoding: &Encoding, start: &[f32], end: &[f32], context: &str) -> String {
    let in_context = |position: usize| encoding.sequence_ids.get(position) == Some(&Some(1));
    let length = encoding
        .len()
        .min(encoding.offsets.len())
        .min(start.len())
        .min(end.len());

    let mut best: Option<(f32, usize, usize)> = None;
    for first in (0..length).filter(|&position| in_context(position)) {
        let last_limit = (first + MAX_ANSWER_TOKENS).min(length);
        for last in (first..last_limit).filter(|&position| in_context(position)) {
            let score = start[first] + end[last];
            if best.map_or(true, |(best_score, _, _)| score > best_score) {
                best = Some((score, first, last));
            }
        }
    }

    let Some((_, first, last)) = best else {
        return String::new();
    };
    let char_start = encoding.offsets[first].0;
    let char_end = encoding.offsets[last].1.max(char_start);
    context
        .chars()
        .skip(char_start)
        .take(char_end - char_start)
        .collect()
}
