use scandeval_core::{
    AnswerSpan, Batch, BatchLabels, CoreError, EncodeInput, Encoding, LabelMapping, ModelOutput,
    PaddingSide, Record, Result, Tokenizer,
};
use serde::{Deserialize, Serialize};

/// The training target of one encoded example.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Class(usize),
    /// Label id for the first sub-token of every word, `None` elsewhere.
    Tags(Vec<Option<usize>>),
    /// Token positions of the answer; `(0, 0)` when it fell outside the window.
    Span(usize, usize),
}

/// A record after tokenization and truncation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EncodedExample {
    pub encoding: Encoding,
    pub target: Target,
}

impl EncodedExample {
    pub fn len(&self) -> usize {
        self.encoding.len()
    }

    pub fn is_empty(&self) -> bool {
        self.encoding.is_empty()
    }
}

fn encode_truncated(
    tokenizer: &dyn Tokenizer,
    input: EncodeInput<'_>,
    max_length: usize,
) -> Result<Encoding> {
    let mut encoding = tokenizer.encode(input)?;
    if !encoding.is_aligned() {
        return Err(CoreError::Model(format!(
            "Tokenizer returned {} ids with {} type ids, {} offsets, {} sequence ids and {} word ids",
            encoding.ids.len(),
            encoding.type_ids.len(),
            encoding.offsets.len(),
            encoding.sequence_ids.len(),
            encoding.word_ids.len()
        )));
    }
    if encoding.len() > max_length {
        encoding.truncate(max_length);
    }
    Ok(encoding)
}

pub fn encode_classification(
    record: &Record,
    tokenizer: &dyn Tokenizer,
    labels: &LabelMapping,
    max_length: usize,
) -> Result<EncodedExample> {
    let label = record.orig_label.as_label().ok_or_else(|| {
        CoreError::Dataset(format!(
            "Expected a class label, found '{}' annotation",
            record.orig_label.kind()
        ))
    })?;
    let class = labels.require_id(label)?;
    let encoding = encode_truncated(tokenizer, EncodeInput::Single(&record.doc), max_length)?;

    Ok(EncodedExample {
        encoding,
        target: Target::Class(class),
    })
}

pub fn encode_sequence_labeling(
    record: &Record,
    tokenizer: &dyn Tokenizer,
    labels: &LabelMapping,
    max_length: usize,
) -> Result<EncodedExample> {
    let tags = record.orig_label.as_tags().ok_or_else(|| {
        CoreError::Dataset(format!(
            "Expected per-token tags, found '{}' annotation",
            record.orig_label.kind()
        ))
    })?;
    let words = record.words();
    if words.len() != tags.len() {
        return Err(CoreError::Dataset(format!(
            "Record has {} tokens but {} tags",
            words.len(),
            tags.len()
        )));
    }
    let tag_ids = tags
        .iter()
        .map(|tag| labels.require_id(tag))
        .collect::<Result<Vec<_>>>()?;

    let encoding = encode_truncated(tokenizer, EncodeInput::Words(&words), max_length)?;
    let target = first_subtoken_labels(&encoding.word_ids, &tag_ids);

    Ok(EncodedExample {
        encoding,
        target: Target::Tags(target),
    })
}

fn first_subtoken_labels(word_ids: &[Option<usize>], tag_ids: &[usize]) -> Vec<Option<usize>> {
    let mut previous = None;
    word_ids
        .iter()
        .map(|word_id| {
            let label = match word_id {
                Some(word) if *word_id != previous => tag_ids.get(*word).copied(),
                _ => None,
            };
            previous = *word_id;
            label
        })
        .collect()
}

pub fn encode_span_extraction(
    record: &Record,
    tokenizer: &dyn Tokenizer,
    max_length: usize,
) -> Result<EncodedExample> {
    let answers = record.orig_label.as_answers().ok_or_else(|| {
        CoreError::Dataset(format!(
            "Expected answers, found '{}' annotation",
            record.orig_label.kind()
        ))
    })?;
    let context = record
        .context
        .as_deref()
        .ok_or_else(|| CoreError::Dataset("Question record has no context".to_string()))?;

    let encoding = encode_truncated(tokenizer, EncodeInput::Pair(&record.doc, context), max_length)?;
    let (start, end) = answers
        .first()
        .and_then(|answer| answer_token_span(&encoding, answer))
        .unwrap_or((0, 0));

    Ok(EncodedExample {
        encoding,
        target: Target::Span(start, end),
    })
}

/// Token positions covering `answer` inside the context segment, if it survived truncation.
pub fn answer_token_span(encoding: &Encoding, answer: &AnswerSpan) -> Option<(usize, usize)> {
    let answer_start = answer.answer_start;
    let answer_end = answer.answer_end();

    let context_tokens = || {
        encoding
            .sequence_ids
            .iter()
            .zip(&encoding.offsets)
            .enumerate()
            .filter(|(_, (sequence, _))| **sequence == Some(1))
            .map(|(position, (_, offsets))| (position, *offsets))
    };

    let (_, (_, last_end)) = context_tokens().last()?;
    let (first_position, (first_start, _)) = context_tokens().next()?;
    if answer_start < first_start || answer_end > last_end {
        return None;
    }

    let start = context_tokens()
        .find(|(_, (_, end))| *end > answer_start)
        .map(|(position, _)| position)
        .unwrap_or(first_position);
    let end = context_tokens()
        .filter(|(_, (start, _))| *start < answer_end)
        .map(|(position, _)| position)
        .last()?;

    (start <= end).then_some((start, end))
}

/// Pads encoded examples into model batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collator {
    pad_token_id: u32,
    padding_side: PaddingSide,
    token_types: bool,
}

impl Collator {
    pub fn new(pad_token_id: u32, padding_side: PaddingSide, token_types: bool) -> Self {
        Self {
            pad_token_id,
            padding_side,
            token_types,
        }
    }

    pub fn padding_side(&self) -> PaddingSide {
        self.padding_side
    }

    /// Pads every example to the longest one. All targets must be of the same kind.
    pub fn collate(&self, examples: &[&EncodedExample]) -> Result<Batch> {
        let length = examples.iter().map(|example| example.len()).max().unwrap_or(0);

        let mut input_ids = Vec::with_capacity(examples.len());
        let mut attention_mask = Vec::with_capacity(examples.len());
        let mut token_type_ids = Vec::with_capacity(examples.len());

        for example in examples {
            let padding = length - example.len();
            let encoding = &example.encoding;
            input_ids.push(self.pad(&encoding.ids, padding, self.pad_token_id));
            attention_mask.push(self.pad(&vec![1u8; encoding.len()], padding, 0));
            token_type_ids.push(self.pad(&encoding.type_ids, padding, 0));
        }

        let labels = self.collate_targets(examples, length)?;

        Ok(Batch {
            input_ids,
            attention_mask,
            token_type_ids: self.token_types.then_some(token_type_ids),
            labels,
        })
    }

    fn pad<T: Clone>(&self, values: &[T], padding: usize, fill: T) -> Vec<T> {
        let pad = std::iter::repeat(fill).take(padding);
        match self.padding_side {
            PaddingSide::Right => values.iter().cloned().chain(pad).collect(),
            PaddingSide::Left => pad.chain(values.iter().cloned()).collect(),
        }
    }

    fn shift(&self, length: usize, example_length: usize) -> usize {
        match self.padding_side {
            PaddingSide::Right => 0,
            PaddingSide::Left => length - example_length,
        }
    }

    fn collate_targets(&self, examples: &[&EncodedExample], length: usize) -> Result<BatchLabels> {
        let mixed = || CoreError::Validation("Batch mixes targets of different kinds".to_string());

        let Some(first) = examples.first() else {
            return Ok(BatchLabels::Classes(Vec::new()));
        };

        match &first.target {
            Target::Class(_) => examples
                .iter()
                .map(|example| match example.target {
                    Target::Class(class) => Ok(class),
                    _ => Err(mixed()),
                })
                .collect::<Result<Vec<_>>>()
                .map(BatchLabels::Classes),
            Target::Tags(_) => examples
                .iter()
                .map(|example| match &example.target {
                    Target::Tags(tags) => Ok(self.pad(tags, length - tags.len(), None)),
                    _ => Err(mixed()),
                })
                .collect::<Result<Vec<_>>>()
                .map(BatchLabels::Tags),
            Target::Span(..) => examples
                .iter()
                .map(|example| match example.target {
                    Target::Span(start, end) => {
                        let shift = self.shift(length, example.len());
                        Ok((start + shift, end + shift))
                    }
                    _ => Err(mixed()),
                })
                .collect::<Result<Vec<_>>>()
                .map(BatchLabels::Spans),
        }
    }

    /// Drops the scores of padding positions from a per-token output.
    pub fn unpad(&self, output: ModelOutput, example_length: usize, padded_length: usize) -> ModelOutput {
        let shift = self.shift(padded_length, example_length);
        let keep = |scores: Vec<f32>| -> Vec<f32> {
            scores.into_iter().skip(shift).take(example_length).collect()
        };
        match output {
            ModelOutput::Sequence(scores) => ModelOutput::Sequence(scores),
            ModelOutput::Tokens(tokens) => ModelOutput::Tokens(
                tokens.into_iter().skip(shift).take(example_length).collect(),
            ),
            ModelOutput::Span { start, end } => ModelOutput::Span {
                start: keep(start),
                end: keep(end),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example(ids: Vec<u32>, target: Target) -> EncodedExample {
        let len = ids.len();
        EncodedExample {
            encoding: Encoding {
                ids,
                type_ids: vec![0; len],
                offsets: vec![(0, 0); len],
                sequence_ids: vec![None; len],
                word_ids: vec![None; len],
            },
            target,
        }
    }

    #[test]
    fn test_first_subtoken_labels() {
        let word_ids = [None, Some(0), Some(0), Some(1), None];
        assert_eq!(
            first_subtoken_labels(&word_ids, &[3, 4]),
            vec![None, Some(3), None, Some(4), None]
        );
    }

    #[test]
    fn test_right_padding() {
        let collator = Collator::new(0, PaddingSide::Right, false);
        let short = example(vec![5, 6], Target::Class(1));
        let long = example(vec![5, 6, 7], Target::Class(0));

        let batch = collator.collate(&[&short, &long]).unwrap();

        assert_eq!(batch.input_ids, vec![vec![5, 6, 0], vec![5, 6, 7]]);
        assert_eq!(batch.attention_mask, vec![vec![1, 1, 0], vec![1, 1, 1]]);
        assert_eq!(batch.token_type_ids, None);
        assert_eq!(batch.labels, BatchLabels::Classes(vec![1, 0]));
    }

    #[test]
    fn test_left_padding_shifts_spans() {
        let collator = Collator::new(9, PaddingSide::Left, true);
        let short = example(vec![5, 6], Target::Span(1, 1));
        let long = example(vec![5, 6, 7, 8], Target::Span(2, 3));

        let batch = collator.collate(&[&short, &long]).unwrap();

        assert_eq!(batch.input_ids[0], vec![9, 9, 5, 6]);
        assert_eq!(batch.attention_mask[0], vec![0, 0, 1, 1]);
        assert_eq!(batch.labels, BatchLabels::Spans(vec![(3, 3), (2, 3)]));
        assert!(batch.token_type_ids.is_some());
    }

    #[test]
    fn test_unpad_left() {
        let collator = Collator::new(0, PaddingSide::Left, false);
        let output = ModelOutput::Span {
            start: vec![0.0, 0.0, 1.0, 2.0],
            end: vec![0.0, 0.0, 3.0, 4.0],
        };
        assert_eq!(
            collator.unpad(output, 2, 4),
            ModelOutput::Span {
                start: vec![1.0, 2.0],
                end: vec![3.0, 4.0],
            }
        );
    }

    #[test]
    fn test_mixed_targets_rejected() {
        let collator = Collator::new(0, PaddingSide::Right, false);
        let a = example(vec![1], Target::Class(0));
        let b = example(vec![1], Target::Span(0, 0));
        assert!(collator.collate(&[&a, &b]).is_err());
    }
}
