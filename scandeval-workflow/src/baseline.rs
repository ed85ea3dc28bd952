//! Reference implementations of the model capability traits.
//!
//! The baseline tokenizer hashes whitespace-separated words into a fixed
//! vocabulary. The baseline model ignores its inputs and always predicts the
//! label it saw most often during fine-tuning, which makes it a lower bound
//! every real model should beat.

use scandeval_core::{
    Batch, BatchLabels, CoreError, EmbeddingTable, EncodeInput, Encoding, LabelMapping,
    LoadedModel, ModelConfig, ModelFamily, ModelOutput, ModelProvider, Module, PretrainedModel,
    Result, RuleBasedPipeline, SpecialToken, TaskHead, Tokenizer, TokenizerConfig,
};

pub const MAJORITY_MODEL_ID: &str = "baseline/majority";
pub const OUTSIDE_TAGGER_ID: &str = "baseline/outside";

pub const BASELINE_VOCAB_SIZE: usize = 1000;
const HIDDEN_SIZE: usize = 8;
const MAX_POSITIONS: usize = 514;
const MAX_LENGTH: usize = 512;

const PAD_ID: u32 = 0;
const CLS_ID: u32 = 1;
const SEP_ID: u32 = 2;
const FIRST_WORD_ID: u32 = 3;

const WORD_EMBEDDINGS: &str = "embeddings.word_embeddings";

// ===== Tokenizer =====

#[derive(Debug, Clone)]
pub struct WhitespaceTokenizer {
    config: TokenizerConfig,
}

impl WhitespaceTokenizer {
    pub fn new(vocab_size: usize) -> Self {
        Self {
            config: TokenizerConfig {
                model_max_length: Some(MAX_LENGTH),
                vocab_size,
                pad_token: Some(SpecialToken::new("[PAD]", PAD_ID)),
                cls_token: Some(SpecialToken::new("[CLS]", CLS_ID)),
                sep_token: Some(SpecialToken::new("[SEP]", SEP_ID)),
                ..Default::default()
            },
        }
    }

    pub fn token_id(&self, word: &str) -> u32 {
        let buckets = (self.config.vocab_size as u64).saturating_sub(FIRST_WORD_ID as u64).max(1);
        FIRST_WORD_ID + (fnv1a(&word.to_lowercase()) % buckets) as u32
    }

    fn push_special(encoding: &mut Encoding, id: u32, type_id: u32) {
        encoding.ids.push(id);
        encoding.type_ids.push(type_id);
        encoding.offsets.push((0, 0));
        encoding.sequence_ids.push(None);
        encoding.word_ids.push(None);
    }

    fn push_words(&self, encoding: &mut Encoding, text: &str, sequence: usize) {
        for (index, (word, offsets)) in split_with_offsets(text).into_iter().enumerate() {
            encoding.ids.push(self.token_id(&word));
            encoding.type_ids.push(sequence as u32);
            encoding.offsets.push(offsets);
            encoding.sequence_ids.push(Some(sequence));
            encoding.word_ids.push(Some(index));
        }
    }
}

impl Tokenizer for WhitespaceTokenizer {
    fn config(&self) -> &TokenizerConfig {
        &self.config
    }

    fn config_mut(&mut self) -> &mut TokenizerConfig {
        &mut self.config
    }

    fn encode(&self, input: EncodeInput<'_>) -> Result<Encoding> {
        let mut encoding = Encoding::default();
        Self::push_special(&mut encoding, CLS_ID, 0);

        match input {
            EncodeInput::Single(text) => {
                self.push_words(&mut encoding, text, 0);
                Self::push_special(&mut encoding, SEP_ID, 0);
            }
            EncodeInput::Pair(first, second) => {
                self.push_words(&mut encoding, first, 0);
                Self::push_special(&mut encoding, SEP_ID, 0);
                self.push_words(&mut encoding, second, 1);
                Self::push_special(&mut encoding, SEP_ID, 1);
            }
            EncodeInput::Words(words) => {
                let mut position = 0;
                for (index, word) in words.iter().enumerate() {
                    let length = word.chars().count();
                    encoding.ids.push(self.token_id(word));
                    encoding.type_ids.push(0);
                    encoding.offsets.push((position, position + length));
                    encoding.sequence_ids.push(Some(0));
                    encoding.word_ids.push(Some(index));
                    position += length + 1;
                }
                Self::push_special(&mut encoding, SEP_ID, 0);
            }
        }

        Ok(encoding)
    }
}

/// Whitespace-separated words with their character offsets.
fn split_with_offsets(text: &str) -> Vec<(String, (usize, usize))> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut start = 0;

    for (position, ch) in text.chars().enumerate() {
        if ch.is_whitespace() {
            if !current.is_empty() {
                words.push((std::mem::take(&mut current), (start, position)));
            }
        } else {
            if current.is_empty() {
                start = position;
            }
            current.push(ch);
        }
    }
    if !current.is_empty() {
        let end = start + current.chars().count();
        words.push((current, (start, end)));
    }

    words
}

fn fnv1a(text: &str) -> u64 {
    text.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ byte as u64).wrapping_mul(0x0100_0000_01b3)
    })
}

// ===== Model =====

/// Predicts the most frequent training label; ties go to the lowest label id.
#[derive(Debug, Clone)]
pub struct MajorityClassModel {
    config: ModelConfig,
    modules: Module,
    head: TaskHead,
    counts: Vec<u64>,
}

impl MajorityClassModel {
    pub fn new(head: TaskHead, num_labels: usize, vocab_size: usize) -> Self {
        let modules = Module::container(vec![
            (
                "embeddings",
                Module::container(vec![
                    (
                        "word_embeddings",
                        Module::Embedding(EmbeddingTable::zeros(vocab_size, HIDDEN_SIZE)),
                    ),
                    (
                        "position_embeddings",
                        Module::Embedding(EmbeddingTable::zeros(MAX_POSITIONS, HIDDEN_SIZE)),
                    ),
                    (
                        "token_type_embeddings",
                        Module::Embedding(EmbeddingTable::zeros(1, HIDDEN_SIZE)),
                    ),
                ]),
            ),
            ("classifier", Module::Parameter(vec![HIDDEN_SIZE, num_labels])),
        ]);

        Self {
            config: ModelConfig {
                vocab_size: Some(vocab_size),
                max_position_embeddings: Some(MAX_POSITIONS),
                type_vocab_size: Some(1),
                pad_token_id: Some(PAD_ID),
                num_labels,
            },
            modules,
            head,
            counts: vec![0; num_labels],
        }
    }

    pub fn majority(&self) -> usize {
        let mut best = 0;
        for (label, count) in self.counts.iter().enumerate() {
            if *count > self.counts[best] {
                best = label;
            }
        }
        best
    }

    fn one_hot(&self) -> Vec<f32> {
        let majority = self.majority();
        (0..self.config.num_labels)
            .map(|label| if label == majority { 1.0 } else { 0.0 })
            .collect()
    }

    fn count(&mut self, label: usize) -> Result<()> {
        let slot = self.counts.get_mut(label).ok_or_else(|| {
            CoreError::Model(format!(
                "Label id {} is outside the {} labels of the head",
                label, self.config.num_labels
            ))
        })?;
        *slot += 1;
        Ok(())
    }
}

impl PretrainedModel for MajorityClassModel {
    fn config(&self) -> &ModelConfig {
        &self.config
    }

    fn config_mut(&mut self) -> &mut ModelConfig {
        &mut self.config
    }

    fn modules(&self) -> &Module {
        &self.modules
    }

    fn modules_mut(&mut self) -> &mut Module {
        &mut self.modules
    }

    fn resize_token_embeddings(&mut self, new_num_tokens: usize) -> Result<()> {
        let table = self
            .modules
            .get_mut(WORD_EMBEDDINGS)
            .and_then(Module::as_embedding_mut)
            .ok_or_else(|| CoreError::Model("Model has no word embeddings".to_string()))?;
        table.resize(new_num_tokens, 0.0);
        self.config.vocab_size = Some(new_num_tokens);
        Ok(())
    }

    fn train_step(&mut self, batch: &Batch, _learning_rate: f64) -> Result<f64> {
        let labels: Vec<usize> = match (&batch.labels, self.head) {
            (BatchLabels::Classes(classes), TaskHead::SequenceClassification) => classes.clone(),
            (BatchLabels::Tags(tags), TaskHead::TokenClassification) => {
                tags.iter().flatten().flatten().copied().collect()
            }
            (BatchLabels::Spans(_), TaskHead::QuestionAnswering) => return Ok(0.0),
            _ => {
                return Err(CoreError::Model(format!(
                    "Batch labels do not fit a {:?} head",
                    self.head
                )))
            }
        };

        for label in &labels {
            self.count(*label)?;
        }

        let majority = self.majority();
        let misses = labels.iter().filter(|label| **label != majority).count();
        Ok(misses as f64 / labels.len().max(1) as f64)
    }

    fn predict(&self, batch: &Batch) -> Result<Vec<ModelOutput>> {
        let length = batch.sequence_length();
        let outputs = (0..batch.len())
            .map(|_| match self.head {
                TaskHead::SequenceClassification => ModelOutput::Sequence(self.one_hot()),
                TaskHead::TokenClassification => ModelOutput::Tokens(vec![self.one_hot(); length]),
                TaskHead::QuestionAnswering => ModelOutput::Span {
                    start: vec![0.0; length],
                    end: vec![0.0; length],
                },
            })
            .collect();
        Ok(outputs)
    }
}

// ===== Rule-based pipeline =====

/// Tags every word as outside any entity.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutsideTagger;

impl RuleBasedPipeline for OutsideTagger {
    fn tag(&self, words: &[String]) -> Result<Vec<String>> {
        Ok(vec!["O".to_string(); words.len()])
    }
}

// ===== Provider =====

#[derive(Debug, Clone, Copy)]
pub struct BaselineProvider {
    vocab_size: usize,
}

impl Default for BaselineProvider {
    fn default() -> Self {
        Self {
            vocab_size: BASELINE_VOCAB_SIZE,
        }
    }
}

impl BaselineProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vocab_size(vocab_size: usize) -> Self {
        Self { vocab_size }
    }
}

impl ModelProvider for BaselineProvider {
    fn family(&self, model_id: &str) -> Result<ModelFamily> {
        match model_id {
            MAJORITY_MODEL_ID => Ok(ModelFamily::Transformer),
            OUTSIDE_TAGGER_ID => Ok(ModelFamily::RuleBased),
            other => Err(CoreError::Model(format!("Unknown baseline model '{}'", other))),
        }
    }

    fn load(
        &self,
        model_id: &str,
        head: TaskHead,
        labels: &LabelMapping,
        _seed: u64,
    ) -> Result<LoadedModel> {
        match self.family(model_id)? {
            ModelFamily::Transformer => Ok(LoadedModel::Trainable {
                model: Box::new(MajorityClassModel::new(head, labels.len(), self.vocab_size)),
                tokenizer: Box::new(WhitespaceTokenizer::new(self.vocab_size)),
            }),
            ModelFamily::RuleBased => Ok(LoadedModel::RuleBased(Box::new(OutsideTagger))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_split_with_offsets() {
        assert_eq!(
            split_with_offsets(" Hej  med dig"),
            vec![
                ("Hej".to_string(), (1, 4)),
                ("med".to_string(), (6, 9)),
                ("dig".to_string(), (10, 13)),
            ]
        );
    }

    #[test]
    fn test_pair_encoding_segments() {
        let tokenizer = WhitespaceTokenizer::new(BASELINE_VOCAB_SIZE);
        let encoding = tokenizer
            .encode(EncodeInput::Pair("Hvor bor hun", "Hun bor i Odense"))
            .unwrap();

        assert_eq!(encoding.len(), 3 + 4 + 3);
        assert_eq!(encoding.ids[0], CLS_ID);
        assert_eq!(encoding.ids[4], SEP_ID);
        assert_eq!(encoding.sequence_ids[5], Some(1));
        assert_eq!(encoding.offsets[8], (10, 16));
        assert_eq!(encoding.type_ids[9], 1);
    }

    #[test]
    fn test_token_ids_are_case_insensitive_and_in_range() {
        let tokenizer = WhitespaceTokenizer::new(10);
        assert_eq!(tokenizer.token_id("Odense"), tokenizer.token_id("odense"));
        assert!((FIRST_WORD_ID..10).contains(&tokenizer.token_id("København")));
    }

    #[test]
    fn test_majority_ties_go_to_lowest_id() {
        let mut model = MajorityClassModel::new(TaskHead::SequenceClassification, 3, 10);
        let batch = Batch {
            input_ids: vec![vec![1], vec![1], vec![1], vec![1]],
            attention_mask: vec![vec![1]; 4],
            token_type_ids: None,
            labels: BatchLabels::Classes(vec![2, 1, 2, 1]),
        };
        model.train_step(&batch, 1e-3).unwrap();
        assert_eq!(model.majority(), 1);
    }

    #[test]
    fn test_mismatched_labels_rejected() {
        let mut model = MajorityClassModel::new(TaskHead::SequenceClassification, 2, 10);
        let batch = Batch {
            input_ids: vec![vec![1]],
            attention_mask: vec![vec![1]],
            token_type_ids: None,
            labels: BatchLabels::Spans(vec![(0, 0)]),
        };
        assert!(model.train_step(&batch, 1e-3).is_err());
    }

    #[test]
    fn test_resize_updates_config() {
        let mut model = MajorityClassModel::new(TaskHead::TokenClassification, 2, 10);
        model.resize_token_embeddings(12).unwrap();
        assert_eq!(model.config().vocab_size, Some(12));
        let table = model.modules().get(WORD_EMBEDDINGS).and_then(Module::as_embedding).unwrap();
        assert_eq!(table.shape(), (12, HIDDEN_SIZE));
    }
}
