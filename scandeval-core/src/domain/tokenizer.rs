use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PaddingSide {
    Left,
    #[default]
    Right,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SpecialToken {
    pub content: String,
    pub id: u32,
}

impl SpecialToken {
    pub fn new(content: impl Into<String>, id: u32) -> Self {
        Self {
            content: content.into(),
            id,
        }
    }
}

/// The configuration attributes of a tokenizer the harness inspects and repairs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenizerConfig {
    /// Declared maximum length. Very large values mean the tokenizer never set one.
    pub model_max_length: Option<usize>,
    /// Per-architecture maximum input sizes, keyed by checkpoint name.
    #[serde(default)]
    pub max_model_input_sizes: BTreeMap<String, Option<usize>>,
    pub vocab_size: usize,
    pub pad_token: Option<SpecialToken>,
    pub eos_token: Option<SpecialToken>,
    pub sep_token: Option<SpecialToken>,
    pub cls_token: Option<SpecialToken>,
    #[serde(default)]
    pub padding_side: PaddingSide,
}

impl TokenizerConfig {
    pub fn pad_token_id(&self) -> Option<u32> {
        self.pad_token.as_ref().map(|token| token.id)
    }
}

/// What to encode: a single text, a text pair, or pre-split words.
#[derive(Debug, Clone, Copy)]
pub enum EncodeInput<'a> {
    Single(&'a str),
    Pair(&'a str, &'a str),
    Words(&'a [String]),
}

/// Token ids of one input, with per-token alignment back to the input.
///
/// `offsets` are character offsets into the segment named by `sequence_ids`;
/// special tokens have `(0, 0)` offsets and `None` sequence and word ids.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Encoding {
    pub ids: Vec<u32>,
    pub type_ids: Vec<u32>,
    pub offsets: Vec<(usize, usize)>,
    pub sequence_ids: Vec<Option<usize>>,
    pub word_ids: Vec<Option<usize>>,
}

impl Encoding {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Whether every per-token vector has one entry per id.
    pub fn is_aligned(&self) -> bool {
        let len = self.ids.len();
        self.type_ids.len() == len
            && self.offsets.len() == len
            && self.sequence_ids.len() == len
            && self.word_ids.len() == len
    }

    /// Keeps the first `max_length` tokens.
    pub fn truncate(&mut self, max_length: usize) {
        self.ids.truncate(max_length);
        self.type_ids.truncate(max_length);
        self.offsets.truncate(max_length);
        self.sequence_ids.truncate(max_length);
        self.word_ids.truncate(max_length);
    }
}
