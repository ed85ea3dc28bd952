use serde::{Deserialize, Serialize};

/// Gold targets of a batch, in the shape the task head trains on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BatchLabels {
    Classes(Vec<usize>),
    /// One entry per token; `None` for tokens excluded from the loss.
    Tags(Vec<Vec<Option<usize>>>),
    /// Start and end token positions of the answer.
    Spans(Vec<(usize, usize)>),
}

impl BatchLabels {
    pub fn len(&self) -> usize {
        match self {
            BatchLabels::Classes(classes) => classes.len(),
            BatchLabels::Tags(tags) => tags.len(),
            BatchLabels::Spans(spans) => spans.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A padded batch of encoded examples.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Batch {
    pub input_ids: Vec<Vec<u32>>,
    pub attention_mask: Vec<Vec<u8>>,
    pub token_type_ids: Option<Vec<Vec<u32>>>,
    pub labels: BatchLabels,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }

    /// Length of every row after padding.
    pub fn sequence_length(&self) -> usize {
        self.input_ids.first().map(Vec::len).unwrap_or(0)
    }
}

/// Raw scores produced by a model for one example.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ModelOutput {
    /// One score per class.
    Sequence(Vec<f32>),
    /// One score vector per token.
    Tokens(Vec<Vec<f32>>),
    /// Start and end scores per token.
    Span { start: Vec<f32>, end: Vec<f32> },
}
