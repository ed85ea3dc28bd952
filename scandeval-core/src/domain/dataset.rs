use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::Result;

// ===== Splits =====

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    Test,
}

impl Split {
    pub const ALL: [Split; 2] = [Split::Train, Split::Test];

    pub fn as_str(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "test",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ===== Annotations =====

/// A gold answer inside a record's context. `answer_start` counts characters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerSpan {
    pub text: String,
    pub answer_start: usize,
}

impl AnswerSpan {
    pub fn new(text: impl Into<String>, answer_start: usize) -> Self {
        Self {
            text: text.into(),
            answer_start,
        }
    }

    /// Character offset one past the last character of the answer.
    pub fn answer_end(&self) -> usize {
        self.answer_start + self.text.chars().count()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Annotation {
    /// One label for the whole document.
    Label(String),
    /// One tag per pre-split token.
    Tags(Vec<String>),
    /// Accepted answers to the question in `doc`, located in `context`.
    Answers(Vec<AnswerSpan>),
}

impl Annotation {
    pub fn kind(&self) -> &'static str {
        match self {
            Annotation::Label(_) => "label",
            Annotation::Tags(_) => "tags",
            Annotation::Answers(_) => "answers",
        }
    }

    pub fn as_label(&self) -> Option<&str> {
        match self {
            Annotation::Label(label) => Some(label),
            _ => None,
        }
    }

    pub fn as_tags(&self) -> Option<&[String]> {
        match self {
            Annotation::Tags(tags) => Some(tags),
            _ => None,
        }
    }

    pub fn as_answers(&self) -> Option<&[AnswerSpan]> {
        match self {
            Annotation::Answers(answers) => Some(answers),
            _ => None,
        }
    }
}

// ===== Records =====

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Record {
    pub doc: String,
    pub orig_label: Annotation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<Vec<String>>,
}

impl Record {
    pub fn classification(doc: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            doc: doc.into(),
            orig_label: Annotation::Label(label.into()),
            context: None,
            tokens: None,
        }
    }

    /// The document text is the tokens joined by single spaces.
    pub fn tagged(tokens: Vec<String>, tags: Vec<String>) -> Self {
        Self {
            doc: tokens.join(" "),
            orig_label: Annotation::Tags(tags),
            context: None,
            tokens: Some(tokens),
        }
    }

    pub fn question(
        question: impl Into<String>,
        context: impl Into<String>,
        answers: Vec<AnswerSpan>,
    ) -> Self {
        Self {
            doc: question.into(),
            orig_label: Annotation::Answers(answers),
            context: Some(context.into()),
            tokens: None,
        }
    }

    /// Pre-split tokens, falling back to whitespace splitting of `doc`.
    pub fn words(&self) -> Vec<String> {
        match &self.tokens {
            Some(tokens) => tokens.clone(),
            None => self.doc.split_whitespace().map(str::to_string).collect(),
        }
    }
}

// ===== Dataset =====

/// An ordered, read-only collection of records for one split.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Dataset {
    records: Vec<Record>,
}

impl Dataset {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    pub fn annotations(&self) -> impl Iterator<Item = &Annotation> {
        self.records.iter().map(|r| &r.orig_label)
    }

    /// SHA-256 of the canonical JSON form of the records, hex encoded.
    pub fn fingerprint(&self) -> Result<String> {
        let mut hasher = Sha256::new();
        for record in &self.records {
            hasher.update(serde_json::to_vec(record)?);
            hasher.update(b"\n");
        }
        Ok(hex::encode(hasher.finalize()))
    }
}

impl FromIterator<Record> for Dataset {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
