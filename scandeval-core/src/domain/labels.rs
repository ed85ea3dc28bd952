use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{CoreError, Result};

/// Bijection between label names and the dense ids `0..n`.
///
/// Fixed at construction; ids follow the order the names were given in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct LabelMapping {
    id2label: Vec<String>,
    label2id: HashMap<String, usize>,
}

impl LabelMapping {
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let id2label: Vec<String> = names.into_iter().map(Into::into).collect();
        if id2label.is_empty() {
            return Err(CoreError::invalid_benchmark(
                "A benchmark needs at least one label",
            ));
        }

        let mut label2id = HashMap::with_capacity(id2label.len());
        for (id, name) in id2label.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(CoreError::invalid_benchmark(format!(
                    "Label {} has an empty name",
                    id
                )));
            }
            if label2id.insert(name.clone(), id).is_some() {
                return Err(CoreError::invalid_benchmark(format!(
                    "Label '{}' is listed more than once",
                    name
                )));
            }
        }

        Ok(Self { id2label, label2id })
    }

    pub fn len(&self) -> usize {
        self.id2label.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id2label.is_empty()
    }

    pub fn id(&self, name: &str) -> Option<usize> {
        self.label2id.get(name).copied()
    }

    pub fn label(&self, id: usize) -> Option<&str> {
        self.id2label.get(id).map(String::as_str)
    }

    /// Like [`LabelMapping::id`], failing for labels outside the benchmark's label set.
    pub fn require_id(&self, name: &str) -> Result<usize> {
        self.id(name).ok_or_else(|| {
            CoreError::invalid_benchmark(format!(
                "Label '{}' is not one of the benchmark labels {:?}",
                name, self.id2label
            ))
        })
    }

    pub fn names(&self) -> &[String] {
        &self.id2label
    }

    pub fn label2id(&self) -> &HashMap<String, usize> {
        &self.label2id
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.id2label.iter().enumerate().map(|(id, name)| (id, name.as_str()))
    }
}

impl TryFrom<Vec<String>> for LabelMapping {
    type Error = CoreError;

    fn try_from(names: Vec<String>) -> Result<Self> {
        Self::new(names)
    }
}

impl From<LabelMapping> for Vec<String> {
    fn from(mapping: LabelMapping) -> Self {
        mapping.id2label
    }
}
