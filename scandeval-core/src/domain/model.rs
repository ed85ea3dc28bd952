use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, Result};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    /// Gradient-trainable model paired with a tokenizer.
    Transformer,
    /// Fixed pipeline that produces annotations without fine-tuning.
    RuleBased,
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelFamily::Transformer => f.write_str("transformer"),
            ModelFamily::RuleBased => f.write_str("rule-based"),
        }
    }
}

/// The prediction head a provider must attach to the pretrained body.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskHead {
    SequenceClassification,
    TokenClassification,
    QuestionAnswering,
}

impl TaskHead {
    pub fn requires_token_types(&self) -> bool {
        matches!(self, TaskHead::QuestionAnswering)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelConfig {
    pub vocab_size: Option<usize>,
    pub max_position_embeddings: Option<usize>,
    pub type_vocab_size: Option<usize>,
    pub pad_token_id: Option<u32>,
    pub num_labels: usize,
}

// ===== Module tree =====

/// Row-major embedding table of shape `(num_embeddings, embedding_dim)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingTable {
    num_embeddings: usize,
    embedding_dim: usize,
    weight: Vec<f32>,
}

impl EmbeddingTable {
    pub fn zeros(num_embeddings: usize, embedding_dim: usize) -> Self {
        Self {
            num_embeddings,
            embedding_dim,
            weight: vec![0.0; num_embeddings * embedding_dim],
        }
    }

    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self> {
        let embedding_dim = rows.first().map(Vec::len).unwrap_or(0);
        if rows.iter().any(|row| row.len() != embedding_dim) {
            return Err(CoreError::Model(
                "Embedding rows must all have the same width".to_string(),
            ));
        }
        Ok(Self {
            num_embeddings: rows.len(),
            embedding_dim,
            weight: rows.into_iter().flatten().collect(),
        })
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.num_embeddings, self.embedding_dim)
    }

    pub fn num_embeddings(&self) -> usize {
        self.num_embeddings
    }

    pub fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }

    pub fn row(&self, index: usize) -> Option<&[f32]> {
        if index >= self.num_embeddings {
            return None;
        }
        let start = index * self.embedding_dim;
        Some(&self.weight[start..start + self.embedding_dim])
    }

    pub fn push_row(&mut self, row: Vec<f32>) -> Result<()> {
        if row.len() != self.embedding_dim {
            return Err(CoreError::Model(format!(
                "Cannot append a row of width {} to an embedding table of width {}",
                row.len(),
                self.embedding_dim
            )));
        }
        self.weight.extend(row);
        self.num_embeddings += 1;
        Ok(())
    }

    /// Grows or shrinks to `num_embeddings` rows; new rows are filled with `fill`.
    pub fn resize(&mut self, num_embeddings: usize, fill: f32) {
        self.weight.resize(num_embeddings * self.embedding_dim, fill);
        self.num_embeddings = num_embeddings;
    }
}

/// A node of a model's module tree: either named children or a leaf.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Module {
    Container(Vec<(String, Module)>),
    Embedding(EmbeddingTable),
    Parameter(Vec<usize>),
}

impl Module {
    pub fn container<S: Into<String>>(children: Vec<(S, Module)>) -> Self {
        Module::Container(
            children
                .into_iter()
                .map(|(name, module)| (name.into(), module))
                .collect(),
        )
    }

    pub fn is_leaf(&self) -> bool {
        match self {
            Module::Container(children) => children.is_empty(),
            _ => true,
        }
    }

    pub fn children(&self) -> &[(String, Module)] {
        match self {
            Module::Container(children) => children,
            _ => &[],
        }
    }

    pub fn as_embedding(&self) -> Option<&EmbeddingTable> {
        match self {
            Module::Embedding(table) => Some(table),
            _ => None,
        }
    }

    pub fn as_embedding_mut(&mut self) -> Option<&mut EmbeddingTable> {
        match self {
            Module::Embedding(table) => Some(table),
            _ => None,
        }
    }

    /// Depth-first, in child order, search for the first leaf called `name`.
    ///
    /// Returns the dotted path from this node, e.g. `bert.embeddings.token_type_embeddings`.
    pub fn find_leaf(&self, name: &str) -> Option<String> {
        let mut stack: Vec<(Vec<&str>, &Module)> = vec![(Vec::new(), self)];

        while let Some((path, module)) = stack.pop() {
            if module.is_leaf() {
                if path.last() == Some(&name) {
                    return Some(path.join("."));
                }
                continue;
            }
            // Reverse so the first child is popped first
            for (child_name, child) in module.children().iter().rev() {
                let mut child_path = path.clone();
                child_path.push(child_name.as_str());
                stack.push((child_path, child));
            }
        }

        None
    }

    pub fn get(&self, path: &str) -> Option<&Module> {
        path.split('.')
            .filter(|segment| !segment.is_empty())
            .try_fold(self, |module, segment| {
                module
                    .children()
                    .iter()
                    .find(|(child_name, _)| child_name == segment)
                    .map(|(_, child)| child)
            })
    }

    pub fn get_mut(&mut self, path: &str) -> Option<&mut Module> {
        let mut module = self;
        for segment in path.split('.').filter(|segment| !segment.is_empty()) {
            module = match module {
                Module::Container(children) => children
                    .iter_mut()
                    .find(|(child_name, _)| child_name == segment)
                    .map(|(_, child)| child)?,
                _ => return None,
            };
        }
        Some(module)
    }

    /// Dotted paths of every leaf, depth-first.
    pub fn leaf_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        collect_leaf_paths(self, &mut Vec::new(), &mut paths);
        paths
    }
}

fn collect_leaf_paths<'a>(module: &'a Module, path: &mut Vec<&'a str>, out: &mut Vec<String>) {
    if module.is_leaf() {
        out.push(path.join("."));
        return;
    }
    for (name, child) in module.children() {
        path.push(name);
        collect_leaf_paths(child, path, out);
        path.pop();
    }
}
