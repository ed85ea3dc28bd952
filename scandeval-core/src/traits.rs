use crate::domain::{
    Batch, EncodeInput, Encoding, LabelMapping, MetricMap, ModelConfig, ModelFamily, ModelOutput,
    Module, TaskHead, TokenizerConfig,
};
use crate::error::Result;

/// Turns text into token ids. The algorithm is opaque to the harness.
pub trait Tokenizer: Send {
    fn config(&self) -> &TokenizerConfig;

    fn config_mut(&mut self) -> &mut TokenizerConfig;

    /// Encodes with special tokens and without truncation or padding.
    fn encode(&self, input: EncodeInput<'_>) -> Result<Encoding>;
}

/// A pretrained model with a task head, trainable by gradient updates.
pub trait PretrainedModel: Send {
    fn config(&self) -> &ModelConfig;

    fn config_mut(&mut self) -> &mut ModelConfig;

    fn modules(&self) -> &Module;

    fn modules_mut(&mut self) -> &mut Module;

    /// Resizes the input embedding table; `config().vocab_size` follows.
    fn resize_token_embeddings(&mut self, new_num_tokens: usize) -> Result<()>;

    /// Performs one optimisation step and returns the batch loss.
    fn train_step(&mut self, batch: &Batch, learning_rate: f64) -> Result<f64>;

    /// Scores every example of the batch, in order.
    fn predict(&self, batch: &Batch) -> Result<Vec<ModelOutput>>;
}

/// A fixed annotation pipeline that is evaluated without fine-tuning.
pub trait RuleBasedPipeline: Send {
    /// One tag per word.
    fn tag(&self, words: &[String]) -> Result<Vec<String>>;
}

pub enum LoadedModel {
    Trainable {
        model: Box<dyn PretrainedModel>,
        tokenizer: Box<dyn Tokenizer>,
    },
    RuleBased(Box<dyn RuleBasedPipeline>),
}

impl LoadedModel {
    pub fn family(&self) -> ModelFamily {
        match self {
            LoadedModel::Trainable { .. } => ModelFamily::Transformer,
            LoadedModel::RuleBased(_) => ModelFamily::RuleBased,
        }
    }
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LoadedModel({})", self.family())
    }
}

/// Supplies pretrained models by identifier.
pub trait ModelProvider: Send + Sync {
    /// The family `model_id` belongs to, known without loading weights.
    fn family(&self, model_id: &str) -> Result<ModelFamily>;

    /// Loads a fresh copy of the model with the given head. `seed` drives head initialisation.
    fn load(
        &self,
        model_id: &str,
        head: TaskHead,
        labels: &LabelMapping,
        seed: u64,
    ) -> Result<LoadedModel>;
}

/// Reduces predictions and references to named scores. Must be pure.
pub trait MetricCalculator {
    type Prediction;
    type Reference;

    fn calculate(
        &self,
        predictions: &[Self::Prediction],
        references: &[Self::Reference],
    ) -> Result<MetricMap>;
}
