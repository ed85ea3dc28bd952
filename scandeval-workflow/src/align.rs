use rand::Rng;
use scandeval_core::{
    CoreError, ModelConfig, PaddingSide, PretrainedModel, Result, SpecialToken, Tokenizer,
    TokenizerConfig,
};
use serde::{Deserialize, Serialize};

/// Declared tokenizer lengths at or above this value mean the length was never set.
pub const UNSET_MAX_LENGTH_SENTINEL: usize = 100_000;

/// Used when neither the model nor the tokenizer constrain the sequence length.
pub const DEFAULT_MAX_LENGTH: usize = 512;

pub const TOKEN_TYPE_EMBEDDINGS: &str = "token_type_embeddings";

/// What to do when the model and tokenizer disagree in a way that can be patched.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Patch the model or tokenizer and carry on.
    #[default]
    Repair,
    /// Fail with `InvalidBenchmark` instead of patching.
    Raise,
}

impl ConflictPolicy {
    pub fn from_raise_errors(raise_errors: bool) -> Self {
        if raise_errors {
            ConflictPolicy::Raise
        } else {
            ConflictPolicy::Repair
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PadTokenSource {
    Eos,
    Sep,
}

/// The changes an alignment made.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlignmentReport {
    pub max_length: usize,
    pub resized_vocab_to: Option<usize>,
    pub pad_token_from: Option<PadTokenSource>,
    pub expanded_token_type_embeddings: bool,
}

/// Reconciles a freshly loaded model with its tokenizer so it can be fine-tuned.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelAligner {
    policy: ConflictPolicy,
    token_types: bool,
}

impl ModelAligner {
    pub fn new(policy: ConflictPolicy) -> Self {
        Self {
            policy,
            token_types: false,
        }
    }

    /// Also make sure the model has two token-type embeddings.
    pub fn with_token_types(mut self, token_types: bool) -> Self {
        self.token_types = token_types;
        self
    }

    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    /// Aligns the pair in place.
    ///
    /// Every fatal condition is checked before anything is changed, so a failed
    /// alignment leaves both the model and the tokenizer untouched.
    pub fn align<R: Rng>(
        &self,
        model: &mut dyn PretrainedModel,
        tokenizer: &mut dyn Tokenizer,
        rng: &mut R,
    ) -> Result<AlignmentReport> {
        let max_length = effective_max_length(model.config(), tokenizer.config());
        let vocab_conflict = vocab_conflict(model.config(), tokenizer.config());
        let pad_fallback = pad_token_fallback(tokenizer.config())?;

        if let Some((model_vocab, tokenizer_vocab)) = vocab_conflict {
            if self.policy == ConflictPolicy::Raise {
                return Err(CoreError::invalid_benchmark(format!(
                    "The vocab size of the tokenizer ({}) is larger than the vocab size of \
                     the model ({}). As errors are raised on conflicts, the embeddings of \
                     the model will not be automatically adjusted.",
                    tokenizer_vocab, model_vocab
                )));
            }
        }

        let mut report = AlignmentReport {
            max_length,
            ..Default::default()
        };

        tokenizer.config_mut().model_max_length = Some(max_length);
        tracing::debug!(max_length, "Set tokenizer maximum length");

        if let Some((model_vocab, tokenizer_vocab)) = vocab_conflict {
            let new_size = tokenizer_vocab + 1;
            tracing::warn!(
                model_vocab,
                tokenizer_vocab,
                new_size,
                "Resizing model embeddings to fit the tokenizer vocabulary"
            );
            model.resize_token_embeddings(new_size)?;
            report.resized_vocab_to = Some(new_size);
        }

        if let Some((source, token)) = pad_fallback {
            tracing::warn!(
                token = %token.content,
                ?source,
                "Tokenizer has no padding token, reusing another special token with left padding"
            );
            let config = tokenizer.config_mut();
            config.padding_side = PaddingSide::Left;
            config.pad_token = Some(token);
            model.config_mut().pad_token_id = tokenizer.config().pad_token_id();
            report.pad_token_from = Some(source);
        }

        if self.token_types {
            report.expanded_token_type_embeddings = expand_token_type_embeddings(model, rng)?;
        }

        Ok(report)
    }
}

/// The smallest of every length constraint the pair advertises.
pub fn effective_max_length(model: &ModelConfig, tokenizer: &TokenizerConfig) -> usize {
    let mut lengths: Vec<usize> = Vec::new();

    if let Some(declared) = tokenizer.model_max_length {
        if declared < UNSET_MAX_LENGTH_SENTINEL {
            lengths.push(declared);
        }
    }

    // Position ids start after the padding index in some architectures
    if let (Some(positions), Some(pad_id)) = (model.max_position_embeddings, tokenizer.pad_token_id()) {
        if let Some(length) = positions.checked_sub(pad_id as usize + 1) {
            if length > 0 {
                lengths.push(length);
            }
        }
    }

    lengths.extend(tokenizer.max_model_input_sizes.values().flatten().copied());

    lengths.into_iter().min().unwrap_or(DEFAULT_MAX_LENGTH)
}

fn vocab_conflict(model: &ModelConfig, tokenizer: &TokenizerConfig) -> Option<(usize, usize)> {
    match model.vocab_size {
        Some(model_vocab) if model_vocab < tokenizer.vocab_size => {
            Some((model_vocab, tokenizer.vocab_size))
        }
        _ => None,
    }
}

fn pad_token_fallback(tokenizer: &TokenizerConfig) -> Result<Option<(PadTokenSource, SpecialToken)>> {
    if tokenizer.pad_token.is_some() {
        return Ok(None);
    }
    if let Some(eos) = &tokenizer.eos_token {
        return Ok(Some((PadTokenSource::Eos, eos.clone())));
    }
    if let Some(sep) = &tokenizer.sep_token {
        return Ok(Some((PadTokenSource::Sep, sep.clone())));
    }
    Err(CoreError::invalid_benchmark(
        "The tokenizer does not have a padding token and does not have a SEP token or EOS \
         token to use as a padding token.",
    ))
}

/// Grows a single-row token-type embedding table to two rows.
///
/// The new row is drawn uniformly from `[0, 1)`. Returns whether the table was grown;
/// tables with more than one row and models without one are left alone.
pub fn expand_token_type_embeddings<R: Rng>(
    model: &mut dyn PretrainedModel,
    rng: &mut R,
) -> Result<bool> {
    let Some(path) = model.modules().find_leaf(TOKEN_TYPE_EMBEDDINGS) else {
        return Ok(false);
    };

    let Some(table) = model
        .modules_mut()
        .get_mut(&path)
        .and_then(|module| module.as_embedding_mut())
    else {
        return Err(CoreError::Model(format!(
            "Module '{}' is not an embedding table",
            path
        )));
    };

    if table.num_embeddings() != 1 {
        return Ok(false);
    }

    let row: Vec<f32> = (0..table.embedding_dim()).map(|_| rng.gen::<f32>()).collect();
    table.push_row(row)?;
    model.config_mut().type_vocab_size = Some(2);
    tracing::debug!(module = %path, "Expanded token type embeddings to two rows");

    Ok(true)
}
