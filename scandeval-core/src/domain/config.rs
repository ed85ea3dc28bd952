use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::Result;

/// Fine-tuning hyperparameters shared by every repetition of a benchmark.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct TrainingArgs {
    #[validate(range(exclusive_min = 0.0))]
    pub learning_rate: f64,
    /// Steps over which the learning rate rises linearly from zero to `learning_rate`.
    pub warmup_steps: usize,
    #[validate(range(min = 1))]
    pub batch_size: usize,
    #[validate(range(min = 1))]
    pub epochs: usize,
    #[validate(range(min = 1))]
    pub num_repetitions: usize,
    /// Repetition `i` runs with seed `seed + i`.
    pub seed: u64,
}

impl Default for TrainingArgs {
    fn default() -> Self {
        Self {
            learning_rate: 2e-5,
            warmup_steps: 50,
            batch_size: 16,
            epochs: 5,
            num_repetitions: 10,
            seed: 4242,
        }
    }
}

impl TrainingArgs {
    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_warmup_steps(mut self, warmup_steps: usize) -> Self {
        self.warmup_steps = warmup_steps;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_num_repetitions(mut self, num_repetitions: usize) -> Self {
        self.num_repetitions = num_repetitions;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validated(self) -> Result<Self> {
        self.validate()?;
        Ok(self)
    }

    pub fn seed_for(&self, repetition: usize) -> u64 {
        self.seed.wrapping_add(repetition as u64)
    }
}
