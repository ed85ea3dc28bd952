use anyhow::Result;
use config::{Config as ConfigLoader, Environment, File};
use scandeval_core::TrainingArgs;
use scandeval_workflow::{ReportFormat, ANGRY_TWEETS, MAJORITY_MODEL_ID};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Values that replace the benchmark defaults when set.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrainingOverrides {
    pub learning_rate: Option<f64>,
    pub warmup_steps: Option<usize>,
    pub batch_size: Option<usize>,
    pub num_repetitions: Option<usize>,
    pub seed: Option<u64>,
}

impl TrainingOverrides {
    pub fn apply(&self, mut args: TrainingArgs) -> TrainingArgs {
        if let Some(learning_rate) = self.learning_rate {
            args = args.with_learning_rate(learning_rate);
        }
        if let Some(warmup_steps) = self.warmup_steps {
            args = args.with_warmup_steps(warmup_steps);
        }
        if let Some(batch_size) = self.batch_size {
            args = args.with_batch_size(batch_size);
        }
        if let Some(num_repetitions) = self.num_repetitions {
            args = args.with_num_repetitions(num_repetitions);
        }
        if let Some(seed) = self.seed {
            args = args.with_seed(seed);
        }
        args
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub models: Vec<String>,
    pub benchmarks: Vec<String>,
    pub training: TrainingOverrides,
    /// Fail on model/tokenizer conflicts instead of repairing them.
    pub raise_errors: bool,
    pub log_level: String,
    pub log_format: LogFormat,
    pub report_dir: PathBuf,
    pub report_formats: Vec<ReportFormat>,
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("config"))
    }

    pub fn load_from(dir: &Path) -> Result<Self> {
        let config = ConfigLoader::builder()
            .add_source(File::with_name(&dir.join("default").to_string_lossy()).required(false))
            .add_source(File::with_name(&dir.join("local").to_string_lossy()).required(false))
            .add_source(
                Environment::with_prefix("SCANDEVAL")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("models")
                    .with_list_parse_key("benchmarks")
                    .with_list_parse_key("report_formats"),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            models: vec![MAJORITY_MODEL_ID.to_string()],
            benchmarks: vec![ANGRY_TWEETS.to_string()],
            training: TrainingOverrides::default(),
            raise_errors: false,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            report_dir: PathBuf::from("reports"),
            report_formats: vec![ReportFormat::Json],
        }
    }
}
