use chrono::{DateTime, Utc};
use scandeval_core::{
    CoreError, Dataset, LabelMapping, LoadedModel, ModelFamily, ModelProvider, Result, RunResult,
    Split, SummaryStatistic, TrainingArgs,
};
use scandeval_metrics::{RunAggregator, StatisticalAnalyzer, StatisticalResult, StdErrorMethod};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::align::ConflictPolicy;
use crate::loader::{DatasetLoader, DatasetLocation, DatasetSource, FieldMapping, HttpSource};
use crate::reporting::format_summary;
use crate::task::TaskKind;
use crate::trainer::RepeatedRunTrainer;

/// Everything that defines one benchmark dataset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct BenchmarkConfig {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub pretty_name: String,
    pub task: TaskKind,
    pub location: DatasetLocation,
    pub fields: FieldMapping,
    #[validate(length(min = 1))]
    pub labels: Vec<String>,
    #[validate(range(min = 1))]
    pub epochs: usize,
    /// Metric the summary is reported in.
    pub metric: String,
}

impl BenchmarkConfig {
    pub fn metric_pretty_name(&self) -> &'static str {
        TaskKind::metric_pretty_name(&self.metric)
    }
}

/// A benchmark dataset ready to evaluate models.
pub struct Benchmark {
    config: BenchmarkConfig,
    labels: LabelMapping,
    args: TrainingArgs,
    policy: ConflictPolicy,
    std_error: StdErrorMethod,
    source: Arc<dyn DatasetSource>,
}

impl Benchmark {
    /// The epoch count of `config` replaces the one in `args`.
    pub fn new(config: BenchmarkConfig, args: TrainingArgs) -> Result<Self> {
        config.validate()?;
        if !config.task.metrics().iter().any(|metric| *metric == config.metric) {
            return Err(CoreError::invalid_benchmark(format!(
                "Metric '{}' is not reported by {} benchmarks",
                config.metric, config.task
            )));
        }

        let labels = LabelMapping::new(config.labels.iter().cloned())?;
        let args = args.with_epochs(config.epochs).validated()?;
        let source = Arc::new(HttpSource::new(config.location.clone())?);

        Ok(Self {
            config,
            labels,
            args,
            policy: ConflictPolicy::default(),
            std_error: StdErrorMethod::default(),
            source,
        })
    }

    pub fn with_source(mut self, source: Arc<dyn DatasetSource>) -> Self {
        self.source = source;
        self
    }

    pub fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_std_error_method(mut self, method: StdErrorMethod) -> Self {
        self.std_error = method;
        self
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    pub fn labels(&self) -> &LabelMapping {
        &self.labels
    }

    pub fn args(&self) -> &TrainingArgs {
        &self.args
    }

    pub async fn load_data(&self) -> Result<(Dataset, Dataset)> {
        DatasetLoader::new(self.source.clone(), self.config.fields.clone(), self.config.task)
            .load()
            .await
    }

    /// Loads the dataset and evaluates `model_id` on it.
    ///
    /// Unsupported model families are rejected before any data is fetched.
    pub async fn benchmark(
        &self,
        provider: &dyn ModelProvider,
        model_id: &str,
    ) -> Result<BenchmarkReport> {
        let family = provider.family(model_id)?;
        self.config.task.ensure_supported(family)?;

        let (train, test) = self.load_data().await?;
        self.evaluate(provider, model_id, &train, &test)
    }

    /// Evaluates `model_id` on already loaded splits.
    pub fn evaluate(
        &self,
        provider: &dyn ModelProvider,
        model_id: &str,
        train: &Dataset,
        test: &Dataset,
    ) -> Result<BenchmarkReport> {
        let family = provider.family(model_id)?;
        self.config.task.ensure_supported(family)?;

        tracing::info!(
            benchmark = %self.config.name,
            model_id,
            %family,
            "Benchmarking model"
        );

        let runs = match family {
            ModelFamily::Transformer => RepeatedRunTrainer::new(
                provider,
                self.config.task,
                &self.labels,
                self.args.clone(),
                self.policy,
            )?
            .run(model_id, train, test)?,
            ModelFamily::RuleBased => {
                vec![self.evaluate_rule_based(provider, model_id, train, test)?]
            }
        };

        let report = self.report(model_id, family, runs, train, test)?;
        tracing::info!("{}", report.summary_text());
        Ok(report)
    }

    fn evaluate_rule_based(
        &self,
        provider: &dyn ModelProvider,
        model_id: &str,
        train: &Dataset,
        test: &Dataset,
    ) -> Result<RunResult> {
        let seed = self.args.seed_for(0);
        let pipeline = match provider.load(model_id, self.config.task.head(), &self.labels, seed)? {
            LoadedModel::RuleBased(pipeline) => pipeline,
            LoadedModel::Trainable { .. } => {
                return Err(CoreError::Model(format!(
                    "Provider returned a trainable model for rule-based '{}'",
                    model_id
                )))
            }
        };

        let task = self.config.task;
        Ok(RunResult::new(0, seed)
            .with_split(Split::Train, task.evaluate_rule_based(train, pipeline.as_ref())?)
            .with_split(Split::Test, task.evaluate_rule_based(test, pipeline.as_ref())?))
    }

    fn report(
        &self,
        model_id: &str,
        family: ModelFamily,
        runs: Vec<RunResult>,
        train: &Dataset,
        test: &Dataset,
    ) -> Result<BenchmarkReport> {
        let summary = self
            .config
            .task
            .metrics()
            .iter()
            .map(|metric| {
                let by_split = RunAggregator::summarize_splits(&runs, metric, self.std_error)?;
                Ok((metric.to_string(), by_split))
            })
            .collect::<Result<BTreeMap<_, _>>>()?;

        Ok(BenchmarkReport {
            id: Uuid::new_v4(),
            benchmark: self.config.name.clone(),
            pretty_name: self.config.pretty_name.clone(),
            task: self.config.task,
            model_id: model_id.to_string(),
            model_family: family,
            primary_metric: self.config.metric.clone(),
            metric_pretty_name: self.config.metric_pretty_name().to_string(),
            scaled: self.config.task.scales_scores(),
            training_args: self.args.clone(),
            conflict_policy: self.policy,
            std_error_method: self.std_error,
            train_fingerprint: train.fingerprint()?,
            test_fingerprint: test.fingerprint()?,
            runs,
            summary,
            generated_at: Utc::now(),
        })
    }
}

/// The outcome of benchmarking one model on one dataset.
///
/// Summary statistics are kept on the metric's own scale; `scaled` says whether
/// they are multiplied by 100 for display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BenchmarkReport {
    pub id: Uuid,
    pub benchmark: String,
    pub pretty_name: String,
    pub task: TaskKind,
    pub model_id: String,
    pub model_family: ModelFamily,
    pub primary_metric: String,
    pub metric_pretty_name: String,
    pub scaled: bool,
    pub training_args: TrainingArgs,
    pub conflict_policy: ConflictPolicy,
    pub std_error_method: StdErrorMethod,
    pub train_fingerprint: String,
    pub test_fingerprint: String,
    pub runs: Vec<RunResult>,
    /// Metric name to split to summary.
    pub summary: BTreeMap<String, BTreeMap<Split, SummaryStatistic>>,
    pub generated_at: DateTime<Utc>,
}

impl BenchmarkReport {
    pub fn statistic(&self, metric: &str, split: Split) -> Option<&SummaryStatistic> {
        self.summary.get(metric).and_then(|by_split| by_split.get(&split))
    }

    pub fn primary(&self, split: Split) -> Option<&SummaryStatistic> {
        self.statistic(&self.primary_metric, split)
    }

    /// Welch's t-test of the primary metric against another model on the same benchmark.
    pub fn compare(&self, other: &BenchmarkReport, split: Split) -> Result<StatisticalResult> {
        if self.benchmark != other.benchmark || self.primary_metric != other.primary_metric {
            return Err(CoreError::Validation(format!(
                "Cannot compare {} on {} with {} on {}",
                self.primary_metric, self.benchmark, other.primary_metric, other.benchmark
            )));
        }
        let ours = RunAggregator::values(&self.runs, split, &self.primary_metric)?;
        let theirs = RunAggregator::values(&other.runs, split, &other.primary_metric)?;
        Ok(StatisticalAnalyzer::welch_t_test(&ours, &theirs))
    }

    /// The human-readable summary of the primary metric.
    pub fn summary_text(&self) -> String {
        let missing = SummaryStatistic {
            mean: f64::NAN,
            std_err: f64::NAN,
            count: 0,
        };
        format_summary(
            TaskKind::metric_pretty_plural(&self.primary_metric),
            &self.pretty_name,
            &self.model_id,
            self.primary(Split::Train).unwrap_or(&missing),
            self.primary(Split::Test).unwrap_or(&missing),
            self.scaled,
        )
    }
}
