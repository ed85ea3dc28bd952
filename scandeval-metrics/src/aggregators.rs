use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use scandeval_core::{CoreError, Result, RunResult, Split, SummaryStatistic};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::{BTreeMap, BTreeSet};

/// How the standard error of the mean over repetitions is estimated.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "method")]
pub enum StdErrorMethod {
    /// Sample standard deviation divided by the square root of the count.
    #[default]
    ClosedForm,
    /// Standard deviation of the means of `iterations` seeded resamples.
    Bootstrap { iterations: usize, seed: u64 },
}

pub struct RunAggregator;

impl RunAggregator {
    /// Values of `metric` on `split`, one per repetition, in repetition order.
    pub fn values(runs: &[RunResult], split: Split, metric: &str) -> Result<Vec<f64>> {
        if runs.is_empty() {
            return Err(CoreError::Validation(
                "Cannot summarise an empty list of runs".to_string(),
            ));
        }

        runs.iter()
            .map(|run| {
                run.metric(split, metric).ok_or_else(|| {
                    CoreError::Validation(format!(
                        "Repetition {} has no '{}' score on the {} split",
                        run.repetition, metric, split
                    ))
                })
            })
            .collect()
    }

    pub fn summarize(runs: &[RunResult], split: Split, metric: &str) -> Result<SummaryStatistic> {
        Self::summarize_with(runs, split, metric, StdErrorMethod::ClosedForm)
    }

    pub fn summarize_with(
        runs: &[RunResult],
        split: Split,
        metric: &str,
        method: StdErrorMethod,
    ) -> Result<SummaryStatistic> {
        let values = Self::values(runs, split, metric)?;
        let std_err = match method {
            StdErrorMethod::ClosedForm => standard_error(&values),
            StdErrorMethod::Bootstrap { iterations, seed } => {
                bootstrap_standard_error(&values, iterations, seed)
            }
        };

        Ok(SummaryStatistic {
            mean: mean(&values),
            std_err,
            count: values.len(),
        })
    }

    /// Summary of `metric` for every split present in the runs.
    pub fn summarize_splits(
        runs: &[RunResult],
        metric: &str,
        method: StdErrorMethod,
    ) -> Result<BTreeMap<Split, SummaryStatistic>> {
        let splits: BTreeSet<Split> = runs
            .iter()
            .flat_map(|run| run.metrics.keys().copied())
            .collect();

        splits
            .into_iter()
            .map(|split| Ok((split, Self::summarize_with(runs, split, metric, method)?)))
            .collect()
    }

    /// Metric names reported by every run on `split`.
    pub fn common_metrics(runs: &[RunResult], split: Split) -> BTreeSet<String> {
        let mut runs_iter = runs.iter();
        let Some(first) = runs_iter.next() else {
            return BTreeSet::new();
        };
        let mut names: BTreeSet<String> = first
            .split(split)
            .map(|metrics| metrics.keys().cloned().collect())
            .unwrap_or_default();
        for run in runs_iter {
            names.retain(|name| run.metric(split, name).is_some());
        }
        names
    }
}

pub fn mean(values: &[f64]) -> f64 {
    values.mean()
}

/// Sample standard deviation over the square root of the count; NaN below two values.
pub fn standard_error(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    values.std_dev() / (values.len() as f64).sqrt()
}

/// Resampling estimate of the standard error of the mean; NaN below two values.
pub fn bootstrap_standard_error(values: &[f64], iterations: usize, seed: u64) -> f64 {
    if values.len() < 2 || iterations < 2 {
        return f64::NAN;
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let means: Vec<f64> = (0..iterations)
        .map(|_| {
            let sum: f64 = (0..values.len())
                .filter_map(|_| values.choose(&mut rng))
                .sum();
            sum / values.len() as f64
        })
        .collect();

    means.std_dev()
}
