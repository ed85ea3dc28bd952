use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

use super::dataset::Split;

/// Metric name to value, for one split of one repetition.
pub type MetricMap = BTreeMap<String, f64>;

/// Metrics of a single fine-tuning repetition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunResult {
    pub repetition: usize,
    pub seed: u64,
    pub metrics: BTreeMap<Split, MetricMap>,
}

impl RunResult {
    pub fn new(repetition: usize, seed: u64) -> Self {
        Self {
            repetition,
            seed,
            metrics: BTreeMap::new(),
        }
    }

    pub fn with_split(mut self, split: Split, metrics: MetricMap) -> Self {
        self.metrics.insert(split, metrics);
        self
    }

    pub fn split(&self, split: Split) -> Option<&MetricMap> {
        self.metrics.get(&split)
    }

    pub fn metric(&self, split: Split, name: &str) -> Option<f64> {
        self.metrics.get(&split).and_then(|m| m.get(name)).copied()
    }
}

/// Mean and standard error of one metric over the repetitions of a split.
///
/// `std_err` is NaN when a single repetition was run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SummaryStatistic {
    pub mean: f64,
    #[serde(serialize_with = "nan_as_null", deserialize_with = "null_as_nan")]
    pub std_err: f64,
    pub count: usize,
}

impl SummaryStatistic {
    pub fn has_std_err(&self) -> bool {
        !self.std_err.is_nan()
    }

    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            mean: self.mean * factor,
            std_err: self.std_err * factor,
            count: self.count,
        }
    }
}

impl PartialEq for SummaryStatistic {
    fn eq(&self, other: &Self) -> bool {
        let std_err_eq = (self.std_err.is_nan() && other.std_err.is_nan())
            || self.std_err == other.std_err;
        self.mean == other.mean && std_err_eq && self.count == other.count
    }
}

fn nan_as_null<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_nan() {
        serializer.serialize_none()
    } else {
        serializer.serialize_some(value)
    }
}

fn null_as_nan<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}
