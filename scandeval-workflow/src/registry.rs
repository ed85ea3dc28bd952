use scandeval_core::{CoreError, Result};
use scandeval_metrics::MACRO_F1;

use crate::benchmark::BenchmarkConfig;
use crate::loader::{DatasetLocation, FieldMapping};
use crate::task::TaskKind;

pub const ANGRY_TWEETS: &str = "angry_tweets";

const DATASETS_BASE_URL: &str = "https://raw.githubusercontent.com/saattrupdan/ScandEval/main/datasets/";

/// Names of every built-in benchmark.
pub fn available_benchmarks() -> &'static [&'static str] {
    &[ANGRY_TWEETS]
}

pub fn benchmark_config(name: &str) -> Result<BenchmarkConfig> {
    match name {
        ANGRY_TWEETS => angry_tweets(),
        other => Err(CoreError::Configuration(format!(
            "Unknown benchmark '{}'. Available benchmarks: {}",
            other,
            available_benchmarks().join(", ")
        ))),
    }
}

/// Danish tweet sentiment, three classes.
pub fn angry_tweets() -> Result<BenchmarkConfig> {
    Ok(BenchmarkConfig {
        name: ANGRY_TWEETS.to_string(),
        pretty_name: "AngryTweets".to_string(),
        task: TaskKind::Classification,
        location: DatasetLocation::from_base(
            &format!("{}{}/", DATASETS_BASE_URL, ANGRY_TWEETS),
            "train.jsonl",
            "test.jsonl",
        )?,
        fields: FieldMapping::new("tweet", "label"),
        labels: vec![
            "neutral".to_string(),
            "positiv".to_string(),
            "negativ".to_string(),
        ],
        epochs: 5,
        metric: MACRO_F1.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_angry_tweets_urls() {
        let config = benchmark_config(ANGRY_TWEETS).unwrap();
        assert_eq!(
            config.location.train.as_str(),
            "https://raw.githubusercontent.com/saattrupdan/ScandEval/main/datasets/angry_tweets/train.jsonl"
        );
        assert_eq!(config.labels, vec!["neutral", "positiv", "negativ"]);
    }

    #[test]
    fn test_unknown_benchmark() {
        assert!(matches!(
            benchmark_config("dane"),
            Err(CoreError::Configuration(_))
        ));
    }
}
