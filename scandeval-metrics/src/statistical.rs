use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};
use statrs::statistics::Statistics;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatisticalResult {
    pub statistic: f64,
    pub p_value: Option<f64>,
    pub confidence_interval: Option<(f64, f64)>,
    pub effect_size: Option<f64>,
}

impl StatisticalResult {
    fn undefined() -> Self {
        Self {
            statistic: 0.0,
            p_value: None,
            confidence_interval: None,
            effect_size: None,
        }
    }
}

/// Tests for comparing the per-repetition scores of two models.
pub struct StatisticalAnalyzer;

impl StatisticalAnalyzer {
    /// Student's t confidence interval for the mean. `None` below two values.
    pub fn confidence_interval(values: &[f64], confidence: f64) -> Option<(f64, f64)> {
        if values.len() < 2 {
            return None;
        }

        let mean = values.mean();
        let n = values.len() as f64;
        let t_value = StudentsT::new(0.0, 1.0, n - 1.0)
            .ok()?
            .inverse_cdf((1.0 + confidence) / 2.0);

        let margin = t_value * (values.std_dev() / n.sqrt());
        Some((mean - margin, mean + margin))
    }

    /// Welch's unequal-variance t-test.
    pub fn welch_t_test(sample1: &[f64], sample2: &[f64]) -> StatisticalResult {
        if sample1.len() < 2 || sample2.len() < 2 {
            return StatisticalResult::undefined();
        }

        let mean_diff = sample1.mean() - sample2.mean();
        let n1 = sample1.len() as f64;
        let n2 = sample2.len() as f64;
        let se1 = sample1.variance() / n1;
        let se2 = sample2.variance() / n2;
        let se = (se1 + se2).sqrt();

        if se == 0.0 {
            let p_value = if mean_diff == 0.0 { 1.0 } else { 0.0 };
            return StatisticalResult {
                statistic: if mean_diff == 0.0 { 0.0 } else { mean_diff.signum() * f64::INFINITY },
                p_value: Some(p_value),
                confidence_interval: None,
                effect_size: Some(Self::cohens_d(sample1, sample2)),
            };
        }

        let t_stat = mean_diff / se;
        // Welch-Satterthwaite degrees of freedom
        let df = (se1 + se2).powi(2) / (se1.powi(2) / (n1 - 1.0) + se2.powi(2) / (n2 - 1.0));
        let p_value = StudentsT::new(0.0, 1.0, df)
            .ok()
            .map(|t_dist| 2.0 * (1.0 - t_dist.cdf(t_stat.abs())));

        StatisticalResult {
            statistic: t_stat,
            p_value,
            confidence_interval: None,
            effect_size: Some(Self::cohens_d(sample1, sample2)),
        }
    }

    /// Seeded bootstrap of the difference in means.
    pub fn bootstrap_comparison(
        sample1: &[f64],
        sample2: &[f64],
        n_iterations: usize,
        confidence: f64,
        seed: u64,
    ) -> StatisticalResult {
        if sample1.is_empty() || sample2.is_empty() || n_iterations == 0 {
            return StatisticalResult::undefined();
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut differences: Vec<f64> = (0..n_iterations)
            .map(|_| resampled_mean(sample1, &mut rng) - resampled_mean(sample2, &mut rng))
            .collect();
        differences.sort_by(f64::total_cmp);

        let alpha = (1.0 - confidence) / 2.0;
        let last = n_iterations - 1;
        let lower_idx = ((n_iterations as f64 * alpha) as usize).min(last);
        let upper_idx = ((n_iterations as f64 * (1.0 - alpha)) as usize).min(last);

        StatisticalResult {
            statistic: sample1.mean() - sample2.mean(),
            p_value: None,
            confidence_interval: Some((differences[lower_idx], differences[upper_idx])),
            effect_size: Some(Self::cohens_d(sample1, sample2)),
        }
    }

    /// Effect size (Cohen's d) with pooled standard deviation.
    pub fn cohens_d(sample1: &[f64], sample2: &[f64]) -> f64 {
        if sample1.len() < 2 || sample2.len() < 2 {
            return 0.0;
        }

        let n1 = sample1.len() as f64;
        let n2 = sample2.len() as f64;
        let pooled_std = (((n1 - 1.0) * sample1.variance() + (n2 - 1.0) * sample2.variance())
            / (n1 + n2 - 2.0))
            .sqrt();

        if pooled_std == 0.0 {
            return 0.0;
        }

        (sample1.mean() - sample2.mean()) / pooled_std
    }
}

fn resampled_mean(sample: &[f64], rng: &mut StdRng) -> f64 {
    let sum: f64 = (0..sample.len()).filter_map(|_| sample.choose(&mut *rng)).sum();
    sum / sample.len() as f64
}
