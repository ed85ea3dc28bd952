use scandeval_metrics::statistical::StatisticalAnalyzer;

// ===== Confidence Interval Tests =====

#[test]
fn test_confidence_interval_contains_mean() {
    let values = vec![10.0, 12.0, 13.0, 11.0, 14.0, 15.0, 13.0, 12.0, 11.0, 14.0];
    let (lower, upper) = StatisticalAnalyzer::confidence_interval(&values, 0.95).unwrap();

    let mean = values.iter().sum::<f64>() / values.len() as f64;
    assert!(lower < mean && mean < upper);
}

#[test]
fn test_confidence_interval_small_sample() {
    assert!(StatisticalAnalyzer::confidence_interval(&[10.0], 0.95).is_none());
}

#[test]
fn test_confidence_interval_different_levels() {
    let values = vec![10.0, 12.0, 13.0, 11.0, 14.0, 15.0, 13.0, 12.0, 11.0, 14.0];

    let (lower_90, upper_90) = StatisticalAnalyzer::confidence_interval(&values, 0.90).unwrap();
    let (lower_99, upper_99) = StatisticalAnalyzer::confidence_interval(&values, 0.99).unwrap();

    assert!(upper_99 > upper_90);
    assert!(lower_99 < lower_90);
}

// ===== Welch T-Test Tests =====

#[test]
fn test_t_test_identical_samples() {
    let sample = vec![10.0, 11.0, 12.0, 13.0, 14.0];
    let result = StatisticalAnalyzer::welch_t_test(&sample, &sample);

    assert!(result.statistic.abs() < 1e-12);
    assert!(result.p_value.unwrap() > 0.99);
}

#[test]
fn test_t_test_different_samples() {
    let sample1 = vec![10.0, 11.0, 12.0, 13.0, 14.0];
    let sample2 = vec![20.0, 21.0, 22.0, 23.0, 24.0];
    let result = StatisticalAnalyzer::welch_t_test(&sample1, &sample2);

    assert!(result.statistic < -5.0);
    assert!(result.p_value.unwrap() < 0.01);
    assert!(result.effect_size.unwrap() < 0.0);
}

#[test]
fn test_t_test_constant_samples() {
    let result = StatisticalAnalyzer::welch_t_test(&[0.5, 0.5], &[0.4, 0.4]);
    assert_eq!(result.p_value, Some(0.0));
    assert!(result.statistic.is_infinite());
}

#[test]
fn test_t_test_too_few_values() {
    let result = StatisticalAnalyzer::welch_t_test(&[0.5], &[0.4, 0.3]);
    assert!(result.p_value.is_none());
}

// ===== Bootstrap & Effect Size Tests =====

#[test]
fn test_bootstrap_comparison_is_seeded() {
    let sample1 = vec![0.60, 0.62, 0.61, 0.63, 0.59];
    let sample2 = vec![0.50, 0.52, 0.51, 0.49, 0.50];

    let a = StatisticalAnalyzer::bootstrap_comparison(&sample1, &sample2, 500, 0.95, 3);
    let b = StatisticalAnalyzer::bootstrap_comparison(&sample1, &sample2, 500, 0.95, 3);
    assert_eq!(a, b);

    let (lower, upper) = a.confidence_interval.unwrap();
    assert!(lower > 0.0);
    assert!(lower <= a.statistic && a.statistic <= upper);
}

#[test]
fn test_cohens_d() {
    let d = StatisticalAnalyzer::cohens_d(&[1.0, 2.0, 3.0], &[2.0, 3.0, 4.0]);
    assert!((d + 1.0).abs() < 1e-12);
    assert_eq!(StatisticalAnalyzer::cohens_d(&[1.0, 1.0], &[1.0, 1.0]), 0.0);
}
