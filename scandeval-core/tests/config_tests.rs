use rstest::rstest;
use scandeval_core::*;

#[test]
fn test_training_args_default() {
    let args = TrainingArgs::default();

    assert_eq!(args.learning_rate, 2e-5);
    assert_eq!(args.warmup_steps, 50);
    assert_eq!(args.batch_size, 16);
    assert_eq!(args.epochs, 5);
    assert_eq!(args.num_repetitions, 10);
    assert_eq!(args.seed, 4242);
    assert!(args.validated().is_ok());
}

#[rstest]
#[case(TrainingArgs::default().with_batch_size(0))]
#[case(TrainingArgs::default().with_epochs(0))]
#[case(TrainingArgs::default().with_num_repetitions(0))]
#[case(TrainingArgs::default().with_learning_rate(0.0))]
#[case(TrainingArgs::default().with_learning_rate(-1e-5))]
fn test_training_args_invalid(#[case] args: TrainingArgs) {
    match args.validated() {
        Err(CoreError::Validation(_)) => {}
        other => panic!("Expected Validation error, got {:?}", other),
    }
}

#[test]
fn test_training_args_seed_per_repetition() {
    let args = TrainingArgs::default().with_seed(10);
    assert_eq!(args.seed_for(0), 10);
    assert_eq!(args.seed_for(4), 14);
}

#[test]
fn test_training_args_serialization() {
    let args = TrainingArgs::default().with_epochs(3).with_warmup_steps(0);
    let json = serde_json::to_string(&args).unwrap();
    let back: TrainingArgs = serde_json::from_str(&json).unwrap();
    assert_eq!(args, back);
}

#[test]
fn test_core_error_from_serde() {
    let parse_result: std::result::Result<serde_json::Value, _> = serde_json::from_str("invalid json{");
    let core_err: CoreError = parse_result.unwrap_err().into();
    assert!(matches!(core_err, CoreError::Serialization(_)));
}
