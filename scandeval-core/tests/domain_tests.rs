use pretty_assertions::assert_eq;
use proptest::prelude::*;
use scandeval_core::*;

// ===== LabelMapping Tests =====

#[test]
fn test_label_mapping_ids_follow_order() {
    let labels = LabelMapping::new(["neutral", "positiv", "negativ"]).unwrap();

    assert_eq!(labels.len(), 3);
    assert_eq!(labels.id("neutral"), Some(0));
    assert_eq!(labels.id("positiv"), Some(1));
    assert_eq!(labels.id("negativ"), Some(2));
    assert_eq!(labels.label(2), Some("negativ"));
    assert_eq!(labels.label(3), None);
}

#[test]
fn test_label_mapping_rejects_duplicates() {
    let err = LabelMapping::new(["pos", "neg", "pos"]).unwrap_err();
    assert!(err.is_invalid_benchmark());
}

#[test]
fn test_label_mapping_rejects_empty() {
    let err = LabelMapping::new(Vec::<String>::new()).unwrap_err();
    assert!(err.is_invalid_benchmark());

    let err = LabelMapping::new(["pos", " "]).unwrap_err();
    assert!(err.is_invalid_benchmark());
}

#[test]
fn test_label_mapping_require_id_unknown_label() {
    let labels = LabelMapping::new(["pos", "neg"]).unwrap();
    match labels.require_id("mixed") {
        Err(CoreError::InvalidBenchmark(msg)) => assert!(msg.contains("mixed")),
        other => panic!("Expected InvalidBenchmark, got {:?}", other),
    }
}

#[test]
fn test_label_mapping_serializes_as_names() {
    let labels = LabelMapping::new(["O", "B-PER", "I-PER"]).unwrap();
    let json = serde_json::to_string(&labels).unwrap();
    assert_eq!(json, r#"["O","B-PER","I-PER"]"#);

    let back: LabelMapping = serde_json::from_str(&json).unwrap();
    assert_eq!(back, labels);

    let duplicated: std::result::Result<LabelMapping, _> = serde_json::from_str(r#"["O","O"]"#);
    assert!(duplicated.is_err());
}

proptest! {
    #[test]
    fn test_label_mapping_round_trip(names in prop::collection::hash_set("[a-zA-Z-]{1,12}", 1..20)) {
        let names: Vec<String> = names.into_iter().collect();
        let labels = LabelMapping::new(names.clone()).unwrap();

        for name in &names {
            let id = labels.id(name).unwrap();
            prop_assert_eq!(labels.label(id), Some(name.as_str()));
        }
        for (id, name) in labels.iter() {
            prop_assert_eq!(labels.id(name), Some(id));
        }
    }
}

// ===== Dataset Tests =====

#[test]
fn test_dataset_fingerprint_is_stable() {
    let train = Dataset::new(vec![
        Record::classification("Sikke en dejlig dag", "positiv"),
        Record::classification("Det er noget skidt", "negativ"),
    ]);
    let same = train.clone();
    let reordered: Dataset = train.records().iter().rev().cloned().collect();

    let fingerprint = train.fingerprint().unwrap();
    assert_eq!(fingerprint.len(), 64);
    assert_eq!(fingerprint, same.fingerprint().unwrap());
    assert_ne!(fingerprint, reordered.fingerprint().unwrap());
}

#[test]
fn test_record_constructors() {
    let tagged = Record::tagged(
        vec!["Anders".into(), "bor".into(), "i".into(), "Odense".into()],
        vec!["B-PER".into(), "O".into(), "O".into(), "B-LOC".into()],
    );
    assert_eq!(tagged.doc, "Anders bor i Odense");
    assert_eq!(tagged.words().len(), 4);
    assert_eq!(tagged.orig_label.as_tags().unwrap()[3], "B-LOC");

    let question = Record::question(
        "Hvor bor Anders?",
        "Anders bor i Odense.",
        vec![AnswerSpan::new("Odense", 13)],
    );
    let answer = &question.orig_label.as_answers().unwrap()[0];
    assert_eq!(answer.answer_end(), 19);
    assert_eq!(question.context.as_deref(), Some("Anders bor i Odense."));
}

#[test]
fn test_record_words_fallback_to_whitespace() {
    let record = Record::classification("en  to tre", "x");
    assert_eq!(record.words(), vec!["en", "to", "tre"]);
}

// ===== Module Tree Tests =====

fn bert_like() -> Module {
    Module::container(vec![
        (
            "bert",
            Module::container(vec![
                (
                    "embeddings",
                    Module::container(vec![
                        ("word_embeddings", Module::Embedding(EmbeddingTable::zeros(10, 4))),
                        (
                            "token_type_embeddings",
                            Module::Embedding(EmbeddingTable::zeros(1, 4)),
                        ),
                    ]),
                ),
                ("encoder", Module::Parameter(vec![4, 4])),
            ]),
        ),
        ("classifier", Module::Parameter(vec![4, 2])),
    ])
}

#[test]
fn test_module_find_leaf_depth_first() {
    let model = bert_like();
    assert_eq!(
        model.find_leaf("token_type_embeddings").as_deref(),
        Some("bert.embeddings.token_type_embeddings")
    );
    assert_eq!(model.find_leaf("position_embeddings"), None);
}

#[test]
fn test_module_find_leaf_returns_first_in_child_order() {
    let model = Module::container(vec![
        ("a", Module::container(vec![("x", Module::Parameter(vec![1]))])),
        ("b", Module::container(vec![("x", Module::Parameter(vec![2]))])),
    ]);
    assert_eq!(model.find_leaf("x").as_deref(), Some("a.x"));
}

#[test]
fn test_module_get_and_get_mut() {
    let mut model = bert_like();
    let table = model
        .get("bert.embeddings.token_type_embeddings")
        .and_then(Module::as_embedding)
        .unwrap();
    assert_eq!(table.shape(), (1, 4));

    model
        .get_mut("bert.embeddings.token_type_embeddings")
        .and_then(Module::as_embedding_mut)
        .unwrap()
        .push_row(vec![1.0; 4])
        .unwrap();

    let table = model
        .get("bert.embeddings.token_type_embeddings")
        .and_then(Module::as_embedding)
        .unwrap();
    assert_eq!(table.shape(), (2, 4));
    assert!(model.get("bert.missing").is_none());
}

#[test]
fn test_module_leaf_paths() {
    assert_eq!(
        bert_like().leaf_paths(),
        vec![
            "bert.embeddings.word_embeddings",
            "bert.embeddings.token_type_embeddings",
            "bert.encoder",
            "classifier",
        ]
    );
}

#[test]
fn test_embedding_table_rows() {
    let mut table = EmbeddingTable::from_rows(vec![vec![0.1, 0.2], vec![0.3, 0.4]]).unwrap();
    assert_eq!(table.row(1), Some(&[0.3f32, 0.4][..]));
    assert!(table.push_row(vec![1.0]).is_err());

    table.resize(4, 0.0);
    assert_eq!(table.shape(), (4, 2));
    assert_eq!(table.row(3), Some(&[0.0f32, 0.0][..]));

    assert!(EmbeddingTable::from_rows(vec![vec![0.1], vec![0.2, 0.3]]).is_err());
}

// ===== Run Result Tests =====

#[test]
fn test_run_result_metric_lookup() {
    let run = RunResult::new(0, 4242)
        .with_split(Split::Train, MetricMap::from([("macro_f1".to_string(), 0.5)]))
        .with_split(Split::Test, MetricMap::from([("macro_f1".to_string(), 0.4)]));

    assert_eq!(run.metric(Split::Train, "macro_f1"), Some(0.5));
    assert_eq!(run.metric(Split::Test, "macro_f1"), Some(0.4));
    assert_eq!(run.metric(Split::Test, "micro_f1"), None);
}

#[test]
fn test_summary_statistic_nan_serializes_as_null() {
    let stat = SummaryStatistic {
        mean: 0.5,
        std_err: f64::NAN,
        count: 1,
    };
    let json = serde_json::to_value(stat).unwrap();
    assert_eq!(json["std_err"], serde_json::Value::Null);

    let back: SummaryStatistic = serde_json::from_value(json).unwrap();
    assert!(!back.has_std_err());
    assert_eq!(back, stat);
}

#[test]
fn test_summary_statistic_scaled() {
    let stat = SummaryStatistic {
        mean: 0.5,
        std_err: 0.25,
        count: 5,
    }
    .scaled(100.0);
    assert_eq!(stat.mean, 50.0);
    assert_eq!(stat.std_err, 25.0);
    assert_eq!(stat.count, 5);
}

#[test]
fn test_task_head_token_types() {
    assert!(TaskHead::QuestionAnswering.requires_token_types());
    assert!(!TaskHead::SequenceClassification.requires_token_types());
    assert!(!TaskHead::TokenClassification.requires_token_types());
}
