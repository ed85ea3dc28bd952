use pretty_assertions::assert_eq;
use scandeval_core::{AnswerSpan, CoreError, Record, Split};
use scandeval_workflow::{
    parse_jsonl, DatasetLoader, DatasetLocation, DatasetSource, FieldMapping, HttpSource,
    InMemorySource, TaskKind,
};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TRAIN: &str = r#"{"tweet": "Sikke en dejlig dag", "label": "positiv"}
{"tweet": "Det er noget skidt", "label": "negativ"}

{"tweet": "Toget kører kl. 8", "label": "neutral"}
"#;

const TEST: &str = r#"{"tweet": "Hvor er det flot", "label": "positiv"}"#;

async fn serve(server: &MockServer, file: &str, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(format!("/angry_tweets/{}", file)))
        .respond_with(template)
        .mount(server)
        .await;
}

fn loader(server: &MockServer) -> DatasetLoader {
    let location = DatasetLocation::from_base(
        &format!("{}/angry_tweets/", server.uri()),
        "train.jsonl",
        "test.jsonl",
    )
    .unwrap();
    DatasetLoader::new(
        Arc::new(HttpSource::new(location).unwrap()),
        FieldMapping::new("tweet", "label"),
        TaskKind::Classification,
    )
}

#[tokio::test]
async fn test_loads_both_splits_over_http() {
    let server = MockServer::start().await;
    serve(&server, "train.jsonl", ResponseTemplate::new(200).set_body_string(TRAIN)).await;
    serve(&server, "test.jsonl", ResponseTemplate::new(200).set_body_string(TEST)).await;

    let (train, test) = loader(&server).load().await.unwrap();

    assert_eq!(train.len(), 3);
    assert_eq!(test.len(), 1);
    assert_eq!(
        train.get(1),
        Some(&Record::classification("Det er noget skidt", "negativ"))
    );
}

#[tokio::test]
async fn test_malformed_line_fails_the_split() {
    let server = MockServer::start().await;
    let broken = format!("{}{{\"tweet\": \"mangler label\"}}\n", TRAIN);
    serve(&server, "train.jsonl", ResponseTemplate::new(200).set_body_string(broken)).await;
    serve(&server, "test.jsonl", ResponseTemplate::new(200).set_body_string(TEST)).await;

    let err = loader(&server).load().await.unwrap_err();

    let msg = match err {
        CoreError::Dataset(msg) => msg,
        other => panic!("expected a dataset error, got {:?}", other),
    };
    assert!(msg.contains("train split at line 5"), "{}", msg);
    assert!(msg.contains("missing field 'label'"), "{}", msg);
}

#[tokio::test]
async fn test_invalid_json_reports_line_number() {
    let server = MockServer::start().await;
    serve(&server, "train.jsonl", ResponseTemplate::new(200).set_body_string(TRAIN)).await;
    serve(
        &server,
        "test.jsonl",
        ResponseTemplate::new(200).set_body_string("{\"tweet\": \"ok\", \"label\": 1}\n{not json"),
    )
    .await;

    let err = loader(&server).load().await.unwrap_err();

    assert!(err.to_string().contains("test split at line 2"), "{}", err);
}

#[tokio::test]
async fn test_http_error_status_is_fatal() {
    let server = MockServer::start().await;
    serve(&server, "train.jsonl", ResponseTemplate::new(404)).await;

    let err = loader(&server).load().await.unwrap_err();

    assert!(matches!(err, CoreError::Network(_)), "{:?}", err);
}

#[tokio::test]
async fn test_in_memory_source() {
    let source = InMemorySource::new(TRAIN, TEST);
    assert_eq!(source.fetch(Split::Test).await.unwrap(), TEST);
}

#[test]
fn test_numeric_labels_become_strings() {
    let dataset = parse_jsonl(
        r#"{"text": "hej", "label": 2}"#,
        Split::Train,
        &FieldMapping::new("text", "label"),
        TaskKind::Classification,
    )
    .unwrap();
    assert_eq!(dataset.get(0).unwrap().orig_label.as_label(), Some("2"));
}

#[test]
fn test_sequence_labeling_records() {
    let raw = r#"{"tokens": ["Jens", "bor", "i", "Odense"], "ner_tags": ["B-PER", "O", "O", "B-LOC"]}"#;
    let fields = FieldMapping::new("text", "ner_tags").with_tokens("tokens");

    let dataset = parse_jsonl(raw, Split::Train, &fields, TaskKind::SequenceLabeling).unwrap();

    let record = dataset.get(0).unwrap();
    assert_eq!(record.doc, "Jens bor i Odense");
    assert_eq!(
        record.orig_label.as_tags().unwrap(),
        &["B-PER", "O", "O", "B-LOC"].map(String::from)
    );
}

#[test]
fn test_span_extraction_records() {
    let raw = r#"{"question": "Hvor bor Jens?", "context": "Jens bor i Odense", "answers": {"text": ["Odense"], "answer_start": [11]}}"#;
    let fields = FieldMapping::new("question", "answers").with_context("context");

    let dataset = parse_jsonl(raw, Split::Test, &fields, TaskKind::SpanExtraction).unwrap();

    assert_eq!(
        dataset.get(0),
        Some(&Record::question(
            "Hvor bor Jens?",
            "Jens bor i Odense",
            vec![AnswerSpan::new("Odense", 11)]
        ))
    );
}

#[test]
fn test_span_extraction_needs_context_field() {
    let raw = r#"{"question": "Hvor?", "answers": []}"#;
    let err = parse_jsonl(
        raw,
        Split::Train,
        &FieldMapping::new("question", "answers"),
        TaskKind::SpanExtraction,
    )
    .unwrap_err();
    assert!(err.to_string().contains("no context field configured"));
}
