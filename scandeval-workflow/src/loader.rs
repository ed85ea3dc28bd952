use async_trait::async_trait;
use reqwest::Client;
use scandeval_core::{AnswerSpan, CoreError, Dataset, Record, Result, Split};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::task::TaskKind;

/// Names of the raw JSON fields that make up a record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldMapping {
    pub doc: String,
    pub label: String,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub tokens: Option<String>,
}

impl FieldMapping {
    pub fn new(doc: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            doc: doc.into(),
            label: label.into(),
            context: None,
            tokens: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_tokens(mut self, tokens: impl Into<String>) -> Self {
        self.tokens = Some(tokens.into());
        self
    }
}

/// Where the two splits of a remote dataset live.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatasetLocation {
    pub train: Url,
    pub test: Url,
}

impl DatasetLocation {
    pub fn from_base(base_url: &str, train_file: &str, test_file: &str) -> Result<Self> {
        let invalid = |err: url::ParseError| {
            CoreError::Configuration(format!("Invalid dataset URL '{}': {}", base_url, err))
        };
        let base = Url::parse(base_url).map_err(invalid)?;
        Ok(Self {
            train: base.join(train_file).map_err(invalid)?,
            test: base.join(test_file).map_err(invalid)?,
        })
    }

    pub fn url(&self, split: Split) -> &Url {
        match split {
            Split::Train => &self.train,
            Split::Test => &self.test,
        }
    }
}

/// Supplies the raw newline-delimited JSON of a split.
#[async_trait]
pub trait DatasetSource: Send + Sync {
    async fn fetch(&self, split: Split) -> Result<String>;
}

/// Fetches splits over HTTP(S). No caching and no retries.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    location: DatasetLocation,
}

impl HttpSource {
    pub fn new(location: DatasetLocation) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent(concat!("scandeval/", env!("CARGO_PKG_VERSION")))
            .gzip(true)
            .build()
            .map_err(|err| CoreError::Network(err.to_string()))?;

        Ok(Self { client, location })
    }

    pub fn location(&self) -> &DatasetLocation {
        &self.location
    }
}

#[async_trait]
impl DatasetSource for HttpSource {
    async fn fetch(&self, split: Split) -> Result<String> {
        let url = self.location.url(split);
        tracing::debug!(%url, %split, "Fetching dataset split");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|err| CoreError::Network(format!("GET {} failed: {}", url, err)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CoreError::Network(format!(
                "GET {} returned status {}",
                url, status
            )));
        }

        response
            .text()
            .await
            .map_err(|err| CoreError::Network(format!("Reading {} failed: {}", url, err)))
    }
}

/// Serves splits from memory, mostly for tests and local files.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    splits: HashMap<Split, String>,
}

impl InMemorySource {
    pub fn new(train: impl Into<String>, test: impl Into<String>) -> Self {
        let mut splits = HashMap::new();
        splits.insert(Split::Train, train.into());
        splits.insert(Split::Test, test.into());
        Self { splits }
    }
}

#[async_trait]
impl DatasetSource for InMemorySource {
    async fn fetch(&self, split: Split) -> Result<String> {
        self.splits
            .get(&split)
            .cloned()
            .ok_or_else(|| CoreError::Dataset(format!("No {} split available", split)))
    }
}

pub struct DatasetLoader {
    source: Arc<dyn DatasetSource>,
    fields: FieldMapping,
    task: TaskKind,
}

impl DatasetLoader {
    pub fn new(source: Arc<dyn DatasetSource>, fields: FieldMapping, task: TaskKind) -> Self {
        Self {
            source,
            fields,
            task,
        }
    }

    /// Loads the train and test splits, one after the other.
    pub async fn load(&self) -> Result<(Dataset, Dataset)> {
        let train = self.load_split(Split::Train).await?;
        let test = self.load_split(Split::Test).await?;
        tracing::info!(train = train.len(), test = test.len(), "Loaded dataset");
        Ok((train, test))
    }

    pub async fn load_split(&self, split: Split) -> Result<Dataset> {
        let raw = self.source.fetch(split).await?;
        parse_jsonl(&raw, split, &self.fields, self.task)
    }
}

/// Parses every non-empty line; the first malformed line fails the whole split.
pub fn parse_jsonl(raw: &str, split: Split, fields: &FieldMapping, task: TaskKind) -> Result<Dataset> {
    raw.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            parse_line(line, fields, task).map_err(|reason| {
                CoreError::Dataset(format!(
                    "Malformed record in {} split at line {}: {}",
                    split,
                    index + 1,
                    reason
                ))
            })
        })
        .collect()
}

fn parse_line(line: &str, fields: &FieldMapping, task: TaskKind) -> std::result::Result<Record, String> {
    let value: Value = serde_json::from_str(line).map_err(|err| err.to_string())?;
    let object = value
        .as_object()
        .ok_or_else(|| "expected a JSON object".to_string())?;

    match task {
        TaskKind::Classification => {
            let doc = string_field(object, &fields.doc)?;
            let label = match field(object, &fields.label)? {
                Value::String(label) => label.clone(),
                Value::Number(label) => label.to_string(),
                Value::Bool(label) => label.to_string(),
                _ => return Err(format!("field '{}' is not a scalar label", fields.label)),
            };
            Ok(Record::classification(doc, label))
        }
        TaskKind::SequenceLabeling => {
            let tokens_field = fields.tokens.as_deref().unwrap_or(&fields.doc);
            let tokens = string_list(object, tokens_field)?;
            let tags = string_list(object, &fields.label)?;
            Ok(Record::tagged(tokens, tags))
        }
        TaskKind::SpanExtraction => {
            let question = string_field(object, &fields.doc)?;
            let context_field = fields
                .context
                .as_deref()
                .ok_or_else(|| "no context field configured".to_string())?;
            let context = string_field(object, context_field)?;
            let answers = answers(field(object, &fields.label)?, &fields.label)?;
            Ok(Record::question(question, context, answers))
        }
    }
}

fn field<'a>(object: &'a Map<String, Value>, name: &str) -> std::result::Result<&'a Value, String> {
    match object.get(name) {
        None | Some(Value::Null) => Err(format!("missing field '{}'", name)),
        Some(value) => Ok(value),
    }
}

fn string_field(object: &Map<String, Value>, name: &str) -> std::result::Result<String, String> {
    field(object, name)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| format!("field '{}' is not a string", name))
}

fn string_list(object: &Map<String, Value>, name: &str) -> std::result::Result<Vec<String>, String> {
    field(object, name)?
        .as_array()
        .ok_or_else(|| format!("field '{}' is not a list", name))?
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| format!("field '{}' contains a non-string item", name))
        })
        .collect()
}

/// Accepts both `{"text": [..], "answer_start": [..]}` and `[{"text": .., "answer_start": ..}]`.
fn answers(value: &Value, name: &str) -> std::result::Result<Vec<AnswerSpan>, String> {
    #[derive(Deserialize)]
    struct Columnar {
        text: Vec<String>,
        answer_start: Vec<usize>,
    }

    if let Ok(spans) = serde_json::from_value::<Vec<AnswerSpan>>(value.clone()) {
        return Ok(spans);
    }
    let columnar: Columnar = serde_json::from_value(value.clone())
        .map_err(|_| format!("field '{}' is not a list of answers", name))?;
    if columnar.text.len() != columnar.answer_start.len() {
        return Err(format!(
            "field '{}' has {} answer texts but {} start offsets",
            name,
            columnar.text.len(),
            columnar.answer_start.len()
        ));
    }
    Ok(columnar
        .text
        .into_iter()
        .zip(columnar.answer_start)
        .map(|(text, start)| AnswerSpan::new(text, start))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_from_base() {
        let location = DatasetLocation::from_base(
            "https://example.com/datasets/angry_tweets/",
            "train.jsonl",
            "test.jsonl",
        )
        .unwrap();
        assert_eq!(
            location.url(Split::Test).as_str(),
            "https://example.com/datasets/angry_tweets/test.jsonl"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let err = DatasetLocation::from_base("not a url", "a", "b").unwrap_err();
        assert!(matches!(err, CoreError::Configuration(_)));
    }

    #[test]
    fn test_columnar_answers() {
        let value = serde_json::json!({"text": ["Odense"], "answer_start": [4]});
        assert_eq!(answers(&value, "answers").unwrap(), vec![AnswerSpan::new("Odense", 4)]);
    }
}
