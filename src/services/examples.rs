use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::config::{env_string, env_u64};
use crate::models::Example;

const DEFAULT_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone)]
pub struct ExampleConfig {
    /// Dictionary API prefix; the headword is appended verbatim.
    pub api_url: Option<String>,
    pub timeout: Duration,
}

impl ExampleConfig {
    pub fn from_env() -> Self {
        Self {
            api_url: env_string("EXAMPLE_API_URL"),
            timeout: Duration::from_millis(
                env_u64("EXAMPLE_TIMEOUT").unwrap_or(DEFAULT_TIMEOUT_MS),
            ),
        }
    }
}

impl Default for ExampleConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status}")]
    HttpStatus { status: reqwest::StatusCode },
    #[error("JSON decode failed: {0}")]
    Json(#[from] serde_json::Error),
}

#[async_trait]
pub trait ExampleLookup: Send + Sync {
    async fn lookup(&self, word: &str) -> Result<BTreeSet<Example>, LookupError>;
}

#[derive(Debug, Default, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    results: Vec<LookupEntry>,
}

#[derive(Debug, Deserialize)]
struct LookupEntry {
    #[serde(default)]
    headword: String,
    #[serde(default)]
    senses: Vec<Sense>,
}

#[derive(Debug, Deserialize)]
struct Sense {
    #[serde(default)]
    definition: OneOrMany,
    #[serde(default)]
    examples: Vec<SenseExample>,
}

#[derive(Debug, Deserialize)]
struct SenseExample {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl Default for OneOrMany {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(value) => vec![value],
            Self::Many(values) => values,
        }
    }
}

/// Folds a dictionary API payload into one [`Example`] per result entry.
pub fn parse_examples(payload: &[u8]) -> Result<BTreeSet<Example>, serde_json::Error> {
    let response: LookupResponse = serde_json::from_slice(payload)?;

    Ok(response
        .results
        .into_iter()
        .map(|entry| {
            let mut definitions = BTreeSet::new();
            let mut sentences = BTreeSet::new();
            for sense in entry.senses {
                definitions.extend(sense.definition.into_vec());
                sentences.extend(sense.examples.into_iter().filter_map(|example| example.text));
            }
            Example {
                headword: entry.headword,
                definitions,
                sentences,
            }
        })
        .collect())
}

#[derive(Clone)]
pub struct HttpExampleLookup {
    api_url: String,
    client: reqwest::Client,
}

impl HttpExampleLookup {
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            api_url: api_url.into(),
            client,
        }
    }
}

#[async_trait]
impl ExampleLookup for HttpExampleLookup {
    async fn lookup(&self, word: &str) -> Result<BTreeSet<Example>, LookupError> {
        let url = format!("{}{}", self.api_url, urlencoding::encode(word));
        let resp = self.client.get(url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(LookupError::HttpStatus { status });
        }

        let bytes = resp.bytes().await?;
        Ok(parse_examples(&bytes)?)
    }
}

/// Lookup used when no dictionary API is configured.
pub struct NoExamples;

#[async_trait]
impl ExampleLookup for NoExamples {
    async fn lookup(&self, _word: &str) -> Result<BTreeSet<Example>, LookupError> {
        Ok(BTreeSet::new())
    }
}

pub fn from_config(config: &ExampleConfig) -> Arc<dyn ExampleLookup> {
    match config.api_url.as_deref() {
        Some(url) => Arc::new(HttpExampleLookup::new(url, config.timeout)),
        None => {
            tracing::info!("EXAMPLE_API_URL not set, example lookup disabled");
            Arc::new(NoExamples)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_definitions_and_sentences_per_headword() {
        let payload = br#"{
            "results": [
                {
                    "headword": "go",
                    "senses": [
                        {
                            "definition": ["to move from one place to another"],
                            "examples": [{"text": "We went to Paris."}, {"text": null}]
                        },
                        {
                            "definition": "to leave",
                            "examples": [{"text": "It's time to go."}]
                        }
                    ]
                },
                { "headword": "go-ahead" }
            ]
        }"#;

        let examples = parse_examples(payload).unwrap();
        assert_eq!(examples.len(), 2);

        let go = examples.iter().find(|e| e.headword == "go").unwrap();
        assert_eq!(go.definitions.len(), 2);
        assert!(go.definitions.contains("to leave"));
        assert_eq!(
            go.sentences,
            BTreeSet::from(["We went to Paris.".to_string(), "It's time to go.".to_string()])
        );

        let bare = examples.iter().find(|e| e.headword == "go-ahead").unwrap();
        assert!(bare.definitions.is_empty());
        assert!(bare.sentences.is_empty());
    }

    #[test]
    fn missing_results_yield_empty_set() {
        assert!(parse_examples(br#"{"total": 0}"#).unwrap().is_empty());
    }

    #[test]
    fn malformed_payload_is_an_error() {
        assert!(parse_examples(b"not json").is_err());
    }
}
