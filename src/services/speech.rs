use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;

use crate::config::{env_string, env_u64};

const DEFAULT_VOICE: &str = "Joanna";
const DEFAULT_TIMEOUT_MS: u64 = 30_000;
const OUTPUT_FORMAT: &str = "mp3";

#[derive(Debug, Clone)]
pub struct SpeechConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub voice: String,
    pub timeout: Duration,
}

impl SpeechConfig {
    pub fn from_env() -> Self {
        Self {
            endpoint: env_string("SPEECH_ENDPOINT"),
            api_key: env_string("SPEECH_API_KEY"),
            voice: env_string("SPEECH_VOICE").unwrap_or_else(|| DEFAULT_VOICE.to_string()),
            timeout: Duration::from_millis(env_u64("SPEECH_TIMEOUT").unwrap_or(DEFAULT_TIMEOUT_MS)),
        }
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            voice: DEFAULT_VOICE.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("speech synthesis not configured: {0}")]
    NotConfigured(&'static str),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("empty audio stream")]
    EmptyAudio,
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Bytes, SpeechError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    text: &'a str,
    voice_id: &'a str,
    output_format: &'a str,
}

#[derive(Clone)]
pub struct HttpSpeechSynthesizer {
    endpoint: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpSpeechSynthesizer {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            endpoint: endpoint.into(),
            api_key,
            client,
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpSpeechSynthesizer {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Bytes, SpeechError> {
        let payload = SynthesizeRequest {
            text,
            voice_id: voice,
            output_format: OUTPUT_FORMAT,
        };

        let mut request = self.client.post(&self.endpoint).json(&payload);
        if let Some(key) = self.api_key.as_deref() {
            request = request.bearer_auth(key);
        }
        let resp = request.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SpeechError::HttpStatus { status, body });
        }

        let audio = resp.bytes().await?;
        if audio.is_empty() {
            return Err(SpeechError::EmptyAudio);
        }
        Ok(audio)
    }
}

/// Stand-in used when no endpoint is configured; every call fails.
pub struct UnconfiguredSynthesizer;

#[async_trait]
impl SpeechSynthesizer for UnconfiguredSynthesizer {
    async fn synthesize(&self, _text: &str, _voice: &str) -> Result<Bytes, SpeechError> {
        Err(SpeechError::NotConfigured("SPEECH_ENDPOINT"))
    }
}

pub fn from_config(config: &SpeechConfig) -> Arc<dyn SpeechSynthesizer> {
    match config.endpoint.as_deref() {
        Some(endpoint) => Arc::new(HttpSpeechSynthesizer::new(
            endpoint,
            config.api_key.clone(),
            config.timeout,
        )),
        None => {
            tracing::warn!("SPEECH_ENDPOINT not set, word creation will fail at speech synthesis");
            Arc::new(UnconfiguredSynthesizer)
        }
    }
}
