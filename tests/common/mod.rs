#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use words_backend::build_router;
use words_backend::db::memory::MemoryStore;
use words_backend::services::examples::NoExamples;
use words_backend::services::media::{MediaConfig, MediaLibrary, MemoryMediaStore};
use words_backend::services::quiz::QuizConfig;
use words_backend::services::speech::{SpeechError, SpeechSynthesizer};
use words_backend::state::{AppState, Collaborators};

const BOUNDARY: &str = "words-backend-test-boundary";
const MAX_UPLOAD_BYTES: usize = 1024 * 1024;

pub struct ToneSynthesizer;

#[async_trait]
impl SpeechSynthesizer for ToneSynthesizer {
    async fn synthesize(&self, text: &str, _voice: &str) -> Result<Bytes, SpeechError> {
        Ok(Bytes::from(format!("mp3:{text}")))
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub blobs: Arc<MemoryMediaStore>,
}

pub fn create_test_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let blobs = Arc::new(MemoryMediaStore::new());
    let state = AppState::new(Collaborators {
        store: store.clone(),
        media: MediaLibrary::new(blobs.clone(), &MediaConfig::default()),
        speech: Arc::new(ToneSynthesizer),
        examples: Arc::new(NoExamples),
        voice: "Joanna".to_string(),
        quiz: QuizConfig::default(),
    });

    TestApp {
        router: build_router(state, MAX_UPLOAD_BYTES),
        store,
        blobs,
    }
}

pub struct Reply {
    pub status: StatusCode,
    pub body: Bytes,
}

impl Reply {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Reply {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        Reply { status, body }
    }

    pub async fn call(&self, method: Method, uri: &str) -> Reply {
        self.send(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn upload(
        &self,
        method: Method,
        uri: &str,
        part: &str,
        document: Option<serde_json::Value>,
        image: Option<&[u8]>,
    ) -> Reply {
        let body = multipart_body(part, document, image);
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .header(header::CONTENT_LENGTH, body.len())
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    /// Creates a category and returns its id.
    pub async fn category(&self, user: &str, title: &str) -> String {
        let reply = self
            .upload(
                Method::POST,
                &format!("/category/{user}"),
                "category",
                Some(serde_json::json!({ "title": title })),
                None,
            )
            .await;
        assert_eq!(reply.status, StatusCode::OK, "{}", reply.text());
        reply.json()["id"].as_str().unwrap().to_string()
    }

    pub async fn word(
        &self,
        user: &str,
        category: &str,
        word: &str,
        translation: &[&str],
    ) -> serde_json::Value {
        let reply = self
            .upload(
                Method::POST,
                &format!("/dictionary/{user}"),
                "word",
                Some(serde_json::json!({
                    "category": category,
                    "word": word,
                    "translation": translation,
                })),
                Some(b"\x89PNG"),
            )
            .await;
        assert_eq!(reply.status, StatusCode::OK, "{}", reply.text());
        reply.json()
    }
}

pub fn multipart_body(
    part: &str,
    document: Option<serde_json::Value>,
    image: Option<&[u8]>,
) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some(document) = document {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\n\
                 Content-Disposition: form-data; name=\"{part}\"\r\n\
                 Content-Type: application/json\r\n\r\n{document}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some(image) = image {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\n\
                 Content-Disposition: form-data; name=\"image\"; filename=\"image.png\"\r\n\
                 Content-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(image);
        body.extend_from_slice(b"\r\n");
    }
    if body.is_empty() {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\n\
                 Content-Disposition: form-data; name=\"note\"\r\n\r\nempty\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn encode(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}
