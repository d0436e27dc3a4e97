use std::sync::Arc;
use std::time::{Instant, SystemTime};

use crate::config::Config;
use crate::db::SharedStore;
use crate::services::category::CategoryService;
use crate::services::dictionary::WordService;
use crate::services::examples::{self, ExampleLookup};
use crate::services::media::MediaLibrary;
use crate::services::quiz::{QuizConfig, QuizEngine, QuizService};
use crate::services::speech::{self, SpeechSynthesizer};

/// Collaborators a request handler can reach.
pub struct Collaborators {
    pub store: SharedStore,
    pub media: MediaLibrary,
    pub speech: Arc<dyn SpeechSynthesizer>,
    pub examples: Arc<dyn ExampleLookup>,
    pub voice: String,
    pub quiz: QuizConfig,
}

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    started_at_system: SystemTime,
    store: SharedStore,
    categories: CategoryService,
    words: WordService,
    quiz: QuizService,
}

impl AppState {
    pub fn new(parts: Collaborators) -> Self {
        let categories = CategoryService::new(parts.store.clone(), parts.media.clone());
        let words = WordService::new(
            parts.store.clone(),
            parts.media,
            parts.speech,
            parts.examples,
            parts.voice,
        );
        let quiz = QuizService::new(words.clone(), QuizEngine::new(parts.quiz));

        Self {
            started_at: Instant::now(),
            started_at_system: SystemTime::now(),
            store: parts.store,
            categories,
            words,
            quiz,
        }
    }

    /// Wires HTTP clients (or their in-memory stand-ins) from configuration.
    pub fn from_config(config: &Config, store: SharedStore) -> Self {
        Self::new(Collaborators {
            store,
            media: MediaLibrary::from_config(&config.media),
            speech: speech::from_config(&config.speech),
            examples: examples::from_config(&config.examples),
            voice: config.speech.voice.clone(),
            quiz: config.quiz.clone(),
        })
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn started_at_system(&self) -> SystemTime {
        self.started_at_system
    }

    pub fn store(&self) -> SharedStore {
        Arc::clone(&self.store)
    }

    pub fn categories(&self) -> &CategoryService {
        &self.categories
    }

    pub fn words(&self) -> &WordService {
        &self.words
    }

    pub fn quiz(&self) -> &QuizService {
        &self.quiz
    }
}
