//! Practice-question generation.
//!
//! All generators work on the full word list of one (user, category)
//! partition. Learned words are skipped and the remainder is paged with
//! `skip = page * offset, take = offset`; distractors are drawn from the
//! whole partition, not only from the current page.

use std::collections::BTreeSet;

use rand::seq::{IndexedRandom, IteratorRandom, SliceRandom};
use rand::Rng;
use serde::Serialize;
use uuid::Uuid;

use crate::config::env_f64;
use crate::models::{parse_category_id, Word};
use crate::services::dictionary::{WordError, WordService, MALFORMED_CATEGORY};

pub const NO_TRANSLATION: &str = "No translation";
pub const MALFORMED_PAGE: &str = "page and offset must be non-negative integers";
pub const DEFAULT_SPRINT_THRESHOLD: f64 = 0.55;
pub const GUESS_WRONG_ANSWERS: usize = 3;

#[derive(Debug, Clone)]
pub struct QuizConfig {
    /// Draws above this value present one of the word's own translations.
    pub sprint_threshold: f64,
}

impl QuizConfig {
    pub fn from_env() -> Self {
        let sprint_threshold = env_f64("QUIZ_SPRINT_THRESHOLD")
            .filter(|v| (0.0..1.0).contains(v))
            .unwrap_or(DEFAULT_SPRINT_THRESHOLD);
        Self { sprint_threshold }
    }
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            sprint_threshold: DEFAULT_SPRINT_THRESHOLD,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QuizError {
    #[error("{0}")]
    Validation(&'static str),
    #[error(transparent)]
    Words(#[from] WordError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: usize,
    pub offset: usize,
}

impl Page {
    pub fn new(page: usize, offset: usize) -> Self {
        Self { page, offset }
    }

    pub fn parse(page: &str, offset: &str) -> Result<Self, QuizError> {
        let parse = |raw: &str| {
            raw.trim()
                .parse::<usize>()
                .map_err(|_| QuizError::Validation(MALFORMED_PAGE))
        };
        Ok(Self::new(parse(page)?, parse(offset)?))
    }

    /// Unlearned words of this page, in partition order.
    pub fn select<'a>(&self, words: &'a [Word]) -> impl Iterator<Item = &'a Word> {
        words
            .iter()
            .filter(|word| !word.learned())
            .skip(self.page.saturating_mul(self.offset))
            .take(self.offset)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizKind {
    Sprint,
    Guess,
    Crossword,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sprint {
    pub word: String,
    pub answer: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Guess {
    pub word: String,
    /// Distinct candidates in random order, the correct one among them.
    pub answers: Vec<String>,
    pub correct: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Crossword {
    pub word: String,
    pub translation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum QuizBatch {
    Sprint(Vec<Sprint>),
    Guess(Vec<Guess>),
    Crossword(Vec<Crossword>),
}

impl QuizBatch {
    pub fn len(&self) -> usize {
        match self {
            Self::Sprint(items) => items.len(),
            Self::Guess(items) => items.len(),
            Self::Crossword(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn pick_translation<R: Rng + ?Sized>(word: &Word, rng: &mut R) -> String {
    word.translation
        .iter()
        .choose(rng)
        .cloned()
        .unwrap_or_else(|| NO_TRANSLATION.to_string())
}

#[derive(Debug, Clone, Default)]
pub struct QuizEngine {
    config: QuizConfig,
}

impl QuizEngine {
    pub fn new(config: QuizConfig) -> Self {
        Self { config }
    }

    pub fn generate<R: Rng + ?Sized>(
        &self,
        kind: QuizKind,
        words: &[Word],
        page: Page,
        rng: &mut R,
    ) -> QuizBatch {
        match kind {
            QuizKind::Sprint => QuizBatch::Sprint(self.sprint(words, page, rng)),
            QuizKind::Guess => QuizBatch::Guess(self.guess(words, page, rng)),
            QuizKind::Crossword => QuizBatch::Crossword(self.crossword(words, page)),
        }
    }

    /// True/false questions. With probability `1 - threshold` the presented
    /// answer comes from another word of the partition.
    pub fn sprint<R: Rng + ?Sized>(&self, words: &[Word], page: Page, rng: &mut R) -> Vec<Sprint> {
        page.select(words)
            .map(|word| {
                let draw: f64 = rng.random();
                let source = if draw > self.config.sprint_threshold {
                    word
                } else {
                    words
                        .iter()
                        .filter(|other| !std::ptr::eq(*other, word))
                        .choose(rng)
                        .unwrap_or(word)
                };
                let answer = pick_translation(source, rng);
                Sprint {
                    word: word.word.clone(),
                    is_correct: word.translation.contains(&answer),
                    answer,
                }
            })
            .collect()
    }

    /// Multiple-choice questions: up to three wrong translations taken
    /// from the rest of the partition plus the correct one, shuffled.
    pub fn guess<R: Rng + ?Sized>(&self, words: &[Word], page: Page, rng: &mut R) -> Vec<Guess> {
        let pool: BTreeSet<&str> = words
            .iter()
            .flat_map(|word| word.translation.iter().map(String::as_str))
            .collect();

        page.select(words)
            .map(|word| {
                let correct = pick_translation(word, rng);
                let candidates: Vec<&str> = pool
                    .iter()
                    .copied()
                    .filter(|candidate| {
                        !word.translation.contains(*candidate) && *candidate != correct
                    })
                    .collect();

                let mut answers: Vec<String> = candidates
                    .choose_multiple(rng, GUESS_WRONG_ANSWERS)
                    .map(|candidate| candidate.to_string())
                    .collect();
                answers.push(correct.clone());
                answers.shuffle(rng);

                Guess {
                    word: word.word.clone(),
                    answers,
                    correct,
                }
            })
            .collect()
    }

    pub fn crossword(&self, words: &[Word], page: Page) -> Vec<Crossword> {
        page.select(words)
            .map(|word| Crossword {
                word: word.word.clone(),
                translation: word
                    .translation
                    .first()
                    .cloned()
                    .unwrap_or_else(|| NO_TRANSLATION.to_string()),
            })
            .collect()
    }
}

/// Reads a partition through [`WordService`] and feeds it to the engine.
#[derive(Clone)]
pub struct QuizService {
    words: WordService,
    engine: QuizEngine,
}

impl QuizService {
    pub fn new(words: WordService, engine: QuizEngine) -> Self {
        Self { words, engine }
    }

    /// Validates raw path parameters before touching the store. Unknown
    /// users and categories simply produce an empty batch.
    pub async fn generate_raw(
        &self,
        kind: QuizKind,
        user: &str,
        category: &str,
        page: &str,
        offset: &str,
    ) -> Result<QuizBatch, QuizError> {
        let category =
            parse_category_id(category).ok_or(QuizError::Validation(MALFORMED_CATEGORY))?;
        let page = Page::parse(page, offset)?;
        self.generate(kind, user, category, page).await
    }

    pub async fn generate(
        &self,
        kind: QuizKind,
        user: &str,
        category: Uuid,
        page: Page,
    ) -> Result<QuizBatch, QuizError> {
        let words = self.words.list(user, category, None).await?;
        let batch = self.engine.generate(kind, &words, page, &mut rand::rng());
        tracing::debug!(
            user,
            category = %category,
            ?kind,
            questions = batch.len(),
            "quiz generated"
        );
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn word(spelling: &str, answers: u32, translation: &[&str]) -> Word {
        let mut word = Word::new(
            "user1",
            Uuid::nil(),
            spelling,
            translation.iter().map(|t| t.to_string()).collect(),
        );
        word.answers = answers;
        word
    }

    fn sample() -> Vec<Word> {
        vec![
            word("Core", 100, &["Основа"]),
            word("Reactive", 16, &["Реактив"]),
            word("Reactor", 8, &["Реактор"]),
            word("Tango", 95, &["Танго", "Супер"]),
            word("Tangos", 95, &["Тангос"]),
        ]
    }

    fn names<T>(items: &[T], name: impl Fn(&T) -> &str) -> Vec<String> {
        items.iter().map(|item| name(item).to_string()).collect()
    }

    #[test]
    fn page_parameters_must_be_unsigned_integers() {
        assert_eq!(Page::parse("1", " 2 ").unwrap(), Page::new(1, 2));
        for (page, offset) in [("-1", "2"), ("1", "two"), ("", "2"), ("1.5", "2")] {
            assert!(matches!(
                Page::parse(page, offset),
                Err(QuizError::Validation(MALFORMED_PAGE))
            ));
        }
    }

    #[test]
    fn pages_skip_learned_words() {
        let words = sample();
        let page: Vec<_> = Page::new(0, 10).select(&words).map(|w| w.word.as_str()).collect();
        assert_eq!(page, vec!["Reactive", "Reactor", "Tango", "Tangos"]);
    }

    #[test]
    fn second_page_of_two_returns_third_and_fourth_eligible() {
        let words: Vec<Word> = ["a", "b", "c", "d", "e"]
            .iter()
            .map(|s| word(s, 0, &[s]))
            .collect();
        let page: Vec<_> = Page::new(1, 2).select(&words).map(|w| w.word.as_str()).collect();
        assert_eq!(page, vec!["c", "d"]);
    }

    #[test]
    fn zero_offset_and_far_pages_are_empty() {
        let words = sample();
        assert_eq!(Page::new(0, 0).select(&words).count(), 0);
        assert_eq!(Page::new(5, 2).select(&words).count(), 0);
        assert_eq!(Page::new(usize::MAX, usize::MAX).select(&words).count(), 0);
    }

    #[test]
    fn sprint_marks_correctness_by_membership() {
        let engine = QuizEngine::default();
        let words = sample();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..50 {
            let questions = engine.sprint(&words, Page::new(0, 10), &mut rng);
            assert_eq!(
                names(&questions, |q| &q.word),
                vec!["Reactive", "Reactor", "Tango", "Tangos"]
            );
            for question in &questions {
                let own = &words.iter().find(|w| w.word == question.word).unwrap().translation;
                assert_eq!(question.is_correct, own.contains(&question.answer));
            }
        }
    }

    #[test]
    fn sprint_threshold_controls_distractor_direction() {
        let words = sample();
        let mut rng = StdRng::seed_from_u64(11);

        let always_own = QuizEngine::new(QuizConfig { sprint_threshold: -1.0 });
        assert!(always_own
            .sprint(&words, Page::new(0, 10), &mut rng)
            .iter()
            .all(|q| q.is_correct));

        let always_other = QuizEngine::new(QuizConfig { sprint_threshold: 1.0 });
        assert!(always_other
            .sprint(&words, Page::new(0, 10), &mut rng)
            .iter()
            .all(|q| !q.is_correct));
    }

    #[test]
    fn sprint_with_single_word_falls_back_to_itself() {
        let words = vec![word("solo", 0, &["один"])];
        let engine = QuizEngine::new(QuizConfig { sprint_threshold: 1.0 });
        let mut rng = StdRng::seed_from_u64(3);
        let questions = engine.sprint(&words, Page::new(0, 1), &mut rng);
        assert_eq!(questions[0].answer, "один");
        assert!(questions[0].is_correct);
    }

    #[test]
    fn guess_offers_four_distinct_answers_when_possible() {
        let engine = QuizEngine::default();
        let words = sample();
        let mut rng = StdRng::seed_from_u64(42);

        for question in engine.guess(&words, Page::new(0, 10), &mut rng) {
            assert_eq!(question.answers.len(), 4);
            assert!(question.answers.contains(&question.correct));
            let distinct: BTreeSet<_> = question.answers.iter().collect();
            assert_eq!(distinct.len(), 4);
            let own = &words.iter().find(|w| w.word == question.word).unwrap().translation;
            assert!(own.contains(&question.correct));
            let wrong = question.answers.iter().filter(|a| !own.contains(*a)).count();
            assert_eq!(wrong, 3);
        }
    }

    #[test]
    fn guess_with_few_candidates_stays_below_four() {
        let engine = QuizEngine::default();
        let words = vec![word("go", 0, &["идти"]), word("stay", 0, &["оставаться"])];
        let mut rng = StdRng::seed_from_u64(1);

        let questions = engine.guess(&words, Page::new(0, 10), &mut rng);
        assert_eq!(questions.len(), 2);
        for question in questions {
            assert_eq!(question.answers.len(), 2);
            assert!(question.answers.contains(&question.correct));
        }
    }

    #[test]
    fn guess_without_translation_uses_sentinel() {
        let engine = QuizEngine::default();
        let words = vec![word("blank", 0, &[]), word("go", 0, &["идти"])];
        let mut rng = StdRng::seed_from_u64(5);

        let questions = engine.guess(&words, Page::new(0, 1), &mut rng);
        assert_eq!(questions[0].correct, NO_TRANSLATION);
        assert!(questions[0].answers.contains(&NO_TRANSLATION.to_string()));
        assert!(questions[0].answers.contains(&"идти".to_string()));
    }

    #[test]
    fn crossword_pairs_word_with_one_translation() {
        let engine = QuizEngine::default();
        let words = sample();
        let questions = engine.crossword(&words, Page::new(1, 2));
        assert_eq!(names(&questions, |q| &q.word), vec!["Tango", "Tangos"]);
        assert_eq!(questions[0].translation, "Супер");
        assert_eq!(questions[1].translation, "Тангос");
    }

    #[test]
    fn sprint_serializes_is_correct_in_camel_case() {
        let batch = QuizBatch::Sprint(vec![Sprint {
            word: "go".into(),
            answer: "идти".into(),
            is_correct: true,
        }]);
        let value = serde_json::to_value(&batch).unwrap();
        assert_eq!(
            value,
            serde_json::json!([{"word": "go", "answer": "идти", "isCorrect": true}])
        );
    }
}
