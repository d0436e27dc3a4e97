use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use crate::response::quiz_error;
use crate::services::quiz::QuizKind;
use crate::state::AppState;

type QuizPath = Path<(String, String, String, String)>;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/quiz/sprint/:user/:category/:page/:offset", get(sprint))
        .route("/quiz/guess/:user/:category/:page/:offset", get(guess))
        .route("/quiz/crossword/:user/:category/:page/:offset", get(crossword))
}

async fn sprint(State(state): State<AppState>, Path(params): QuizPath) -> Response {
    questions(&state, QuizKind::Sprint, params).await
}

async fn guess(State(state): State<AppState>, Path(params): QuizPath) -> Response {
    questions(&state, QuizKind::Guess, params).await
}

async fn crossword(State(state): State<AppState>, Path(params): QuizPath) -> Response {
    questions(&state, QuizKind::Crossword, params).await
}

async fn questions(
    state: &AppState,
    kind: QuizKind,
    (user, category, page, offset): (String, String, String, String),
) -> Response {
    match state
        .quiz()
        .generate_raw(kind, &user, &category, &page, &offset)
        .await
    {
        Ok(batch) => Json(batch).into_response(),
        Err(err) => quiz_error(err).into_response(),
    }
}
