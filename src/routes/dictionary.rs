use std::collections::BTreeSet;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use uuid::Uuid;

use crate::models::{parse_category_id, WordKey};
use crate::response::{word_error, AppError, Missing};
use crate::routes::empty_listing;
use crate::routes::upload::Upload;
use crate::services::dictionary::{NewWord, INVALID_PARAMETERS, MALFORMED_CATEGORY};
use crate::state::AppState;

const MALFORMED_FLAG: &str = "learned flag must be true or false";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dictionary/:user", post(create))
        .route(
            "/dictionary/:user/:category",
            get(list_all).delete(remove_category_words),
        )
        // The third segment is a learned flag on GET and a word on DELETE.
        .route(
            "/dictionary/:user/:category/:word",
            get(list_by_flag).delete(remove_word),
        )
        .route("/dictionary/:user/:category/:word/image", post(replace_image))
        .route(
            "/dictionary/:user/:category/:word/add/:translation",
            patch(add_translation),
        )
        .route(
            "/dictionary/:user/:category/:word/delete/:translation",
            delete(remove_translation),
        )
}

fn category_id(raw: &str) -> Result<Uuid, AppError> {
    parse_category_id(raw).ok_or_else(|| AppError::bad_request(MALFORMED_CATEGORY))
}

async fn list(state: &AppState, user: &str, category: &str, learned: Option<bool>) -> Response {
    let category = match category_id(category) {
        Ok(id) => id,
        Err(err) => return err.into_response(),
    };

    match state.words().list(user, category, learned).await {
        Ok(words) if words.is_empty() => empty_listing(),
        Ok(words) => Json(words).into_response(),
        Err(err) => word_error(err, Missing::NotFound).into_response(),
    }
}

async fn list_all(
    State(state): State<AppState>,
    Path((user, category)): Path<(String, String)>,
) -> Response {
    list(&state, &user, &category, None).await
}

fn parse_flag(raw: &str) -> Option<bool> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("true") {
        Some(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

async fn list_by_flag(
    State(state): State<AppState>,
    Path((user, category, flag)): Path<(String, String, String)>,
) -> Response {
    let Some(learned) = parse_flag(&flag) else {
        return AppError::bad_request(MALFORMED_FLAG).into_response();
    };
    list(&state, &user, &category, Some(learned)).await
}

async fn create(
    State(state): State<AppState>,
    Path(user): Path<String>,
    multipart: Multipart,
) -> Response {
    let upload = match Upload::read(multipart, "word").await {
        Ok(upload) => upload,
        Err(err) => return err.into_response(),
    };
    let draft: NewWord = match upload.document(INVALID_PARAMETERS) {
        Ok(draft) => draft,
        Err(err) => return err.into_response(),
    };

    match state.words().create(&user, draft, upload.image).await {
        Ok(word) => Json(word).into_response(),
        Err(err) => word_error(err, Missing::BadRequest).into_response(),
    }
}

async fn replace_image(
    State(state): State<AppState>,
    Path((user, category, word)): Path<(String, String, String)>,
    multipart: Multipart,
) -> Response {
    let category = match category_id(&category) {
        Ok(id) => id,
        Err(err) => return err.into_response(),
    };
    let upload = match Upload::read(multipart, "word").await {
        Ok(upload) => upload,
        Err(err) => return err.into_response(),
    };

    let key = WordKey::new(&user, category, &word);
    match state.words().replace_image(key, upload.image).await {
        Ok(word) => Json(word).into_response(),
        Err(err) => word_error(err, Missing::BadRequest).into_response(),
    }
}

fn translation_target(
    category: &str,
    translation: String,
) -> Result<(Uuid, BTreeSet<String>), AppError> {
    let category = category_id(category)?;
    if translation.trim().is_empty() {
        return Err(AppError::bad_request(INVALID_PARAMETERS));
    }
    Ok((category, BTreeSet::from([translation])))
}

async fn add_translation(
    State(state): State<AppState>,
    Path((user, category, word, translation)): Path<(String, String, String, String)>,
) -> Response {
    let (category, translation) = match translation_target(&category, translation) {
        Ok(parsed) => parsed,
        Err(err) => return err.into_response(),
    };

    let key = WordKey::new(&user, category, &word);
    match state.words().add_translation(key, &translation).await {
        Ok(word) => Json(word).into_response(),
        Err(err) => word_error(err, Missing::BadRequest).into_response(),
    }
}

async fn remove_translation(
    State(state): State<AppState>,
    Path((user, category, word, translation)): Path<(String, String, String, String)>,
) -> Response {
    let (category, translation) = match translation_target(&category, translation) {
        Ok(parsed) => parsed,
        Err(err) => return err.into_response(),
    };

    let key = WordKey::new(&user, category, &word);
    match state.words().remove_translation(key, &translation).await {
        Ok(word) => Json(word).into_response(),
        Err(err) => word_error(err, Missing::BadRequest).into_response(),
    }
}

async fn remove_word(
    State(state): State<AppState>,
    Path((user, category, word)): Path<(String, String, String)>,
) -> Response {
    let category = match category_id(&category) {
        Ok(id) => id,
        Err(err) => return err.into_response(),
    };

    match state.words().delete(WordKey::new(&user, category, &word)).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => word_error(err, Missing::NotFound).into_response(),
    }
}

async fn remove_category_words(
    State(state): State<AppState>,
    Path((user, category)): Path<(String, String)>,
) -> Response {
    let category = match category_id(&category) {
        Ok(id) => id,
        Err(err) => return err.into_response(),
    };

    match state.words().delete_category_words(&user, category).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => word_error(err, Missing::NotFound).into_response(),
    }
}
