use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, patch};
use axum::{Json, Router};
use serde::Deserialize;

use crate::response::{category_error, Missing};
use crate::routes::empty_listing;
use crate::routes::upload::Upload;
use crate::services::category::INVALID_PARAMETERS;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/category/:user", get(list).post(create))
        .route("/category/:user/:title", delete(remove))
        .route("/category/:user/:title/image", patch(replace_image))
        .route("/category/:user/:title/:new_title", patch(rename))
}

#[derive(Debug, Deserialize)]
struct CategoryForm {
    title: Option<String>,
}

async fn list(State(state): State<AppState>, Path(user): Path<String>) -> Response {
    match state.categories().list_by_user(&user).await {
        Ok(categories) if categories.is_empty() => empty_listing(),
        Ok(categories) => Json(categories).into_response(),
        Err(err) => category_error(err, Missing::NotFound).into_response(),
    }
}

async fn create(
    State(state): State<AppState>,
    Path(user): Path<String>,
    multipart: Multipart,
) -> Response {
    let upload = match Upload::read(multipart, "category").await {
        Ok(upload) => upload,
        Err(err) => return err.into_response(),
    };
    let form: CategoryForm = match upload.document(INVALID_PARAMETERS) {
        Ok(form) => form,
        Err(err) => return err.into_response(),
    };
    let title = form.title.unwrap_or_default();

    match state.categories().create(&user, &title, upload.image).await {
        Ok(category) => Json(category).into_response(),
        Err(err) => category_error(err, Missing::BadRequest).into_response(),
    }
}

async fn replace_image(
    State(state): State<AppState>,
    Path((user, title)): Path<(String, String)>,
    multipart: Multipart,
) -> Response {
    let upload = match Upload::read(multipart, "category").await {
        Ok(upload) => upload,
        Err(err) => return err.into_response(),
    };

    match state.categories().replace_image(&user, &title, upload.image).await {
        Ok(category) => Json(category).into_response(),
        Err(err) => category_error(err, Missing::BadRequest).into_response(),
    }
}

async fn rename(
    State(state): State<AppState>,
    Path((user, title, new_title)): Path<(String, String, String)>,
) -> Response {
    match state.categories().rename(&user, &title, &new_title).await {
        Ok(category) => Json(category).into_response(),
        Err(err) => category_error(err, Missing::BadRequest).into_response(),
    }
}

async fn remove(
    State(state): State<AppState>,
    Path((user, title)): Path<(String, String)>,
) -> Response {
    match state.categories().delete(&user, &title).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => category_error(err, Missing::NotFound).into_response(),
    }
}
