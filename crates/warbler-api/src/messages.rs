use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Form};
use tracing::info;
use uuid::Uuid;

use warbler_types::forms::MessageForm;
use warbler_types::models::MESSAGE_MAX_CHARS;

use crate::auth::{self, AppState};
use crate::error::AppError;
use crate::pages;
use crate::sessions::{FlashLevel, Session};

/// GET /messages/new
pub async fn new_form(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Response, AppError> {
    if auth::current_user(&state, &session).await?.is_none() {
        return Ok(deny(&session).await);
    }
    Ok(pages::new_message_page(None).into_response())
}

/// POST /messages/new, authenticated only. An anonymous attempt inserts
/// nothing and bounces home, where the denial notice renders.
pub async fn create(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Form(form): Form<MessageForm>,
) -> Result<Response, AppError> {
    let Some(user) = auth::current_user(&state, &session).await? else {
        return Ok(deny(&session).await);
    };

    let text = form.text.trim();
    if text.is_empty() || text.chars().count() > MESSAGE_MAX_CHARS {
        return Ok(
            pages::new_message_page(Some("Message must be between 1 and 140 characters."))
                .into_response(),
        );
    }

    let id = Uuid::new_v4();
    state
        .db
        .insert_message(&id.to_string(), &user.id.to_string(), text)?;
    info!("message {id} posted by @{}", user.username);

    Ok(pages::redirect(&format!("/users/{}", user.id)))
}

/// GET /messages/{message_id}
pub async fn show(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let Some(row) = state.db.message_by_id(&message_id.to_string())? else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };
    let message = row.into_model()?;

    let author_username = state
        .db
        .user_by_id(&message.user_id.to_string())?
        .map(|row| row.username)
        .unwrap_or_else(|| "unknown".to_string());

    Ok(pages::message_page(&message, &author_username).into_response())
}

/// POST /messages/{message_id}/delete, owner only. Anyone else, logged
/// in or not, gets the same denial and the row stays put.
pub async fn delete(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(message_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let Some(user) = auth::current_user(&state, &session).await? else {
        return Ok(deny(&session).await);
    };

    let Some(row) = state.db.message_by_id(&message_id.to_string())? else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };

    if row.user_id != user.id.to_string() {
        return Ok(deny(&session).await);
    }

    state.db.delete_message(&row.id)?;
    info!("message {} deleted by @{}", row.id, user.username);

    Ok(pages::redirect(&format!("/users/{}", user.id)))
}

async fn deny(session: &Session) -> Response {
    session
        .flash(FlashLevel::Danger, "Access unauthorized.")
        .await;
    pages::redirect("/")
}
