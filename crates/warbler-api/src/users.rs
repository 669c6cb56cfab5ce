use axum::Extension;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::info;
use uuid::Uuid;

use warbler_db::DbError;
use warbler_types::models::User;

use crate::auth::{self, AppState};
use crate::error::AppError;
use crate::pages;
use crate::sessions::{FlashLevel, Session};

/// GET /users/{user_id}: public profile with the user's own messages.
pub async fn show(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let Some(row) = state.db.user_by_id(&user_id.to_string())? else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };
    let user = row.into_model()?;

    let messages = state
        .db
        .messages_for_user(&user_id.to_string())?
        .into_iter()
        .map(|row| row.into_model())
        .collect::<Result<Vec<_>, _>>()?;

    Ok(pages::profile_page(&user, &messages).into_response())
}

/// GET /users/{user_id}/followers, login required. The denial renders
/// directly as a 200 page: there is no form to bounce back to and nothing to
/// leak.
pub async fn followers(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(user_id): Path<Uuid>,
) -> Result<Response, AppError> {
    if auth::current_user(&state, &session).await?.is_none() {
        return Ok(pages::unauthorized_page().into_response());
    }

    let Some(user) = lookup(&state, user_id)? else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };
    let followers = user_list(state.db.followers_of(&user_id.to_string())?)?;

    Ok(pages::follow_list_page("Followers", &user, &followers).into_response())
}

/// GET /users/{user_id}/following, same gate as the followers view.
pub async fn following(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(user_id): Path<Uuid>,
) -> Result<Response, AppError> {
    if auth::current_user(&state, &session).await?.is_none() {
        return Ok(pages::unauthorized_page().into_response());
    }

    let Some(user) = lookup(&state, user_id)? else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };
    let following = user_list(state.db.following_of(&user_id.to_string())?)?;

    Ok(pages::follow_list_page("Following", &user, &following).into_response())
}

/// POST /users/follow/{user_id}: current user starts following the target.
/// Re-following someone is a no-op, not an error.
pub async fn follow(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(user_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let Some(me) = auth::current_user(&state, &session).await? else {
        return Ok(deny(&session).await);
    };

    if state.db.user_by_id(&user_id.to_string())?.is_none() {
        return Ok(StatusCode::NOT_FOUND.into_response());
    }

    match state.db.follow(&user_id.to_string(), &me.id.to_string()) {
        Ok(()) => info!("@{} followed user {user_id}", me.username),
        Err(DbError::UniqueViolation { .. }) => {}
        Err(err) => return Err(err.into()),
    }

    Ok(pages::redirect(&format!("/users/{}/following", me.id)))
}

/// POST /users/stop-following/{user_id}
pub async fn unfollow(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(user_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let Some(me) = auth::current_user(&state, &session).await? else {
        return Ok(deny(&session).await);
    };

    state
        .db
        .unfollow(&user_id.to_string(), &me.id.to_string())?;

    Ok(pages::redirect(&format!("/users/{}/following", me.id)))
}

fn lookup(state: &AppState, user_id: Uuid) -> Result<Option<User>, AppError> {
    match state.db.user_by_id(&user_id.to_string())? {
        Some(row) => Ok(Some(row.into_model()?)),
        None => Ok(None),
    }
}

fn user_list(rows: Vec<warbler_db::models::UserRow>) -> Result<Vec<User>, AppError> {
    rows.into_iter()
        .map(|row| row.into_model().map_err(AppError::from))
        .collect()
}

async fn deny(session: &Session) -> Response {
    session
        .flash(FlashLevel::Danger, "Access unauthorized.")
        .await;
    pages::redirect("/")
}
