use std::sync::Arc;

use axum::extract::State;
use axum::response::{Html, IntoResponse, Response};
use axum::{Extension, Form};
use tracing::info;
use uuid::Uuid;

use warbler_db::{Database, DbError};
use warbler_types::forms::{LoginForm, SignupForm};
use warbler_types::models::{DEFAULT_IMAGE_URL, User};

use crate::error::AppError;
use crate::pages;
use crate::password;
use crate::sessions::{FlashLevel, Session, SessionStore};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub sessions: SessionStore,
}

pub const PASSWORD_MIN_CHARS: usize = 6;

/// Hash the password and persist the new user. A duplicate username or email
/// comes back as `DbError::UniqueViolation` for the handler to turn into a
/// form error; SQLite has already rolled the insert back by then.
pub fn signup(
    db: &Database,
    username: &str,
    email: &str,
    password: &str,
    image_url: Option<&str>,
) -> Result<User, AppError> {
    let password_hash = password::hash_password(password).map_err(AppError::Hash)?;
    let id = Uuid::new_v4();
    let image_url = match image_url {
        Some(url) if !url.trim().is_empty() => url,
        _ => DEFAULT_IMAGE_URL,
    };

    db.create_user(&id.to_string(), username, email, &password_hash, image_url)?;

    // Read the row back so column defaults and the timestamp come from the
    // database rather than being duplicated here.
    let row = db
        .user_by_id(&id.to_string())?
        .ok_or_else(|| DbError::CorruptRow(format!("users.id: vanished after insert '{id}'")))?;
    Ok(row.into_model()?)
}

/// Looks the user up by username and verifies the password hash. Unknown
/// username, wrong password, and an unreadable stored hash are all `Ok(None)`:
/// bad credentials are a value, never an error.
pub fn authenticate(
    db: &Database,
    username: &str,
    password: &str,
) -> Result<Option<User>, AppError> {
    let Some(row) = db.user_by_username(username)? else {
        return Ok(None);
    };
    if !password::verify_password(password, &row.password) {
        return Ok(None);
    }
    Ok(Some(row.into_model()?))
}

/// Resolves the session's stored id to a live user. A stale id (user deleted
/// since login) reads as logged out.
pub async fn current_user(state: &AppState, session: &Session) -> Result<Option<User>, AppError> {
    let Some(user_id) = session.user_id().await else {
        return Ok(None);
    };
    let Some(row) = state.db.user_by_id(&user_id.to_string())? else {
        return Ok(None);
    };
    Ok(Some(row.into_model()?))
}

// -- Handlers --

pub async fn signup_form(Extension(session): Extension<Session>) -> Html<String> {
    let flashes = session.take_flashes().await;
    pages::signup_page(&[], &flashes)
}

pub async fn signup_submit(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Form(form): Form<SignupForm>,
) -> Result<Response, AppError> {
    let mut errors = Vec::new();
    if form.username.trim().is_empty() {
        errors.push("This field is required.".to_string());
    }
    if form.email.trim().is_empty() {
        errors.push("This field is required.".to_string());
    }
    if form.password.chars().count() < PASSWORD_MIN_CHARS {
        errors.push("Field must be at least 6 characters long.".to_string());
    }
    if !errors.is_empty() {
        return Ok(pages::signup_page(&errors, &[]).into_response());
    }

    match signup(
        &state.db,
        form.username.trim(),
        form.email.trim(),
        &form.password,
        form.image_url.as_deref(),
    ) {
        Ok(user) => {
            session.login(user.id).await;
            info!("new user signed up: {user}");
            Ok(pages::redirect("/"))
        }
        Err(AppError::Db(DbError::UniqueViolation { constraint })) => {
            let error = if constraint.contains("email") {
                "Email already taken"
            } else {
                "Username already taken"
            };
            Ok(pages::signup_page(&[error.to_string()], &[]).into_response())
        }
        Err(err) => Err(err),
    }
}

pub async fn login_form(Extension(session): Extension<Session>) -> Html<String> {
    let flashes = session.take_flashes().await;
    pages::login_page(None, &flashes)
}

/// Failure stays deliberately vague: "Invalid credentials." never says which
/// field was wrong.
pub async fn login_submit(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    match authenticate(&state.db, &form.username, &form.password)? {
        Some(user) => {
            session.login(user.id).await;
            session
                .flash(FlashLevel::Success, format!("Hello, {}!", user.username))
                .await;
            info!("user logged in: @{}", user.username);
            Ok(pages::redirect("/"))
        }
        None => Ok(pages::login_page(Some("Invalid credentials."), &[]).into_response()),
    }
}

pub async fn logout(Extension(session): Extension<Session>) -> Response {
    session.logout().await;
    session
        .flash(FlashLevel::Success, "You have successfully logged out.")
        .await;
    pages::redirect("/login")
}
