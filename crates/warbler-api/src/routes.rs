use axum::routing::{get, post};
use axum::{Router, middleware};

use crate::auth::{self, AppState};
use crate::{messages, pages, sessions, users};

/// Assembles the full application router. The session loader wraps every
/// route; per-view auth decisions happen inside the handlers because the
/// denial shape differs between views (redirect-with-flash vs. a direct
/// notice page).
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(pages::home))
        .route("/signup", get(auth::signup_form).post(auth::signup_submit))
        .route("/login", get(auth::login_form).post(auth::login_submit))
        .route("/logout", get(auth::logout))
        .route("/users/{user_id}", get(users::show))
        .route("/users/{user_id}/followers", get(users::followers))
        .route("/users/{user_id}/following", get(users::following))
        .route("/users/follow/{user_id}", post(users::follow))
        .route("/users/stop-following/{user_id}", post(users::unfollow))
        .route("/messages/new", get(messages::new_form).post(messages::create))
        .route("/messages/{message_id}", get(messages::show))
        .route("/messages/{message_id}/delete", post(messages::delete))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            sessions::load_session,
        ))
        .with_state(state)
}
