#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, header};
use http_body_util::BodyExt;
use tower::ServiceExt;
use uuid::Uuid;

use warbler_api::auth::{AppState, AppStateInner};
use warbler_api::routes;
use warbler_api::sessions::{SESSION_COOKIE, SessionStore};
use warbler_db::Database;

pub fn test_state() -> AppState {
    Arc::new(AppStateInner {
        db: Database::open_in_memory().expect("in-memory db"),
        sessions: SessionStore::new(),
    })
}

pub fn app(state: &AppState) -> Router {
    routes::router(state.clone())
}

/// Seed a user straight through the signup service.
pub fn seed_user(state: &AppState, username: &str, email: &str, password: &str) -> Uuid {
    warbler_api::auth::signup(&state.db, username, email, password, None)
        .expect("seed user")
        .id
}

/// Cookie header value for a session already authenticated as `user_id`,
/// the test analogue of logging in without driving the form.
pub async fn login_cookie(state: &AppState, user_id: Uuid) -> String {
    let session = state.sessions.create_for_user(user_id).await;
    format!("{SESSION_COOKIE}={}", session.token())
}

pub async fn get(app: &Router, path: &str, cookie: Option<&str>) -> Response<Body> {
    send(app, "GET", path, None, cookie).await
}

pub async fn post_form(
    app: &Router,
    path: &str,
    form: &str,
    cookie: Option<&str>,
) -> Response<Body> {
    send(app, "POST", path, Some(form), cookie).await
}

pub async fn send(
    app: &Router,
    method: &str,
    path: &str,
    form: Option<&str>,
    cookie: Option<&str>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = match form {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    };
    app.clone().oneshot(request).await.expect("response")
}

pub async fn body_text(res: Response<Body>) -> String {
    let bytes = res.into_body().collect().await.expect("body").to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

/// The Location target of a redirect response.
pub fn location(res: &Response<Body>) -> String {
    res.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .expect("location header")
        .to_string()
}

/// The session cookie a response handed out, as a Cookie header value.
pub fn handed_cookie(res: &Response<Body>) -> Option<String> {
    res.headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

/// Follow a redirect with the given cookie, returning the final response.
pub async fn follow_redirect(
    app: &Router,
    res: &Response<Body>,
    cookie: Option<&str>,
) -> Response<Body> {
    let target = location(res);
    get(app, &target, cookie).await
}
