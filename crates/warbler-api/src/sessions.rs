use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{HeaderValue, header};
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::cookie::{Cookie, CookieJar};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64;
use rand::RngCore;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::AppState;

/// Cookie carrying the opaque session token. The token is the only thing the
/// client holds; user identity stays server-side.
pub const SESSION_COOKIE: &str = "warbler_session";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashLevel {
    Success,
    Danger,
}

impl FlashLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            FlashLevel::Success => "success",
            FlashLevel::Danger => "danger",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Flash {
    pub level: FlashLevel,
    pub text: String,
}

#[derive(Default)]
struct SessionData {
    user_id: Option<Uuid>,
    flashes: Vec<Flash>,
}

/// Server-side session map: token -> session state.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<String, SessionData>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self) -> Session {
        let token = new_token();
        self.inner
            .write()
            .await
            .insert(token.clone(), SessionData::default());
        Session {
            token,
            store: self.clone(),
        }
    }

    /// A session already authenticated as `user_id`. Tests use this to mimic
    /// a logged-in client without driving the login form.
    pub async fn create_for_user(&self, user_id: Uuid) -> Session {
        let session = self.create().await;
        session.login(user_id).await;
        session
    }

    pub async fn get(&self, token: &str) -> Option<Session> {
        if self.inner.read().await.contains_key(token) {
            Some(Session {
                token: token.to_string(),
                store: self.clone(),
            })
        } else {
            None
        }
    }
}

fn new_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    B64.encode(bytes)
}

/// Handle to one client's session, placed in request extensions by
/// `load_session`.
#[derive(Clone)]
pub struct Session {
    token: String,
    store: SessionStore,
}

impl Session {
    pub fn token(&self) -> &str {
        &self.token
    }

    pub async fn user_id(&self) -> Option<Uuid> {
        self.store
            .inner
            .read()
            .await
            .get(&self.token)
            .and_then(|data| data.user_id)
    }

    pub async fn login(&self, user_id: Uuid) {
        if let Some(data) = self.store.inner.write().await.get_mut(&self.token) {
            data.user_id = Some(user_id);
        }
    }

    /// Clears the authenticated identity. The session itself survives so
    /// queued flashes still render on the next page.
    pub async fn logout(&self) {
        if let Some(data) = self.store.inner.write().await.get_mut(&self.token) {
            data.user_id = None;
        }
    }

    pub async fn flash(&self, level: FlashLevel, text: impl Into<String>) {
        if let Some(data) = self.store.inner.write().await.get_mut(&self.token) {
            data.flashes.push(Flash {
                level,
                text: text.into(),
            });
        }
    }

    /// Drains queued flashes; each shows once, on the next rendered page.
    pub async fn take_flashes(&self) -> Vec<Flash> {
        self.store
            .inner
            .write()
            .await
            .get_mut(&self.token)
            .map(|data| std::mem::take(&mut data.flashes))
            .unwrap_or_default()
    }
}

/// Resolves the session cookie to a server-side session, creating one when
/// the cookie is absent or stale, and exposes the handle to handlers as an
/// extension. Applied to every route.
pub async fn load_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let existing = match jar.get(SESSION_COOKIE) {
        Some(cookie) => state.sessions.get(cookie.value()).await,
        None => None,
    };

    let (session, created) = match existing {
        Some(session) => (session, false),
        None => (state.sessions.create().await, true),
    };
    let token = session.token().to_string();

    req.extensions_mut().insert(session);
    let mut res = next.run(req).await;

    if created {
        let cookie = Cookie::build((SESSION_COOKIE, token))
            .path("/")
            .http_only(true)
            .build();
        if let Ok(value) = HeaderValue::from_str(&cookie.to_string()) {
            res.headers_mut().append(header::SET_COOKIE, value);
        }
    }
    res
}
