//! Server-rendered pages as minimal inline HTML fragments. The real app
//! dressed these up with templates and static assets; here the markup is just
//! enough to carry the data and the flash notices.

use axum::Extension;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};

use warbler_db::models::TimelineRow;
use warbler_types::models::{Message, User};

use crate::auth::{self, AppState};
use crate::error::AppError;
use crate::sessions::{Flash, Session};

/// GET /: the timeline for a logged-in user, a sign-up prompt otherwise.
/// Either way this is where flash notices queued across a redirect surface.
pub async fn home(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Response, AppError> {
    let flashes = session.take_flashes().await;
    match auth::current_user(&state, &session).await? {
        Some(user) => {
            let timeline = state.db.timeline_for_user(&user.id.to_string(), 100)?;
            Ok(home_page(&user, &timeline, &flashes).into_response())
        }
        None => Ok(anon_home_page(&flashes).into_response()),
    }
}

fn home_page(user: &User, timeline: &[TimelineRow], flashes: &[Flash]) -> Html<String> {
    let mut body = format!("<h1>Home</h1>\n<p>Logged in as @{}</p>\n", escape(&user.username));
    body.push_str("<ul>\n");
    for row in timeline {
        body.push_str(&format!(
            "<li>@{}: {} <small>{}</small></li>\n",
            escape(&row.author_username),
            escape(&row.text),
            escape(&row.created_at),
        ));
    }
    body.push_str("</ul>\n");
    page("Warbler", flashes, &body)
}

fn anon_home_page(flashes: &[Flash]) -> Html<String> {
    page(
        "Warbler",
        flashes,
        "<h1>What's Happening?</h1>\n\
         <p><a href=\"/signup\">Sign up now to get your own personalized timeline!</a></p>\n\
         <p><a href=\"/login\">Log in</a></p>",
    )
}

pub fn signup_page(errors: &[String], flashes: &[Flash]) -> Html<String> {
    let mut body = String::from("<h1>Join Warbler today.</h1>\n");
    for error in errors {
        body.push_str(&format!("<span class=\"form-error\">{}</span>\n", escape(error)));
    }
    body.push_str(
        "<form method=\"POST\" action=\"/signup\">\n\
         <input name=\"username\" placeholder=\"Username\">\n\
         <input name=\"email\" placeholder=\"E-mail\">\n\
         <input name=\"password\" type=\"password\" placeholder=\"Password\">\n\
         <input name=\"image_url\" placeholder=\"(Optional) Image URL\">\n\
         <button>Sign me up!</button>\n\
         </form>",
    );
    page("Sign up", flashes, &body)
}

pub fn login_page(error: Option<&str>, flashes: &[Flash]) -> Html<String> {
    let mut body = String::from("<h1>Welcome back.</h1>\n");
    if let Some(error) = error {
        body.push_str(&format!(
            "<div class=\"alert alert-danger\">{}</div>\n",
            escape(error)
        ));
    }
    body.push_str(
        "<form method=\"POST\" action=\"/login\">\n\
         <input name=\"username\" placeholder=\"Username\">\n\
         <input name=\"password\" type=\"password\" placeholder=\"Password\">\n\
         <button>Log in</button>\n\
         </form>",
    );
    page("Log in", flashes, &body)
}

pub fn new_message_page(error: Option<&str>) -> Html<String> {
    let mut body = String::new();
    if let Some(error) = error {
        body.push_str(&format!(
            "<span class=\"form-error\">{}</span>\n",
            escape(error)
        ));
    }
    body.push_str(
        "<form method=\"POST\" action=\"/messages/new\">\n\
         <textarea name=\"text\" placeholder=\"What's happening?\"></textarea>\n\
         <button>Add my message!</button>\n\
         </form>",
    );
    page("New message", &[], &body)
}

pub fn profile_page(user: &User, messages: &[Message]) -> Html<String> {
    let mut body = format!("<h1>@{}</h1>\n", escape(&user.username));
    if let Some(bio) = &user.bio {
        body.push_str(&format!("<p>{}</p>\n", escape(bio)));
    }
    if let Some(location) = &user.location {
        body.push_str(&format!("<p>{}</p>\n", escape(location)));
    }
    body.push_str("<ul>\n");
    for message in messages {
        body.push_str(&format!(
            "<li><a href=\"/messages/{}\">{}</a> <small>{}</small></li>\n",
            message.id,
            escape(&message.text),
            message.created_at.format("%d %B %Y"),
        ));
    }
    body.push_str("</ul>\n");
    page(&format!("@{}", user.username), &[], &body)
}

pub fn message_page(message: &Message, author_username: &str) -> Html<String> {
    let body = format!(
        "<p>@{}</p>\n<blockquote>{}</blockquote>\n<small>{}</small>",
        escape(author_username),
        escape(&message.text),
        message.created_at.format("%d %B %Y"),
    );
    page("Message", &[], &body)
}

pub fn follow_list_page(heading: &str, user: &User, list: &[User]) -> Html<String> {
    let mut body = format!(
        "<h1>{} of @{}</h1>\n",
        escape(heading),
        escape(&user.username)
    );
    for other in list {
        body.push_str(&format!(
            "<p><a href=\"/users/{}\">@{}</a></p>\n",
            other.id,
            escape(&other.username)
        ));
    }
    page(heading, &[], &body)
}

/// The denial page the listing views render directly: a 200 with the notice
/// and nothing else.
pub fn unauthorized_page() -> Html<String> {
    page(
        "Warbler",
        &[],
        "<div class=\"alert alert-danger\">Access unauthorized.</div>",
    )
}

/// 302 Found. The form flows reply with FOUND; axum's `Redirect::to` would
/// send 303.
pub fn redirect(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

fn page(title: &str, flashes: &[Flash], body: &str) -> Html<String> {
    let mut alerts = String::new();
    for flash in flashes {
        alerts.push_str(&format!(
            "<div class=\"alert alert-{}\">{}</div>\n",
            flash.level.as_str(),
            escape(&flash.text)
        ));
    }
    Html(format!(
        "<!DOCTYPE html>\n<html>\n<head><title>{}</title></head>\n<body>\n{}{}\n</body>\n</html>\n",
        escape(title),
        alerts,
        body
    ))
}

pub(crate) fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
