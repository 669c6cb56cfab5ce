use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Profile image applied when signup omits one.
pub const DEFAULT_IMAGE_URL: &str = "/static/images/default-pic.png";
pub const DEFAULT_HEADER_IMAGE_URL: &str = "/static/images/warbler-hero.jpg";

/// Upper bound on message text length, matching the messages.text CHECK.
pub const MESSAGE_MAX_CHARS: usize = 140;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub image_url: String,
    pub header_image_url: String,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<User #{}: {}, {}>", self.id, self.username, self.email)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub text: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}
