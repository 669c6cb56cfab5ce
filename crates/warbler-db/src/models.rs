//! Database row types that map directly to SQLite rows.
//! Distinct from the warbler-types models so the storage layer owns the raw
//! TEXT columns and their parsing.

use chrono::{DateTime, NaiveDateTime, Utc};
use uuid::Uuid;

use warbler_types::models::{Message, User};

use crate::{DbError, Result};

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub image_url: String,
    pub header_image_url: String,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub created_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub text: String,
    pub user_id: String,
    pub created_at: String,
}

/// A timeline entry carries the author's username so the feed renders in a
/// single query instead of an N+1 lookup.
pub struct TimelineRow {
    pub id: String,
    pub text: String,
    pub user_id: String,
    pub author_username: String,
    pub created_at: String,
}

impl UserRow {
    pub fn into_model(self) -> Result<User> {
        Ok(User {
            id: parse_id("users.id", &self.id)?,
            username: self.username,
            email: self.email,
            image_url: self.image_url,
            header_image_url: self.header_image_url,
            bio: self.bio,
            location: self.location,
            created_at: parse_timestamp("users.created_at", &self.created_at)?,
        })
    }
}

impl MessageRow {
    pub fn into_model(self) -> Result<Message> {
        Ok(Message {
            id: parse_id("messages.id", &self.id)?,
            text: self.text,
            user_id: parse_id("messages.user_id", &self.user_id)?,
            created_at: parse_timestamp("messages.created_at", &self.created_at)?,
        })
    }
}

fn parse_id(column: &str, value: &str) -> Result<Uuid> {
    value
        .parse()
        .map_err(|_| DbError::CorruptRow(format!("{column}: bad uuid '{value}'")))
}

/// SQLite's datetime('now') stores "YYYY-MM-DD HH:MM:SS" without a timezone;
/// accept that alongside RFC 3339 and treat both as UTC.
fn parse_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>> {
    value
        .parse::<DateTime<Utc>>()
        .or_else(|_| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .map_err(|_| DbError::CorruptRow(format!("{column}: bad timestamp '{value}'")))
}
