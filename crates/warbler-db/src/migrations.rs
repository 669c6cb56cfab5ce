use rusqlite::Connection;
use tracing::info;

use crate::Result;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id                  TEXT PRIMARY KEY,
            username            TEXT NOT NULL UNIQUE,
            email               TEXT NOT NULL UNIQUE,
            password            TEXT NOT NULL,
            image_url           TEXT NOT NULL DEFAULT '/static/images/default-pic.png',
            header_image_url    TEXT NOT NULL DEFAULT '/static/images/warbler-hero.jpg',
            bio                 TEXT,
            location            TEXT,
            created_at          TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS messages (
            id          TEXT PRIMARY KEY,
            text        TEXT NOT NULL CHECK (length(text) <= 140),
            user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_messages_user
            ON messages(user_id, created_at);

        CREATE TABLE IF NOT EXISTS follows (
            user_being_followed_id  TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            user_following_id       TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at              TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (user_being_followed_id, user_following_id)
        );

        CREATE INDEX IF NOT EXISTS idx_follows_follower
            ON follows(user_following_id);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
