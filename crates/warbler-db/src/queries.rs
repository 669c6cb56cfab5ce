use rusqlite::{Connection, OptionalExtension, params};

use crate::models::{MessageRow, TimelineRow, UserRow};
use crate::{Database, DbError, Result};

const USER_COLUMNS: &str =
    "id, username, email, password, image_url, header_image_url, bio, location, created_at";

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        username: &str,
        email: &str,
        password_hash: &str,
        image_url: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, email, password, image_url)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, username, email, password_hash, image_url],
            )
            .map_err(map_unique)?;
            Ok(())
        })
    }

    pub fn user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    pub fn user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_username(conn, username))
    }

    /// Deletes the user row; messages and follow edges go with it via
    /// ON DELETE CASCADE. Returns false if no such user existed.
    pub fn delete_user(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
            Ok(n > 0)
        })
    }

    pub fn count_users(&self) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?)
        })
    }

    // -- Messages --

    pub fn insert_message(&self, id: &str, user_id: &str, text: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, user_id, text) VALUES (?1, ?2, ?3)",
                params![id, user_id, text],
            )?;
            Ok(())
        })
    }

    pub fn message_by_id(&self, id: &str) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, text, user_id, created_at FROM messages WHERE id = ?1",
                    [id],
                    message_from_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Returns false if no such message existed.
    pub fn delete_message(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM messages WHERE id = ?1", [id])?;
            Ok(n > 0)
        })
    }

    pub fn messages_for_user(&self, user_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, text, user_id, created_at FROM messages
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, id",
            )?;
            let rows = stmt
                .query_map([user_id], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// The home feed: the user's own messages plus those of everyone they
    /// follow, newest first. JOINs users for the author username so the page
    /// renders from a single query.
    pub fn timeline_for_user(&self, user_id: &str, limit: u32) -> Result<Vec<TimelineRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.id, m.text, m.user_id, u.username, m.created_at
                 FROM messages m
                 JOIN users u ON u.id = m.user_id
                 WHERE m.user_id = ?1
                    OR m.user_id IN (SELECT user_being_followed_id
                                     FROM follows
                                     WHERE user_following_id = ?1)
                 ORDER BY m.created_at DESC, m.id
                 LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(params![user_id, limit], |row| {
                    Ok(TimelineRow {
                        id: row.get(0)?,
                        text: row.get(1)?,
                        user_id: row.get(2)?,
                        author_username: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_messages(&self) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))?)
        })
    }

    // -- Follows --

    /// Records "follower follows followed". A duplicate edge for the same
    /// ordered pair is a UniqueViolation (composite primary key).
    pub fn follow(&self, followed_id: &str, follower_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO follows (user_being_followed_id, user_following_id)
                 VALUES (?1, ?2)",
                params![followed_id, follower_id],
            )
            .map_err(map_unique)?;
            Ok(())
        })
    }

    /// Returns false if the edge did not exist.
    pub fn unfollow(&self, followed_id: &str, follower_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM follows
                 WHERE user_being_followed_id = ?1 AND user_following_id = ?2",
                params![followed_id, follower_id],
            )?;
            Ok(n > 0)
        })
    }

    /// Does `follower_id` follow `followed_id`?
    pub fn is_following(&self, follower_id: &str, followed_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM follows
                 WHERE user_being_followed_id = ?1 AND user_following_id = ?2)",
                params![followed_id, follower_id],
                |row| row.get(0),
            )?)
        })
    }

    /// Is `user_id` followed by `follower_id`? The same edge set read from
    /// the other end.
    pub fn is_followed_by(&self, user_id: &str, follower_id: &str) -> Result<bool> {
        self.is_following(follower_id, user_id)
    }

    /// Users with an edge pointing at `user_id`.
    pub fn followers_of(&self, user_id: &str) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {cols} FROM users u
                 JOIN follows f ON f.user_following_id = u.id
                 WHERE f.user_being_followed_id = ?1
                 ORDER BY u.username",
                cols = prefixed_user_columns()
            );
            collect_users(conn, &sql, user_id)
        })
    }

    /// Users `user_id` has an edge pointing at.
    pub fn following_of(&self, user_id: &str) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {cols} FROM users u
                 JOIN follows f ON f.user_being_followed_id = u.id
                 WHERE f.user_following_id = ?1
                 ORDER BY u.username",
                cols = prefixed_user_columns()
            );
            collect_users(conn, &sql, user_id)
        })
    }
}

fn query_user_by_id(conn: &Connection, id: &str) -> Result<Option<UserRow>> {
    let row = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            [id],
            user_from_row,
        )
        .optional()?;
    Ok(row)
}

fn query_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let row = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
            [username],
            user_from_row,
        )
        .optional()?;
    Ok(row)
}

fn collect_users(conn: &Connection, sql: &str, param: &str) -> Result<Vec<UserRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([param], user_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn prefixed_user_columns() -> String {
    USER_COLUMNS
        .split(", ")
        .map(|c| format!("u.{c}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        image_url: row.get(4)?,
        header_image_url: row.get(5)?,
        bio: row.get(6)?,
        location: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn message_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        text: row.get(1)?,
        user_id: row.get(2)?,
        created_at: row.get(3)?,
    })
}

/// Surfaces UNIQUE failures as their own error kind so callers can re-render
/// a form instead of returning a 500.
fn map_unique(err: rusqlite::Error) -> DbError {
    if let rusqlite::Error::SqliteFailure(e, Some(msg)) = &err {
        if e.code == rusqlite::ErrorCode::ConstraintViolation
            && msg.contains("UNIQUE constraint failed")
        {
            let constraint = msg
                .trim_start_matches("UNIQUE constraint failed: ")
                .to_string();
            return DbError::UniqueViolation { constraint };
        }
    }
    DbError::Sqlite(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn test_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn add_user(db: &Database, username: &str, email: &str) -> String {
        let id = Uuid::new_v4().to_string();
        db.create_user(&id, username, email, "HASHED_PASSWORD", "/static/images/default-pic.png")
            .unwrap();
        id
    }

    #[test]
    fn test_follow_edges_are_directional() {
        let db = test_db();
        let u = add_user(&db, "testuser", "test@test.com");
        let u2 = add_user(&db, "testuser2", "test2@test2.com");

        // u2 follows u
        db.follow(&u, &u2).unwrap();

        assert_eq!(db.followers_of(&u).unwrap().len(), 1);
        assert_eq!(db.followers_of(&u2).unwrap().len(), 0);
        assert_eq!(db.following_of(&u).unwrap().len(), 0);
        assert_eq!(db.following_of(&u2).unwrap().len(), 1);

        assert!(db.is_followed_by(&u, &u2).unwrap());
        assert!(!db.is_followed_by(&u2, &u).unwrap());
        assert!(db.is_following(&u2, &u).unwrap());
        assert!(!db.is_following(&u, &u2).unwrap());
    }

    #[test]
    fn test_duplicate_follow_edge_rejected() {
        let db = test_db();
        let u = add_user(&db, "a", "a@test.com");
        let u2 = add_user(&db, "b", "b@test.com");

        db.follow(&u, &u2).unwrap();
        let err = db.follow(&u, &u2).unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));

        // the reverse edge is a different ordered pair
        db.follow(&u2, &u).unwrap();
    }

    #[test]
    fn test_unfollow_removes_edge() {
        let db = test_db();
        let u = add_user(&db, "a", "a@test.com");
        let u2 = add_user(&db, "b", "b@test.com");

        db.follow(&u, &u2).unwrap();
        assert!(db.unfollow(&u, &u2).unwrap());
        assert!(!db.unfollow(&u, &u2).unwrap());
        assert!(!db.is_following(&u2, &u).unwrap());
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let db = test_db();
        add_user(&db, "testuser", "test@test.com");

        let err = db
            .create_user(
                &Uuid::new_v4().to_string(),
                "testuser",
                "other@test.com",
                "HASHED_PW",
                "/static/images/default-pic.png",
            )
            .unwrap_err();

        match err {
            DbError::UniqueViolation { constraint } => {
                assert_eq!(constraint, "users.username")
            }
            other => panic!("expected UniqueViolation, got {other:?}"),
        }
        assert_eq!(db.count_users().unwrap(), 1);
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let db = test_db();
        add_user(&db, "new_user", "new_user@test.com");

        let err = db
            .create_user(
                &Uuid::new_v4().to_string(),
                "new_user2",
                "new_user@test.com",
                "HASHED_PW",
                "/static/images/default-pic.png",
            )
            .unwrap_err();

        assert!(matches!(err, DbError::UniqueViolation { .. }));
        assert_eq!(db.count_users().unwrap(), 1);
    }

    #[test]
    fn test_message_crud() {
        let db = test_db();
        let u = add_user(&db, "testuser", "test@test.com");

        let mid = Uuid::new_v4().to_string();
        db.insert_message(&mid, &u, "Hi there").unwrap();
        assert_eq!(db.count_messages().unwrap(), 1);

        let row = db.message_by_id(&mid).unwrap().unwrap();
        assert_eq!(row.text, "Hi there");
        assert_eq!(row.user_id, u);

        let model = row.into_model().unwrap();
        assert_eq!(model.text, "Hi there");

        assert!(db.delete_message(&mid).unwrap());
        assert!(!db.delete_message(&mid).unwrap());
        assert_eq!(db.count_messages().unwrap(), 0);
    }

    #[test]
    fn test_user_starts_with_no_messages() {
        let db = test_db();
        let u = add_user(&db, "testuser", "test@test.com");
        assert!(db.messages_for_user(&u).unwrap().is_empty());
    }

    #[test]
    fn test_delete_user_cascades() {
        let db = test_db();
        let u = add_user(&db, "a", "a@test.com");
        let u2 = add_user(&db, "b", "b@test.com");

        db.insert_message(&Uuid::new_v4().to_string(), &u, "one").unwrap();
        db.insert_message(&Uuid::new_v4().to_string(), &u, "two").unwrap();
        db.follow(&u, &u2).unwrap();
        db.follow(&u2, &u).unwrap();

        assert!(db.delete_user(&u).unwrap());

        assert_eq!(db.count_messages().unwrap(), 0);
        assert!(db.followers_of(&u2).unwrap().is_empty());
        assert!(db.following_of(&u2).unwrap().is_empty());
    }

    #[test]
    fn test_timeline_covers_self_and_followed() {
        let db = test_db();
        let u = add_user(&db, "a", "a@test.com");
        let u2 = add_user(&db, "b", "b@test.com");
        let u3 = add_user(&db, "c", "c@test.com");

        // u2 follows u, nobody follows u3
        db.follow(&u, &u2).unwrap();

        db.insert_message(&Uuid::new_v4().to_string(), &u, "from a").unwrap();
        db.insert_message(&Uuid::new_v4().to_string(), &u2, "from b").unwrap();
        db.insert_message(&Uuid::new_v4().to_string(), &u3, "from c").unwrap();

        let timeline = db.timeline_for_user(&u2, 100).unwrap();
        let texts: Vec<&str> = timeline.iter().map(|r| r.text.as_str()).collect();

        assert!(texts.contains(&"from a"));
        assert!(texts.contains(&"from b"));
        assert!(!texts.contains(&"from c"));

        let authors: Vec<&str> = timeline.iter().map(|r| r.author_username.as_str()).collect();
        assert!(authors.contains(&"a"));
    }

    #[test]
    fn test_user_row_converts_to_model() {
        let db = test_db();
        let id = add_user(&db, "testuser", "test@test.com");

        let user = db.user_by_id(&id).unwrap().unwrap().into_model().unwrap();
        assert_eq!(user.id.to_string(), id);
        assert_eq!(user.username, "testuser");
        assert_eq!(user.to_string(), format!("<User #{id}: testuser, test@test.com>"));
    }
}
