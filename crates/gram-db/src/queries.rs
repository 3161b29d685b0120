use crate::Database;
use crate::models::{CreateUserOutcome, DeleteOutcome, FeedRow, PostRow, UserRow};
use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use rusqlite::Connection;

/// Server-assigned creation timestamp: RFC 3339 UTC with microsecond
/// precision, so stored strings sort chronologically.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        email: &str,
        password_hash: &str,
        created_at: &str,
    ) -> Result<CreateUserOutcome> {
        self.with_conn_mut(|conn| {
            let result = conn.execute(
                "INSERT INTO users (id, email, password, created_at) VALUES (?1, ?2, ?3, ?4)",
                (id, email, password_hash, created_at),
            );
            match result {
                Ok(_) => Ok(CreateUserOutcome::Created),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    Ok(CreateUserOutcome::EmailTaken)
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    /// Remove a user and every post they own, in one transaction.
    /// Returns the number of posts removed alongside the account.
    pub fn delete_user(&self, user_id: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let posts = tx.execute("DELETE FROM posts WHERE user_id = ?1", [user_id])?;
            tx.execute("DELETE FROM users WHERE id = ?1", [user_id])?;
            tx.commit()?;
            Ok(posts)
        })
    }

    // -- Posts --

    pub fn insert_post(&self, post: &PostRow) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO posts (id, user_id, caption, url, file_type, file_name, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    post.id,
                    post.user_id,
                    post.caption,
                    post.url,
                    post.file_type,
                    post.file_name,
                    post.created_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_post(&self, id: &str) -> Result<Option<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, caption, url, file_type, file_name, created_at
                 FROM posts WHERE id = ?1",
            )?;
            stmt.query_row([id], read_post).optional()
        })
    }

    /// Every post, newest first; equal timestamps fall back to insertion
    /// order (later insert first). JOIN users for the owner email in a
    /// single query — no per-post lookups.
    pub fn list_feed(&self) -> Result<Vec<FeedRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT p.id, p.user_id, p.caption, p.url, p.file_type, p.file_name,
                        p.created_at, u.email
                 FROM posts p
                 LEFT JOIN users u ON p.user_id = u.id
                 ORDER BY p.created_at DESC, p.rowid DESC",
            )?;

            let rows = stmt
                .query_map([], |row| {
                    Ok(FeedRow {
                        post: read_post(row)?,
                        owner_email: row
                            .get::<_, Option<String>>(7)?
                            .unwrap_or_else(|| "unknown".to_string()),
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Delete a post only if `requester_id` owns it. The ownership check
    /// and the delete run under the same connection lock.
    pub fn delete_post(&self, post_id: &str, requester_id: &str) -> Result<DeleteOutcome> {
        self.with_conn_mut(|conn| {
            let owner: Option<String> = conn
                .query_row(
                    "SELECT user_id FROM posts WHERE id = ?1",
                    [post_id],
                    |row| row.get(0),
                )
                .optional()?;

            let Some(owner) = owner else {
                return Ok(DeleteOutcome::NotFound);
            };
            if owner != requester_id {
                return Ok(DeleteOutcome::NotOwner);
            }

            conn.execute("DELETE FROM posts WHERE id = ?1", [post_id])?;
            Ok(DeleteOutcome::Deleted)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    // `column` is always a fixed identifier from this module, never user input.
    let sql = format!(
        "SELECT id, email, password, is_active, is_verified, created_at
         FROM users WHERE {} = ?1",
        column
    );
    let mut stmt = conn.prepare(&sql)?;

    stmt.query_row([value], |row| {
        Ok(UserRow {
            id: row.get(0)?,
            email: row.get(1)?,
            password: row.get(2)?,
            is_active: row.get(3)?,
            is_verified: row.get(4)?,
            created_at: row.get(5)?,
        })
    })
    .optional()
}

fn read_post(row: &rusqlite::Row<'_>) -> std::result::Result<PostRow, rusqlite::Error> {
    Ok(PostRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        caption: row.get(2)?,
        url: row.get(3)?,
        file_type: row.get(4)?,
        file_name: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn test_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn seed_user(db: &Database, email: &str) -> String {
        let id = Uuid::new_v4().to_string();
        db.create_user(&id, email, "argon2-hash", &now_timestamp())
            .unwrap();
        id
    }

    fn seed_post(db: &Database, user_id: &str, file_name: &str, created_at: &str) -> String {
        let id = Uuid::new_v4().to_string();
        db.insert_post(&PostRow {
            id: id.clone(),
            user_id: user_id.to_string(),
            caption: Some("hi".to_string()),
            url: format!("https://ik.imagekit.io/demo/{}", file_name),
            file_type: "image".to_string(),
            file_name: file_name.to_string(),
            created_at: created_at.to_string(),
        })
        .unwrap();
        id
    }

    #[test]
    fn duplicate_email_reports_email_taken() {
        let db = test_db();
        let alice = seed_user(&db, "alice@x.com");

        let outcome = db
            .create_user(
                &Uuid::new_v4().to_string(),
                "alice@x.com",
                "other-hash",
                &now_timestamp(),
            )
            .unwrap();
        assert_eq!(outcome, CreateUserOutcome::EmailTaken);

        // the original account is untouched
        let row = db.get_user_by_email("alice@x.com").unwrap().unwrap();
        assert_eq!(row.id, alice);
        assert_eq!(row.password, "argon2-hash");
    }

    #[test]
    fn feed_is_sorted_newest_first() {
        let db = test_db();
        let alice = seed_user(&db, "alice@x.com");

        seed_post(&db, &alice, "a.png", "2026-01-01T10:00:00.000000Z");
        seed_post(&db, &alice, "c.png", "2026-01-03T10:00:00.000000Z");
        seed_post(&db, &alice, "b.png", "2026-01-02T10:00:00.000000Z");

        let feed = db.list_feed().unwrap();
        let names: Vec<&str> = feed.iter().map(|r| r.post.file_name.as_str()).collect();
        assert_eq!(names, vec!["c.png", "b.png", "a.png"]);

        for pair in feed.windows(2) {
            assert!(pair[0].post.created_at >= pair[1].post.created_at);
        }
    }

    #[test]
    fn feed_ties_break_by_insertion_order() {
        let db = test_db();
        let alice = seed_user(&db, "alice@x.com");

        let ts = "2026-01-01T10:00:00.000000Z";
        seed_post(&db, &alice, "first.png", ts);
        seed_post(&db, &alice, "second.png", ts);

        let feed = db.list_feed().unwrap();
        assert_eq!(feed[0].post.file_name, "second.png");
        assert_eq!(feed[1].post.file_name, "first.png");
    }

    #[test]
    fn feed_joins_owner_email() {
        let db = test_db();
        let alice = seed_user(&db, "alice@x.com");
        seed_post(&db, &alice, "cat.png", &now_timestamp());

        let feed = db.list_feed().unwrap();
        assert_eq!(feed[0].owner_email, "alice@x.com");
    }

    #[test]
    fn delete_by_non_owner_leaves_post_intact() {
        let db = test_db();
        let alice = seed_user(&db, "alice@x.com");
        let bob = seed_user(&db, "bob@x.com");
        let post_id = seed_post(&db, &alice, "cat.png", &now_timestamp());

        let outcome = db.delete_post(&post_id, &bob).unwrap();
        assert_eq!(outcome, DeleteOutcome::NotOwner);
        assert!(db.get_post(&post_id).unwrap().is_some());
    }

    #[test]
    fn delete_of_missing_post_reports_not_found() {
        let db = test_db();
        let alice = seed_user(&db, "alice@x.com");
        let post_id = seed_post(&db, &alice, "cat.png", &now_timestamp());

        let outcome = db
            .delete_post(&Uuid::new_v4().to_string(), &alice)
            .unwrap();
        assert_eq!(outcome, DeleteOutcome::NotFound);
        // no row was touched
        assert!(db.get_post(&post_id).unwrap().is_some());
    }

    #[test]
    fn owner_delete_removes_post() {
        let db = test_db();
        let alice = seed_user(&db, "alice@x.com");
        let post_id = seed_post(&db, &alice, "cat.png", &now_timestamp());

        let outcome = db.delete_post(&post_id, &alice).unwrap();
        assert_eq!(outcome, DeleteOutcome::Deleted);
        assert!(db.get_post(&post_id).unwrap().is_none());
        assert!(db.list_feed().unwrap().is_empty());
    }

    #[test]
    fn deleting_user_cascades_to_posts() {
        let db = test_db();
        let alice = seed_user(&db, "alice@x.com");
        let bob = seed_user(&db, "bob@x.com");
        seed_post(&db, &alice, "a.png", &now_timestamp());
        seed_post(&db, &alice, "b.png", &now_timestamp());
        let bobs = seed_post(&db, &bob, "c.png", &now_timestamp());

        let removed = db.delete_user(&alice).unwrap();
        assert_eq!(removed, 2);
        assert!(db.get_user_by_id(&alice).unwrap().is_none());

        // bob's account and post survive
        let feed = db.list_feed().unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].post.id, bobs);
    }

    #[test]
    fn created_at_is_immutable_across_reads() {
        let db = test_db();
        let alice = seed_user(&db, "alice@x.com");
        let post_id = seed_post(&db, &alice, "cat.png", &now_timestamp());

        let first = db.get_post(&post_id).unwrap().unwrap().created_at;
        let second = db.get_post(&post_id).unwrap().unwrap().created_at;
        assert_eq!(first, second);
    }
}
