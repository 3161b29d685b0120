use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id           TEXT PRIMARY KEY,
            email        TEXT NOT NULL UNIQUE,
            password     TEXT NOT NULL,
            is_active    INTEGER NOT NULL DEFAULT 1,
            is_verified  INTEGER NOT NULL DEFAULT 0,
            created_at   TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS posts (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id),
            caption     TEXT,
            url         TEXT NOT NULL,
            file_type   TEXT NOT NULL,
            file_name   TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_posts_created
            ON posts(created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
