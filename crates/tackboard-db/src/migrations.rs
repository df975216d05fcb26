use rusqlite::Connection;
use tracing::info;

use crate::StoreResult;

pub fn run(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            nickname    TEXT NOT NULL UNIQUE,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS projects (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            deadline    TEXT,
            owner_id    TEXT NOT NULL REFERENCES users(id),
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS project_members (
            project_id  TEXT NOT NULL REFERENCES projects(id),
            user_id     TEXT NOT NULL REFERENCES users(id),
            PRIMARY KEY (project_id, user_id)
        );

        -- Per-user view ordering of projects. The legacy shared per-project
        -- order field is gone for good.
        CREATE TABLE IF NOT EXISTS project_order (
            user_id     TEXT NOT NULL REFERENCES users(id),
            project_id  TEXT NOT NULL REFERENCES projects(id),
            position    INTEGER NOT NULL,
            PRIMARY KEY (user_id, project_id)
        );

        CREATE TABLE IF NOT EXISTS invitations (
            user_id     TEXT NOT NULL REFERENCES users(id),
            project_id  TEXT NOT NULL REFERENCES projects(id),
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (user_id, project_id)
        );

        CREATE TABLE IF NOT EXISTS cards (
            id          TEXT PRIMARY KEY,
            project_id  TEXT NOT NULL REFERENCES projects(id),
            title       TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            status      TEXT NOT NULL DEFAULT 'todo',
            position    INTEGER NOT NULL,
            created_by  TEXT NOT NULL REFERENCES users(id),
            due_date    TEXT,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_cards_project
            ON cards(project_id, position);

        -- card_id carries no foreign key: deleting a card leaves its
        -- comments in place.
        CREATE TABLE IF NOT EXISTS comments (
            id          TEXT PRIMARY KEY,
            project_id  TEXT NOT NULL REFERENCES projects(id),
            card_id     TEXT,
            author_id   TEXT NOT NULL REFERENCES users(id),
            author_name TEXT NOT NULL,
            content     TEXT NOT NULL,
            attachment  TEXT,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_comments_project
            ON comments(project_id);

        -- Append-only; no foreign keys so entries about deleted cards keep
        -- their shape until the owning project goes away.
        CREATE TABLE IF NOT EXISTS history (
            id          TEXT PRIMARY KEY,
            project_id  TEXT NOT NULL,
            card_id     TEXT,
            user_id     TEXT NOT NULL,
            action      TEXT NOT NULL,
            details     TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_history_project
            ON history(project_id);

        CREATE TABLE IF NOT EXISTS chat_messages (
            id          TEXT PRIMARY KEY,
            project_id  TEXT NOT NULL,
            user_id     TEXT NOT NULL,
            nickname    TEXT NOT NULL,
            message     TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_chat_project
            ON chat_messages(project_id);

        CREATE TABLE IF NOT EXISTS notifications (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL,
            body        TEXT NOT NULL,
            read        INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_notifications_user
            ON notifications(user_id);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
