//! Identity rows. Credentials never live here — the external auth service
//! materializes users through `upsert_user` and owns everything else.

use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;

use crate::models::UserRow;
use crate::{Database, StoreError, StoreResult};

impl Database {
    /// Provisioning seam for the auth collaborator: create the identity or
    /// refresh its nickname.
    pub fn upsert_user(&self, id: Uuid, nickname: &str) -> StoreResult<()> {
        let nickname = nickname.trim();
        if nickname.is_empty() {
            return Err(StoreError::Validation("nickname is required".into()));
        }
        self.with_conn(|conn| {
            let taken: Option<String> = conn
                .query_row(
                    "SELECT id FROM users WHERE nickname = ?1",
                    [nickname],
                    |row| row.get(0),
                )
                .optional()?;
            if taken.is_some_and(|owner| owner != id.to_string()) {
                return Err(StoreError::Conflict("nickname already in use"));
            }

            conn.execute(
                "INSERT INTO users (id, nickname) VALUES (?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET nickname = excluded.nickname",
                rusqlite::params![id.to_string(), nickname],
            )?;
            Ok(())
        })
    }

}

pub(crate) fn query_user_by_nickname(
    conn: &Connection,
    nickname: &str,
) -> StoreResult<Option<UserRow>> {
    let row = conn
        .query_row(
            "SELECT id, nickname, created_at FROM users WHERE nickname = ?1",
            [nickname],
            |row| {
                Ok(UserRow {
                    id: row.get(0)?,
                    nickname: row.get(1)?,
                    created_at: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

pub(crate) fn nickname_of(conn: &Connection, user_id: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT nickname FROM users WHERE id = ?1",
        [user_id],
        |row| row.get(0),
    )
    .optional()
}

/// Nickname for history payloads; the auth layer guarantees the row exists,
/// but a missing one degrades to a placeholder rather than failing the
/// mutation.
pub(crate) fn nickname_or_unknown(conn: &Connection, user_id: &str) -> rusqlite::Result<String> {
    Ok(nickname_of(conn, user_id)?.unwrap_or_else(|| "unknown".to_string()))
}
