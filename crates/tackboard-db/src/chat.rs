//! Durable per-project chat. Unlike comments, messages have no edit or
//! delete path, and the author's nickname is frozen at write time.

use uuid::Uuid;

use tackboard_types::models::ChatMessage;

use crate::models::ChatMessageRow;
use crate::projects::require_member;
use crate::{Database, StoreError, StoreResult};

impl Database {
    pub fn post_chat_message(
        &self,
        project_id: Uuid,
        user: Uuid,
        nickname: &str,
        message: &str,
    ) -> StoreResult<ChatMessage> {
        if message.trim().is_empty() {
            return Err(StoreError::Validation("message is required".into()));
        }

        let pid = project_id.to_string();
        let uid = user.to_string();

        self.with_conn(|conn| {
            require_member(conn, &pid, &uid)?;

            conn.execute(
                "INSERT INTO chat_messages (id, project_id, user_id, nickname, message)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![Uuid::new_v4().to_string(), pid, uid, nickname, message],
            )?;

            Ok(ChatMessage {
                project_id,
                user_id: user,
                nickname: nickname.to_string(),
                message: message.to_string(),
                timestamp: chrono::Utc::now(),
            })
        })
    }

    /// Last `limit` messages, oldest first — the shape a room replay wants.
    /// Callers gate membership before asking.
    pub fn recent_chat_messages(
        &self,
        project_id: Uuid,
        limit: u32,
    ) -> StoreResult<Vec<ChatMessage>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT project_id, user_id, nickname, message, created_at
                 FROM chat_messages
                 WHERE project_id = ?1
                 ORDER BY rowid DESC
                 LIMIT ?2",
            )?;
            let mut rows = stmt
                .query_map(
                    rusqlite::params![project_id.to_string(), limit],
                    |row| {
                        Ok(ChatMessageRow {
                            project_id: row.get(0)?,
                            user_id: row.get(1)?,
                            nickname: row.get(2)?,
                            message: row.get(3)?,
                            created_at: row.get(4)?,
                        })
                    },
                )?
                .collect::<Result<Vec<_>, _>>()?;

            rows.reverse();
            Ok(rows.into_iter().map(ChatMessageRow::into_message).collect())
        })
    }
}
