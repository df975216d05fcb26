//! Persisted user-targeted notifications: written before the realtime
//! publish so a disconnected user still finds them on the next pull.

use rusqlite::Connection;
use uuid::Uuid;

use tackboard_types::models::{Notification, NotificationBody};

use crate::models::{NotificationRow, parse_uuid};
use crate::{Database, StoreResult};

/// Insert inside the caller's transaction and hand back the model for
/// publishing after commit.
pub(crate) fn push_notification(
    conn: &Connection,
    user_id: &str,
    body: &NotificationBody,
) -> StoreResult<Notification> {
    let id = Uuid::new_v4();
    conn.execute(
        "INSERT INTO notifications (id, user_id, body) VALUES (?1, ?2, ?3)",
        rusqlite::params![id.to_string(), user_id, serde_json::to_string(body)?],
    )?;

    Ok(Notification {
        id,
        user_id: parse_uuid(user_id, "user_id"),
        body: body.clone(),
        read: false,
        created_at: chrono::Utc::now(),
    })
}

impl Database {
    /// The user's notifications, newest first.
    pub fn list_notifications(&self, user: Uuid, unread_only: bool) -> StoreResult<Vec<Notification>> {
        self.with_conn(|conn| {
            let sql = if unread_only {
                "SELECT id, user_id, body, read, created_at FROM notifications
                 WHERE user_id = ?1 AND read = 0 ORDER BY rowid DESC"
            } else {
                "SELECT id, user_id, body, read, created_at FROM notifications
                 WHERE user_id = ?1 ORDER BY rowid DESC"
            };

            let mut stmt = conn.prepare(sql)?;
            let rows = stmt
                .query_map([user.to_string()], |row| {
                    Ok(NotificationRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        body: row.get(2)?,
                        read: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(rows
                .into_iter()
                .filter_map(NotificationRow::into_notification)
                .collect())
        })
    }

    pub fn mark_notifications_read(&self, user: Uuid) -> StoreResult<usize> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE notifications SET read = 1 WHERE user_id = ?1 AND read = 0",
                [user.to_string()],
            )?;
            Ok(updated)
        })
    }
}
