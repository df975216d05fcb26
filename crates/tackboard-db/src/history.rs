//! Append-only audit trail. Writes are best-effort: a failed history insert
//! is logged and swallowed so it can never roll back the user-visible
//! mutation it annotates. Reads are member-gated.

use rusqlite::Connection;
use tracing::warn;
use uuid::Uuid;

use tackboard_types::history::{HistoryDetails, HistoryEntry};

use crate::models::{HistoryRow, parse_timestamp, parse_uuid};
use crate::projects::require_member;
use crate::{Database, StoreResult};

/// Record one mutating action. Must be called inside the mutation's
/// transaction so the entry lands with the commit; its own failure is
/// swallowed by the asymmetric failure policy.
pub(crate) fn record(
    conn: &Connection,
    project_id: &str,
    card_id: Option<&str>,
    user_id: &str,
    details: &HistoryDetails,
) {
    let payload = match serde_json::to_string(details) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Failed to encode history details for {}: {}", project_id, e);
            return;
        }
    };

    let result = conn.execute(
        "INSERT INTO history (id, project_id, card_id, user_id, action, details)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            Uuid::new_v4().to_string(),
            project_id,
            card_id,
            user_id,
            details.action(),
            payload,
        ],
    );
    if let Err(e) = result {
        warn!(
            "Failed to record history ({}) for project {}: {}",
            details.action(),
            project_id,
            e
        );
    }
}

impl Database {
    /// Project history, newest first. Nicknames are resolved at query time,
    /// so renaming a user changes how old entries display.
    pub fn project_history(
        &self,
        project_id: Uuid,
        requester: Uuid,
    ) -> StoreResult<Vec<HistoryEntry>> {
        self.with_conn(|conn| {
            let pid = project_id.to_string();
            require_member(conn, &pid, &requester.to_string())?;

            let mut stmt = conn.prepare(
                "SELECT h.id, h.project_id, h.card_id, h.user_id, u.nickname,
                        h.action, h.details, h.created_at
                 FROM history h
                 LEFT JOIN users u ON h.user_id = u.id
                 WHERE h.project_id = ?1
                 ORDER BY h.rowid DESC",
            )?;

            let rows = stmt
                .query_map([&pid], |row| {
                    Ok(HistoryRow {
                        id: row.get(0)?,
                        project_id: row.get(1)?,
                        card_id: row.get(2)?,
                        user_id: row.get(3)?,
                        nickname: row.get(4)?,
                        action: row.get(5)?,
                        details: row.get(6)?,
                        created_at: row.get(7)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            let entries = rows
                .into_iter()
                .filter_map(|row| {
                    let details: HistoryDetails = match serde_json::from_str(&row.details) {
                        Ok(details) => details,
                        Err(e) => {
                            warn!("Corrupt history details '{}': {}", row.id, e);
                            return None;
                        }
                    };
                    Some(HistoryEntry {
                        id: parse_uuid(&row.id, "history id"),
                        project_id: parse_uuid(&row.project_id, "project_id"),
                        card_id: row.card_id.map(|id| parse_uuid(&id, "card_id")),
                        user_id: parse_uuid(&row.user_id, "user_id"),
                        user: row.nickname.unwrap_or_else(|| "unknown".to_string()),
                        details,
                        created_at: parse_timestamp(&row.created_at),
                    })
                })
                .collect();

            Ok(entries)
        })
    }
}
