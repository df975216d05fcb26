//! Comments are project-scoped, optionally pinned to a card. Editing and
//! deleting are author-only — a stricter gate than project membership.

use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;

use tackboard_types::history::HistoryDetails;
use tackboard_types::models::Comment;

use crate::cards::query_card;
use crate::models::CommentRow;
use crate::projects::require_member;
use crate::users::nickname_or_unknown;
use crate::{Database, StoreError, StoreResult, history};

/// Outcome of a comment edit; `removed_attachment` is a blob reference the
/// caller should hand to the storage collaborator for cleanup.
#[derive(Debug)]
pub struct CommentEdit {
    pub project_id: Uuid,
    pub card_id: Option<Uuid>,
    pub new_content: String,
    pub removed_attachment: Option<String>,
}

#[derive(Debug)]
pub struct DeletedComment {
    pub project_id: Uuid,
    pub card_id: Option<Uuid>,
    pub attachment: Option<String>,
}

impl Database {
    pub fn add_comment(
        &self,
        project_id: Uuid,
        card_id: Option<Uuid>,
        author: Uuid,
        content: &str,
        attachment: Option<&str>,
    ) -> StoreResult<Comment> {
        let content = content.trim();
        if content.is_empty() {
            return Err(StoreError::Validation("comment content is required".into()));
        }

        let id = Uuid::new_v4();
        let pid = project_id.to_string();
        let uid = author.to_string();
        let cid = card_id.map(|c| c.to_string());

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            require_member(&tx, &pid, &uid)?;

            let card_title = match &cid {
                Some(cid) => Some(
                    query_card(&tx, &pid, cid)?
                        .ok_or(StoreError::NotFound("card"))?
                        .title,
                ),
                None => None,
            };

            // Author name is snapshotted at write time; history entries
            // resolve theirs at read time instead.
            let author_name = nickname_or_unknown(&tx, &uid)?;

            tx.execute(
                "INSERT INTO comments (id, project_id, card_id, author_id, author_name, content, attachment)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![id.to_string(), pid, cid, uid, author_name, content, attachment],
            )?;

            history::record(
                &tx,
                &pid,
                cid.as_deref(),
                &uid,
                &HistoryDetails::CommentCreate {
                    content: content.to_string(),
                    card_title,
                },
            );

            tx.commit()?;

            Ok(Comment {
                id,
                project_id,
                card_id,
                author_id: author,
                author_name,
                content: content.to_string(),
                attachment: attachment.map(str::to_string),
                created_at: chrono::Utc::now(),
            })
        })
    }

    /// Author-only. `attachment` semantics: `None` keeps the current
    /// attachment, `Some(None)` removes it, `Some(Some(_))` replaces it.
    pub fn edit_comment(
        &self,
        comment_id: Uuid,
        requester: Uuid,
        content: &str,
        attachment: Option<Option<&str>>,
    ) -> StoreResult<CommentEdit> {
        let content = content.trim();
        if content.is_empty() {
            return Err(StoreError::Validation("comment content is required".into()));
        }

        let cid = comment_id.to_string();
        let uid = requester.to_string();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let comment = query_comment(&tx, &cid)?.ok_or(StoreError::NotFound("comment"))?;
            if comment.author_id != uid {
                return Err(StoreError::Permission("comment authorship"));
            }

            let new_attachment = match attachment {
                Some(new) => new.map(str::to_string),
                None => comment.attachment.clone(),
            };
            let removed_attachment = match (&comment.attachment, &new_attachment) {
                (Some(old), new) if new.as_deref() != Some(old.as_str()) => Some(old.clone()),
                _ => None,
            };

            tx.execute(
                "UPDATE comments SET content = ?1, attachment = ?2 WHERE id = ?3",
                rusqlite::params![content, new_attachment, cid],
            )?;

            let card_title = card_title_of(&tx, &comment)?;
            history::record(
                &tx,
                &comment.project_id,
                comment.card_id.as_deref(),
                &uid,
                &HistoryDetails::CommentUpdate {
                    old_content: comment.content.clone(),
                    new_content: content.to_string(),
                    card_title,
                },
            );

            tx.commit()?;

            Ok(CommentEdit {
                project_id: comment.project_id.parse().unwrap_or_default(),
                card_id: comment
                    .card_id
                    .as_deref()
                    .map(|id| id.parse().unwrap_or_default()),
                new_content: content.to_string(),
                removed_attachment,
            })
        })
    }

    pub fn delete_comment(
        &self,
        comment_id: Uuid,
        requester: Uuid,
    ) -> StoreResult<DeletedComment> {
        let cid = comment_id.to_string();
        let uid = requester.to_string();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let comment = query_comment(&tx, &cid)?.ok_or(StoreError::NotFound("comment"))?;
            if comment.author_id != uid {
                return Err(StoreError::Permission("comment authorship"));
            }

            let card_title = card_title_of(&tx, &comment)?;
            history::record(
                &tx,
                &comment.project_id,
                comment.card_id.as_deref(),
                &uid,
                &HistoryDetails::CommentDelete {
                    content: comment.content.clone(),
                    card_title,
                },
            );

            tx.execute("DELETE FROM comments WHERE id = ?1", [&cid])?;

            tx.commit()?;

            Ok(DeletedComment {
                project_id: comment.project_id.parse().unwrap_or_default(),
                card_id: comment
                    .card_id
                    .as_deref()
                    .map(|id| id.parse().unwrap_or_default()),
                attachment: comment.attachment,
            })
        })
    }

    /// Comments for a project, oldest first; optionally narrowed to a card.
    pub fn list_comments(
        &self,
        project_id: Uuid,
        requester: Uuid,
        card_id: Option<Uuid>,
    ) -> StoreResult<Vec<Comment>> {
        self.with_conn(|conn| {
            let pid = project_id.to_string();
            require_member(conn, &pid, &requester.to_string())?;

            let rows = match card_id {
                Some(card) => {
                    let mut stmt = conn.prepare(&format!(
                        "{COMMENT_SELECT} WHERE project_id = ?1 AND card_id = ?2 ORDER BY rowid"
                    ))?;
                    let rows = stmt
                        .query_map([pid, card.to_string()], map_comment_row)?
                        .collect::<Result<Vec<_>, _>>()?;
                    rows
                }
                None => {
                    let mut stmt = conn.prepare(&format!(
                        "{COMMENT_SELECT} WHERE project_id = ?1 ORDER BY rowid"
                    ))?;
                    let rows = stmt
                        .query_map([pid], map_comment_row)?
                        .collect::<Result<Vec<_>, _>>()?;
                    rows
                }
            };

            Ok(rows.into_iter().map(CommentRow::into_comment).collect())
        })
    }
}

const COMMENT_SELECT: &str = "SELECT id, project_id, card_id, author_id, author_name, content, \
                              attachment, created_at FROM comments";

fn map_comment_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        id: row.get(0)?,
        project_id: row.get(1)?,
        card_id: row.get(2)?,
        author_id: row.get(3)?,
        author_name: row.get(4)?,
        content: row.get(5)?,
        attachment: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn query_comment(conn: &Connection, id: &str) -> StoreResult<Option<CommentRow>> {
    let row = conn
        .query_row(
            &format!("{COMMENT_SELECT} WHERE id = ?1"),
            [id],
            map_comment_row,
        )
        .optional()?;
    Ok(row)
}

fn card_title_of(conn: &Connection, comment: &CommentRow) -> StoreResult<Option<String>> {
    match comment.card_id.as_deref() {
        Some(card_id) => Ok(query_card(conn, &comment.project_id, card_id)?.map(|c| c.title)),
        None => Ok(None),
    }
}
