use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;

use tackboard_types::history::{CardChanges, FieldChange, HistoryDetails};
use tackboard_types::models::{Card, CardStatus};

use crate::models::{CardRow, parse_date, parse_uuid};
use crate::ordering::CARD_POSITIONS;
use crate::projects::{format_date, require_member};
use crate::{Database, StoreError, StoreResult, history};

impl Database {
    pub fn create_card(
        &self,
        project_id: Uuid,
        requester: Uuid,
        title: &str,
        description: &str,
        status: CardStatus,
    ) -> StoreResult<Card> {
        let title = title.trim();
        if title.is_empty() {
            return Err(StoreError::Validation("card title is required".into()));
        }

        let id = Uuid::new_v4();
        let pid = project_id.to_string();
        let uid = requester.to_string();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let project = require_member(&tx, &pid, &uid)?;

            let position = CARD_POSITIONS.next_position(&tx, &pid)?;
            tx.execute(
                "INSERT INTO cards (id, project_id, title, description, status, position, created_by)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    id.to_string(),
                    pid,
                    title,
                    description,
                    status.as_str(),
                    position,
                    uid,
                ],
            )?;

            history::record(
                &tx,
                &pid,
                Some(&id.to_string()),
                &uid,
                &HistoryDetails::CardCreate {
                    title: title.to_string(),
                    status: status.as_str().to_string(),
                    project_name: project.name,
                },
            );

            tx.commit()?;

            Ok(Card {
                id,
                project_id,
                title: title.to_string(),
                description: description.to_string(),
                status,
                position,
                created_by: requester,
                due_date: None,
                created_at: chrono::Utc::now(),
            })
        })
    }

    /// Partial edit. Only fields that actually changed are recorded; a
    /// status change gets its own dedicated audit entry on top of the
    /// general one.
    pub fn update_card(
        &self,
        project_id: Uuid,
        card_id: Uuid,
        requester: Uuid,
        title: Option<&str>,
        description: Option<&str>,
        status: Option<CardStatus>,
    ) -> StoreResult<CardChanges> {
        let pid = project_id.to_string();
        let cid = card_id.to_string();
        let uid = requester.to_string();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            require_member(&tx, &pid, &uid)?;
            let card = query_card(&tx, &pid, &cid)?.ok_or(StoreError::NotFound("card"))?;

            let new_title = match title {
                Some(t) if t.trim().is_empty() => {
                    return Err(StoreError::Validation("card title is required".into()));
                }
                Some(t) => t.trim().to_string(),
                None => card.title.clone(),
            };
            let new_description = description
                .map(str::to_string)
                .unwrap_or_else(|| card.description.clone());
            let new_status = status
                .map(|s| s.as_str().to_string())
                .unwrap_or_else(|| card.status.clone());

            let mut changes = CardChanges::default();
            if new_title != card.title {
                changes.title = Some(FieldChange {
                    from: card.title.clone(),
                    to: new_title.clone(),
                });
            }
            if new_description != card.description {
                changes.description = Some(FieldChange {
                    from: card.description.clone(),
                    to: new_description.clone(),
                });
            }
            if new_status != card.status {
                changes.status = Some(FieldChange {
                    from: card.status.clone(),
                    to: new_status.clone(),
                });
                history::record(
                    &tx,
                    &pid,
                    Some(&cid),
                    &uid,
                    &HistoryDetails::CardStatusUpdate {
                        from_status: card.status.clone(),
                        to_status: new_status.clone(),
                        title: card.title.clone(),
                    },
                );
            }

            if changes.is_empty() {
                tx.commit()?;
                return Ok(changes);
            }

            tx.execute(
                "UPDATE cards SET title = ?1, description = ?2, status = ?3 WHERE id = ?4",
                rusqlite::params![new_title, new_description, new_status, cid],
            )?;

            history::record(
                &tx,
                &pid,
                Some(&cid),
                &uid,
                &HistoryDetails::CardUpdate {
                    changes: changes.clone(),
                },
            );

            tx.commit()?;
            Ok(changes)
        })
    }

    pub fn update_card_status(
        &self,
        project_id: Uuid,
        card_id: Uuid,
        requester: Uuid,
        status: CardStatus,
    ) -> StoreResult<Option<FieldChange<String>>> {
        let pid = project_id.to_string();
        let cid = card_id.to_string();
        let uid = requester.to_string();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            require_member(&tx, &pid, &uid)?;
            let card = query_card(&tx, &pid, &cid)?.ok_or(StoreError::NotFound("card"))?;

            if card.status == status.as_str() {
                return Ok(None);
            }

            tx.execute(
                "UPDATE cards SET status = ?1 WHERE id = ?2",
                [status.as_str(), cid.as_str()],
            )?;

            history::record(
                &tx,
                &pid,
                Some(&cid),
                &uid,
                &HistoryDetails::CardStatusUpdate {
                    from_status: card.status.clone(),
                    to_status: status.as_str().to_string(),
                    title: card.title,
                },
            );

            tx.commit()?;
            Ok(Some(FieldChange {
                from: card.status,
                to: status.as_str().to_string(),
            }))
        })
    }

    /// Returns false when the date was already set to the same value (no
    /// write, no audit entry).
    pub fn set_due_date(
        &self,
        project_id: Uuid,
        card_id: Uuid,
        requester: Uuid,
        due_date: NaiveDate,
    ) -> StoreResult<bool> {
        let pid = project_id.to_string();
        let cid = card_id.to_string();
        let uid = requester.to_string();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            require_member(&tx, &pid, &uid)?;
            let card = query_card(&tx, &pid, &cid)?.ok_or(StoreError::NotFound("card"))?;

            if card.due_date.as_deref().and_then(parse_date) == Some(due_date) {
                return Ok(false);
            }

            tx.execute(
                "UPDATE cards SET due_date = ?1 WHERE id = ?2",
                [format_date(due_date).as_str(), cid.as_str()],
            )?;

            history::record(
                &tx,
                &pid,
                Some(&cid),
                &uid,
                &HistoryDetails::CardDueDateSet {
                    title: card.title,
                    due_date,
                },
            );

            tx.commit()?;
            Ok(true)
        })
    }

    /// Returns the previous date when a write happened, None when the new
    /// date matched the old one.
    pub fn update_due_date(
        &self,
        project_id: Uuid,
        card_id: Uuid,
        requester: Uuid,
        new_due_date: NaiveDate,
    ) -> StoreResult<Option<Option<NaiveDate>>> {
        let pid = project_id.to_string();
        let cid = card_id.to_string();
        let uid = requester.to_string();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            require_member(&tx, &pid, &uid)?;
            let card = query_card(&tx, &pid, &cid)?.ok_or(StoreError::NotFound("card"))?;

            let old = card.due_date.as_deref().and_then(parse_date);
            if old == Some(new_due_date) {
                return Ok(None);
            }

            tx.execute(
                "UPDATE cards SET due_date = ?1 WHERE id = ?2",
                [format_date(new_due_date).as_str(), cid.as_str()],
            )?;

            history::record(
                &tx,
                &pid,
                Some(&cid),
                &uid,
                &HistoryDetails::CardDueDateUpdate {
                    title: card.title,
                    old_due_date: old,
                    new_due_date,
                },
            );

            tx.commit()?;
            Ok(Some(old))
        })
    }

    /// Reparent a card and renumber the destination in one transaction.
    /// The mover must be a member of both projects; the source project's
    /// remaining cards keep their positions (gaps there are harmless and
    /// healed by the next reorder).
    pub fn move_card(
        &self,
        card_id: Uuid,
        requester: Uuid,
        from_project: Uuid,
        to_project: Uuid,
        order: &[Uuid],
    ) -> StoreResult<()> {
        if !order.contains(&card_id) {
            return Err(StoreError::Validation(
                "order must include the moved card".into(),
            ));
        }

        let cid = card_id.to_string();
        let from_pid = from_project.to_string();
        let to_pid = to_project.to_string();
        let uid = requester.to_string();
        let ids: Vec<String> = order.iter().map(Uuid::to_string).collect();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let source = require_member(&tx, &from_pid, &uid)?;
            let dest = require_member(&tx, &to_pid, &uid)?;
            let card = query_card(&tx, &from_pid, &cid)?.ok_or(StoreError::NotFound("card"))?;

            tx.execute(
                "UPDATE cards SET project_id = ?1 WHERE id = ?2",
                [&to_pid, &cid],
            )?;
            CARD_POSITIONS.reorder(&tx, &to_pid, &ids)?;

            if from_pid != to_pid {
                history::record(
                    &tx,
                    &from_pid,
                    Some(&cid),
                    &uid,
                    &HistoryDetails::CardMoveOut {
                        from_project: source.name.clone(),
                        to_project: dest.name.clone(),
                        title: card.title.clone(),
                    },
                );
            }
            history::record(
                &tx,
                &to_pid,
                Some(&cid),
                &uid,
                &HistoryDetails::CardMoveIn {
                    from_project: source.name,
                    to_project: dest.name,
                    title: card.title,
                },
            );

            tx.commit()?;
            Ok(())
        })
    }

    /// Rewrite the project's card order from an explicit full list. Every
    /// id must belong to the project or nothing is written; one audit entry
    /// per card whose position actually changed.
    pub fn reorder_cards(
        &self,
        project_id: Uuid,
        requester: Uuid,
        order: &[Uuid],
    ) -> StoreResult<()> {
        let pid = project_id.to_string();
        let uid = requester.to_string();
        let ids: Vec<String> = order.iter().map(Uuid::to_string).collect();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            require_member(&tx, &pid, &uid)?;

            let changes = CARD_POSITIONS.reorder(&tx, &pid, &ids)?;
            for change in &changes {
                let title: String = tx.query_row(
                    "SELECT title FROM cards WHERE id = ?1",
                    [&change.id],
                    |row| row.get(0),
                )?;
                history::record(
                    &tx,
                    &pid,
                    Some(&change.id),
                    &uid,
                    &HistoryDetails::CardReorder {
                        title,
                        new_order: change.to,
                    },
                );
            }

            tx.commit()?;
            Ok(())
        })
    }

    pub fn delete_card(&self, project_id: Uuid, card_id: Uuid, requester: Uuid) -> StoreResult<()> {
        let pid = project_id.to_string();
        let cid = card_id.to_string();
        let uid = requester.to_string();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            require_member(&tx, &pid, &uid)?;
            let card = query_card(&tx, &pid, &cid)?.ok_or(StoreError::NotFound("card"))?;

            // Title is captured before the row disappears; replay joins
            // would otherwise come up empty.
            history::record(
                &tx,
                &pid,
                Some(&cid),
                &uid,
                &HistoryDetails::CardDelete { title: card.title },
            );

            tx.execute("DELETE FROM cards WHERE id = ?1", [&cid])?;

            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_card(&self, project_id: Uuid, card_id: Uuid, requester: Uuid) -> StoreResult<Card> {
        self.with_conn(|conn| {
            let pid = project_id.to_string();
            require_member(conn, &pid, &requester.to_string())?;
            let card = query_card(conn, &pid, &card_id.to_string())?
                .ok_or(StoreError::NotFound("card"))?;
            Ok(card.into_card())
        })
    }

    /// Cards of one project in board order. Ties in position are broken by
    /// id so the listing is stable even mid-heal.
    pub fn list_cards(&self, project_id: Uuid, requester: Uuid) -> StoreResult<Vec<Card>> {
        self.with_conn(|conn| {
            let pid = project_id.to_string();
            require_member(conn, &pid, &requester.to_string())?;

            let mut stmt = conn.prepare(&format!(
                "{CARD_SELECT} WHERE project_id = ?1 ORDER BY position, id"
            ))?;
            let rows = stmt
                .query_map([&pid], map_card_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows.into_iter().map(CardRow::into_card).collect())
        })
    }

    /// Every card across the requester's projects.
    pub fn list_all_cards(&self, requester: Uuid) -> StoreResult<Vec<Card>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{CARD_SELECT}
                 WHERE project_id IN
                     (SELECT project_id FROM project_members WHERE user_id = ?1)
                 ORDER BY project_id, position, id"
            ))?;
            let rows = stmt
                .query_map([requester.to_string()], map_card_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows.into_iter().map(CardRow::into_card).collect())
        })
    }

    pub fn card_counts(&self, requester: Uuid) -> StoreResult<Vec<(Uuid, i64)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.project_id, COUNT(c.id)
                 FROM project_members m
                 LEFT JOIN cards c ON c.project_id = m.project_id
                 WHERE m.user_id = ?1
                 GROUP BY m.project_id",
            )?;
            let counts = stmt
                .query_map([requester.to_string()], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(counts
                .into_iter()
                .map(|(id, n)| (parse_uuid(&id, "project id"), n))
                .collect())
        })
    }
}

const CARD_SELECT: &str = "SELECT id, project_id, title, description, status, position, \
                           created_by, due_date, created_at FROM cards";

fn map_card_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CardRow> {
    Ok(CardRow {
        id: row.get(0)?,
        project_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        status: row.get(4)?,
        position: row.get(5)?,
        created_by: row.get(6)?,
        due_date: row.get(7)?,
        created_at: row.get(8)?,
    })
}

pub(crate) fn query_card(
    conn: &Connection,
    project_id: &str,
    card_id: &str,
) -> StoreResult<Option<CardRow>> {
    let row = conn
        .query_row(
            &format!("{CARD_SELECT} WHERE id = ?1 AND project_id = ?2"),
            [card_id, project_id],
            map_card_row,
        )
        .optional()?;
    Ok(row)
}
