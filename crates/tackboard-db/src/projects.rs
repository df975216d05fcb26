use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;

use tackboard_types::api::InvitationItem;
use tackboard_types::history::{FieldChange, HistoryDetails, ProjectChanges};
use tackboard_types::models::{Notification, NotificationBody, Project};

use crate::models::{ProjectRow, parse_date, parse_timestamp, parse_uuid};
use crate::notifications::push_notification;
use crate::ordering::PROJECT_POSITIONS;
use crate::users::{nickname_or_unknown, query_user_by_nickname};
use crate::{Database, StoreError, StoreResult, history};

/// What a DELETE on a project actually did: owners destroy the project,
/// other members merely leave it.
#[derive(Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Left,
}

impl Database {
    pub fn create_project(
        &self,
        owner: Uuid,
        name: &str,
        description: &str,
        deadline: Option<NaiveDate>,
    ) -> StoreResult<Project> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::Validation("project name is required".into()));
        }

        let id = Uuid::new_v4();
        let owner_id = owner.to_string();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let nickname = nickname_or_unknown(&tx, &owner_id)?;

            tx.execute(
                "INSERT INTO projects (id, name, description, deadline, owner_id)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    id.to_string(),
                    name,
                    description,
                    deadline.map(format_date),
                    owner_id,
                ],
            )?;
            tx.execute(
                "INSERT INTO project_members (project_id, user_id) VALUES (?1, ?2)",
                [&id.to_string(), &owner_id],
            )?;

            let position = PROJECT_POSITIONS.next_position(&tx, &owner_id)?;
            tx.execute(
                "INSERT INTO project_order (user_id, project_id, position) VALUES (?1, ?2, ?3)",
                rusqlite::params![owner_id, id.to_string(), position],
            )?;

            history::record(
                &tx,
                &id.to_string(),
                None,
                &owner_id,
                &HistoryDetails::Create {
                    project_name: name.to_string(),
                    nickname,
                },
            );

            tx.commit()?;

            Ok(Project {
                id,
                name: name.to_string(),
                description: description.to_string(),
                deadline,
                owner_id: owner,
                members: vec![owner],
                created_at: chrono::Utc::now(),
            })
        })
    }

    /// Owner: cascade-delete the project and everything it owns, including
    /// every member's ordering slot. Member: leave the project. Others:
    /// permission error, untouched state.
    pub fn delete_or_leave_project(
        &self,
        project_id: Uuid,
        requester: Uuid,
    ) -> StoreResult<DeleteOutcome> {
        let pid = project_id.to_string();
        let uid = requester.to_string();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let project = query_project(&tx, &pid)?.ok_or(StoreError::NotFound("project"))?;

            if project.owner_id == uid {
                tx.execute("DELETE FROM comments WHERE project_id = ?1", [&pid])?;
                tx.execute("DELETE FROM cards WHERE project_id = ?1", [&pid])?;
                tx.execute("DELETE FROM history WHERE project_id = ?1", [&pid])?;
                tx.execute("DELETE FROM chat_messages WHERE project_id = ?1", [&pid])?;
                tx.execute("DELETE FROM invitations WHERE project_id = ?1", [&pid])?;
                tx.execute("DELETE FROM project_order WHERE project_id = ?1", [&pid])?;
                tx.execute("DELETE FROM project_members WHERE project_id = ?1", [&pid])?;
                tx.execute("DELETE FROM projects WHERE id = ?1", [&pid])?;
                tx.commit()?;
                return Ok(DeleteOutcome::Deleted);
            }

            if !is_member(&tx, &pid, &uid)? {
                return Err(StoreError::Permission("project membership"));
            }

            tx.execute(
                "DELETE FROM project_members WHERE project_id = ?1 AND user_id = ?2",
                [&pid, &uid],
            )?;
            tx.execute(
                "DELETE FROM project_order WHERE project_id = ?1 AND user_id = ?2",
                [&pid, &uid],
            )?;

            let nickname = nickname_or_unknown(&tx, &uid)?;
            history::record(
                &tx,
                &pid,
                None,
                &uid,
                &HistoryDetails::Leave {
                    project_name: project.name,
                    nickname,
                },
            );

            tx.commit()?;
            Ok(DeleteOutcome::Left)
        })
    }

    /// Partial update; only fields that actually changed are written and
    /// recorded.
    pub fn edit_project(
        &self,
        project_id: Uuid,
        requester: Uuid,
        name: Option<&str>,
        description: Option<&str>,
        deadline: Option<Option<NaiveDate>>,
    ) -> StoreResult<ProjectChanges> {
        let pid = project_id.to_string();
        let uid = requester.to_string();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let project = require_member(&tx, &pid, &uid)?;

            let mut changes = ProjectChanges::default();

            if let Some(name) = name {
                let name = name.trim();
                if name.is_empty() {
                    return Err(StoreError::Validation("project name is required".into()));
                }
                if name != project.name {
                    changes.name = Some(FieldChange {
                        from: project.name.clone(),
                        to: name.to_string(),
                    });
                    tx.execute(
                        "UPDATE projects SET name = ?1 WHERE id = ?2",
                        [name, pid.as_str()],
                    )?;
                }
            }

            if let Some(description) = description {
                if description != project.description {
                    changes.description = Some(FieldChange {
                        from: project.description.clone(),
                        to: description.to_string(),
                    });
                    tx.execute(
                        "UPDATE projects SET description = ?1 WHERE id = ?2",
                        [description, pid.as_str()],
                    )?;
                }
            }

            if let Some(deadline) = deadline {
                let old = project.deadline.as_deref().and_then(parse_date);
                if deadline != old {
                    changes.deadline = Some(FieldChange {
                        from: old,
                        to: deadline,
                    });
                    tx.execute(
                        "UPDATE projects SET deadline = ?1 WHERE id = ?2",
                        rusqlite::params![deadline.map(format_date), pid],
                    )?;
                }
            }

            if !changes.is_empty() {
                history::record(
                    &tx,
                    &pid,
                    None,
                    &uid,
                    &HistoryDetails::ProjectUpdate {
                        changes: changes.clone(),
                    },
                );
            }

            tx.commit()?;
            Ok(changes)
        })
    }

    /// Invitation lands on the invitee's user record; membership is only
    /// granted when they accept. The returned notification has already been
    /// persisted inside the same transaction.
    pub fn invite_member(
        &self,
        project_id: Uuid,
        inviter: Uuid,
        invitee_nickname: &str,
    ) -> StoreResult<Notification> {
        let pid = project_id.to_string();
        let inviter_id = inviter.to_string();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let project = require_member(&tx, &pid, &inviter_id)?;

            let invitee = query_user_by_nickname(&tx, invitee_nickname)?
                .ok_or(StoreError::NotFound("user"))?;

            if is_member(&tx, &pid, &invitee.id)? {
                return Err(StoreError::Conflict("already a project member"));
            }

            let invited: Option<i64> = tx
                .query_row(
                    "SELECT 1 FROM invitations WHERE user_id = ?1 AND project_id = ?2",
                    [&invitee.id, &pid],
                    |row| row.get(0),
                )
                .optional()?;
            if invited.is_some() {
                return Err(StoreError::Conflict("already invited"));
            }

            tx.execute(
                "INSERT INTO invitations (user_id, project_id) VALUES (?1, ?2)",
                [&invitee.id, &pid],
            )?;

            let inviter_nickname = nickname_or_unknown(&tx, &inviter_id)?;
            let notification = push_notification(
                &tx,
                &invitee.id,
                &NotificationBody::ProjectInvite {
                    project_id,
                    project_name: project.name.clone(),
                    inviter_id: inviter,
                    inviter_nickname: inviter_nickname.clone(),
                },
            )?;

            history::record(
                &tx,
                &pid,
                None,
                &inviter_id,
                &HistoryDetails::Invite {
                    project_name: project.name,
                    nickname: inviter_nickname,
                    invitee: invitee.nickname,
                },
            );

            tx.commit()?;
            Ok(notification)
        })
    }

    /// Always consumes the invitation; accepting additionally completes
    /// membership. Repeated accepts are a no-op.
    pub fn respond_invitation(
        &self,
        project_id: Uuid,
        user: Uuid,
        accept: bool,
    ) -> StoreResult<()> {
        let pid = project_id.to_string();
        let uid = user.to_string();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let project = query_project(&tx, &pid)?.ok_or(StoreError::NotFound("project"))?;

            tx.execute(
                "DELETE FROM invitations WHERE user_id = ?1 AND project_id = ?2",
                [&uid, &pid],
            )?;

            if accept && !is_member(&tx, &pid, &uid)? {
                tx.execute(
                    "INSERT INTO project_members (project_id, user_id) VALUES (?1, ?2)",
                    [&pid, &uid],
                )?;
                let position = PROJECT_POSITIONS.next_position(&tx, &uid)?;
                tx.execute(
                    "INSERT INTO project_order (user_id, project_id, position) VALUES (?1, ?2, ?3)",
                    rusqlite::params![uid, pid, position],
                )?;

                let nickname = nickname_or_unknown(&tx, &uid)?;
                history::record(
                    &tx,
                    &pid,
                    None,
                    &uid,
                    &HistoryDetails::Join {
                        project_name: project.name,
                        nickname,
                    },
                );
            }

            tx.commit()?;
            Ok(())
        })
    }

    /// Rewrites only this user's view order; other members are unaffected.
    pub fn reorder_projects(&self, user: Uuid, order: &[Uuid]) -> StoreResult<()> {
        let uid = user.to_string();
        let ids: Vec<String> = order.iter().map(Uuid::to_string).collect();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            PROJECT_POSITIONS.reorder(&tx, &uid, &ids)?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_project(&self, project_id: Uuid, requester: Uuid) -> StoreResult<Project> {
        self.with_conn(|conn| {
            let row = require_member(conn, &project_id.to_string(), &requester.to_string())?;
            project_from_row(conn, row)
        })
    }

    /// The requester's projects in their personal view order.
    pub fn list_projects(&self, requester: Uuid) -> StoreResult<Vec<Project>> {
        self.with_conn(|conn| {
            let uid = requester.to_string();
            let mut stmt = conn.prepare(
                "SELECT p.id, p.name, p.description, p.deadline, p.owner_id, p.created_at
                 FROM projects p
                 JOIN project_order o ON o.project_id = p.id
                 WHERE o.user_id = ?1
                 ORDER BY o.position, p.id",
            )?;
            let rows = stmt
                .query_map([&uid], map_project_row)?
                .collect::<Result<Vec<_>, _>>()?;

            rows.into_iter()
                .map(|row| project_from_row(conn, row))
                .collect()
        })
    }

    pub fn invitations_for(&self, user: Uuid) -> StoreResult<Vec<InvitationItem>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT p.id, p.name
                 FROM invitations i
                 JOIN projects p ON p.id = i.project_id
                 WHERE i.user_id = ?1
                 ORDER BY i.rowid",
            )?;
            let items = stmt
                .query_map([user.to_string()], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(items
                .into_iter()
                .map(|(id, name)| InvitationItem {
                    project_id: parse_uuid(&id, "project id"),
                    name,
                })
                .collect())
        })
    }

    pub fn is_project_member(&self, project_id: Uuid, user: Uuid) -> StoreResult<bool> {
        self.with_conn(|conn| {
            Ok(is_member(
                conn,
                &project_id.to_string(),
                &user.to_string(),
            )?)
        })
    }
}

pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn map_project_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProjectRow> {
    Ok(ProjectRow {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        deadline: row.get(3)?,
        owner_id: row.get(4)?,
        created_at: row.get(5)?,
    })
}

pub(crate) fn query_project(conn: &Connection, id: &str) -> StoreResult<Option<ProjectRow>> {
    let row = conn
        .query_row(
            "SELECT id, name, description, deadline, owner_id, created_at
             FROM projects WHERE id = ?1",
            [id],
            map_project_row,
        )
        .optional()?;
    Ok(row)
}

pub(crate) fn is_member(conn: &Connection, project_id: &str, user_id: &str) -> rusqlite::Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM project_members WHERE project_id = ?1 AND user_id = ?2",
            [project_id, user_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Membership gate shared by every project-scoped operation: missing
/// project is NotFound, existing project without membership is Permission.
pub(crate) fn require_member(
    conn: &Connection,
    project_id: &str,
    user_id: &str,
) -> StoreResult<ProjectRow> {
    let project = query_project(conn, project_id)?.ok_or(StoreError::NotFound("project"))?;
    if !is_member(conn, project_id, user_id)? {
        return Err(StoreError::Permission("project membership"));
    }
    Ok(project)
}

pub(crate) fn members_of(conn: &Connection, project_id: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT user_id FROM project_members WHERE project_id = ?1 ORDER BY user_id",
    )?;
    let members = stmt
        .query_map([project_id], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(members)
}

fn project_from_row(conn: &Connection, row: ProjectRow) -> StoreResult<Project> {
    let members = members_of(conn, &row.id)?
        .iter()
        .map(|id| parse_uuid(id, "member id"))
        .collect();
    Ok(Project {
        id: parse_uuid(&row.id, "project id"),
        name: row.name,
        description: row.description,
        deadline: row.deadline.as_deref().and_then(parse_date),
        owner_id: parse_uuid(&row.owner_id, "owner_id"),
        members,
        created_at: parse_timestamp(&row.created_at),
    })
}
