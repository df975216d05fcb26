//! Keyword search across the requester's projects and their cards.
//! Visibility follows membership: cards only surface when the requester is
//! a member of the owning project.

use uuid::Uuid;

use tackboard_types::api::{CardHit, ProjectHit, SearchResults};

use crate::models::parse_uuid;
use crate::{Database, StoreResult};

impl Database {
    pub fn search(&self, requester: Uuid, keyword: &str) -> StoreResult<SearchResults> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Ok(SearchResults::default());
        }

        let pattern = format!("%{}%", escape_like(keyword));
        let uid = requester.to_string();

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT p.id, p.name, p.description
                 FROM projects p
                 JOIN project_members m ON m.project_id = p.id
                 WHERE m.user_id = ?1
                   AND (p.name LIKE ?2 ESCAPE '\\' OR p.description LIKE ?2 ESCAPE '\\')
                 ORDER BY p.name",
            )?;
            let projects = stmt
                .query_map([&uid, &pattern], |row| {
                    Ok(ProjectHit {
                        id: parse_uuid(&row.get::<_, String>(0)?, "project id"),
                        name: row.get(1)?,
                        description: row.get(2)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            let mut stmt = conn.prepare(
                "SELECT c.id, c.project_id, p.name, c.title, c.description
                 FROM cards c
                 JOIN projects p ON p.id = c.project_id
                 JOIN project_members m ON m.project_id = c.project_id
                 WHERE m.user_id = ?1
                   AND (c.title LIKE ?2 ESCAPE '\\' OR c.description LIKE ?2 ESCAPE '\\')
                 ORDER BY p.name, c.position",
            )?;
            let cards = stmt
                .query_map([&uid, &pattern], |row| {
                    Ok(CardHit {
                        id: parse_uuid(&row.get::<_, String>(0)?, "card id"),
                        project_id: parse_uuid(&row.get::<_, String>(1)?, "project id"),
                        project_name: row.get(2)?,
                        title: row.get(3)?,
                        description: row.get(4)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(SearchResults { projects, cards })
        })
    }
}

/// Escape LIKE metacharacters in user input.
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_like_metacharacters() {
        assert_eq!(escape_like("50%_done"), "50\\%\\_done");
        assert_eq!(escape_like("plain"), "plain");
    }
}
