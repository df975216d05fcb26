//! Dense integer ordering over a set of rows scoped to a parent.
//!
//! Two scopes exist: cards within a project, and projects within a user's
//! personal view. Both share the same append/reorder mechanics; the scope
//! just names the table and columns.

use rusqlite::Connection;

use crate::{StoreError, StoreResult};

pub(crate) struct OrderedScope {
    pub table: &'static str,
    pub parent_col: &'static str,
    pub id_col: &'static str,
    pub pos_col: &'static str,
    /// Entity label used in NotFound errors ("card", "project").
    pub item: &'static str,
}

pub(crate) const CARD_POSITIONS: OrderedScope = OrderedScope {
    table: "cards",
    parent_col: "project_id",
    id_col: "id",
    pos_col: "position",
    item: "card",
};

pub(crate) const PROJECT_POSITIONS: OrderedScope = OrderedScope {
    table: "project_order",
    parent_col: "user_id",
    id_col: "project_id",
    pos_col: "position",
    item: "project",
};

pub(crate) struct PositionChange {
    pub id: String,
    pub to: i64,
}

impl OrderedScope {
    /// Next free position at the end of the parent's list: max + 1, or 0
    /// for an empty parent. Tolerates gaps left by earlier moves.
    pub fn next_position(&self, conn: &Connection, parent: &str) -> rusqlite::Result<i64> {
        conn.query_row(
            &format!(
                "SELECT COALESCE(MAX({pos}) + 1, 0) FROM {table} WHERE {parent} = ?1",
                pos = self.pos_col,
                table = self.table,
                parent = self.parent_col,
            ),
            [parent],
            |row| row.get(0),
        )
    }

    fn position_of(
        &self,
        conn: &Connection,
        parent: &str,
        id: &str,
    ) -> rusqlite::Result<Option<i64>> {
        use rusqlite::OptionalExtension;
        conn.query_row(
            &format!(
                "SELECT {pos} FROM {table} WHERE {parent} = ?1 AND {id} = ?2",
                pos = self.pos_col,
                table = self.table,
                parent = self.parent_col,
                id = self.id_col,
            ),
            [parent, id],
            |row| row.get(0),
        )
        .optional()
    }

    /// Assign each id its index in `ids` as its new position. Validates the
    /// whole list against the parent's current item set before the first
    /// write, so a bad id can never leave a partial permutation behind.
    /// Returns only the positions that actually changed.
    pub fn reorder(
        &self,
        conn: &Connection,
        parent: &str,
        ids: &[String],
    ) -> StoreResult<Vec<PositionChange>> {
        let mut current = Vec::with_capacity(ids.len());
        for id in ids {
            match self.position_of(conn, parent, id)? {
                Some(pos) => current.push(pos),
                None => return Err(StoreError::NotFound(self.item)),
            }
        }

        let update = format!(
            "UPDATE {table} SET {pos} = ?1 WHERE {parent} = ?2 AND {id} = ?3",
            table = self.table,
            pos = self.pos_col,
            parent = self.parent_col,
            id = self.id_col,
        );

        let mut changes = Vec::new();
        for (index, id) in ids.iter().enumerate() {
            let to = index as i64;
            if current[index] == to {
                continue;
            }
            conn.execute(&update, rusqlite::params![to, parent, id])?;
            changes.push(PositionChange {
                id: id.clone(),
                to,
            });
        }

        Ok(changes)
    }
}
