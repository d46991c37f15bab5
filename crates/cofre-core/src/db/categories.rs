//! Category operations

use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Category, CategoryType};

fn row_to_category(row: &rusqlite::Row) -> rusqlite::Result<Category> {
    let type_str: String = row.get(3)?;
    let created_at_str: String = row.get(5)?;

    Ok(Category {
        id: row.get(0)?,
        user_id: row.get(1)?,
        description: row.get(2)?,
        category_type: type_str.parse().unwrap_or(CategoryType::Expense),
        active: row.get(4)?,
        created_at: parse_datetime(&created_at_str),
    })
}

const CATEGORY_COLS: &str = "id, user_id, description, category_type, active, created_at";

impl Database {
    pub fn create_category(
        &self,
        user_id: i64,
        description: &str,
        category_type: CategoryType,
    ) -> Result<Category> {
        if description.trim().is_empty() {
            return Err(Error::Validation(
                "Category description is required".to_string(),
            ));
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO categories (user_id, description, category_type) VALUES (?, ?, ?)",
            params![user_id, description, category_type.as_str()],
        )?;
        let id = conn.last_insert_rowid();
        drop(conn);

        self.get_category(user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("Category {} not found after insert", id)))
    }

    pub fn list_categories(&self, user_id: i64) -> Result<Vec<Category>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM categories WHERE user_id = ? ORDER BY description",
            CATEGORY_COLS
        ))?;

        let categories = stmt
            .query_map(params![user_id], row_to_category)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(categories)
    }

    pub fn get_category(&self, user_id: i64, id: i64) -> Result<Option<Category>> {
        let conn = self.conn()?;
        let category = conn
            .query_row(
                &format!(
                    "SELECT {} FROM categories WHERE id = ? AND user_id = ?",
                    CATEGORY_COLS
                ),
                params![id, user_id],
                row_to_category,
            )
            .optional()?;
        Ok(category)
    }

    pub fn update_category(
        &self,
        user_id: i64,
        id: i64,
        description: &str,
        category_type: CategoryType,
    ) -> Result<Category> {
        if description.trim().is_empty() {
            return Err(Error::Validation(
                "Category description is required".to_string(),
            ));
        }

        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE categories SET description = ?, category_type = ? WHERE id = ? AND user_id = ?",
            params![description, category_type.as_str(), id, user_id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Category {} not found", id)));
        }
        drop(conn);

        self.get_category(user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("Category {} not found", id)))
    }

    /// Toggle a category between active and inactive
    pub fn toggle_category_status(&self, user_id: i64, id: i64) -> Result<Category> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE categories SET active = NOT active WHERE id = ? AND user_id = ?",
            params![id, user_id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Category {} not found", id)));
        }
        drop(conn);

        self.get_category(user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("Category {} not found", id)))
    }

    pub fn delete_category(&self, user_id: i64, id: i64) -> Result<()> {
        let conn = self.conn()?;

        self.get_category(user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("Category {} not found", id)))?;

        let in_use: i64 = conn.query_row(
            "SELECT (SELECT COUNT(*) FROM transactions WHERE category_id = ?1)
                  + (SELECT COUNT(*) FROM bills WHERE category_id = ?1)",
            params![id],
            |row| row.get(0),
        )?;
        if in_use > 0 {
            return Err(Error::Conflict(format!(
                "Category {} is referenced by {} record(s)",
                id, in_use
            )));
        }

        conn.execute(
            "DELETE FROM categories WHERE id = ? AND user_id = ?",
            params![id, user_id],
        )?;
        Ok(())
    }
}
