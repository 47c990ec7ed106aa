//! User operations

use rusqlite::{params, Connection, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::User;

const USER_COLUMNS: &str = "id, email, name, created_at";

impl Database {
    /// Create a user; the email must be non-empty and not already registered
    pub fn create_user(&self, email: &str, name: Option<&str>) -> Result<User> {
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(Error::Validation(format!("invalid email: {:?}", email)));
        }

        let conn = self.conn()?;

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM users WHERE email = ?",
                params![email],
                |row| row.get(0),
            )
            .optional()?;
        if existing.is_some() {
            return Err(Error::Validation(format!(
                "email already registered: {}",
                email
            )));
        }

        conn.execute(
            "INSERT INTO users (email, name) VALUES (?, ?)",
            params![email, name],
        )?;
        let id = conn.last_insert_rowid();

        fetch_user(&conn, id)?.ok_or_else(|| Error::NotFound(format!("user {}", id)))
    }

    /// Get a user by ID
    pub fn get_user(&self, id: i64) -> Result<User> {
        let conn = self.conn()?;
        fetch_user(&conn, id)?.ok_or_else(|| Error::NotFound(format!("user {}", id)))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS),
                params![email.trim()],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// List all users, oldest first
    pub fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS))?;

        let users = stmt
            .query_map([], row_to_user)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(users)
    }
}

fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
    let created_at: String = row.get(3)?;
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        created_at: parse_datetime(&created_at),
    })
}

fn fetch_user(conn: &Connection, id: i64) -> Result<Option<User>> {
    let user = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS),
            params![id],
            row_to_user,
        )
        .optional()?;
    Ok(user)
}

/// Fail with `NotFound` unless the user exists
pub(crate) fn ensure_user(conn: &Connection, user_id: i64) -> Result<()> {
    let exists: Option<i64> = conn
        .query_row(
            "SELECT id FROM users WHERE id = ?",
            params![user_id],
            |row| row.get(0),
        )
        .optional()?;
    match exists {
        Some(_) => Ok(()),
        None => Err(Error::NotFound(format!("user {}", user_id))),
    }
}
