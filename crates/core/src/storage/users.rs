//! User and session storage operations

use chrono::Utc;
use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{parse_datetime, parse_identity_kind, parse_uuid, OptionalExt};
use crate::error::Result;
use crate::models::{IdentityKind, Session, User};

const USER_COLUMNS: &str = "id, username, email, wallet_address, kind, is_verified, created_at";

pub struct UserStore<'a> {
    conn: &'a Connection,
}

pub(crate) fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        username: row.get(1)?,
        email: row.get(2)?,
        wallet_address: row.get(3)?,
        kind: parse_identity_kind(&row.get::<_, String>(4)?)?,
        is_verified: row.get::<_, i32>(5)? != 0,
        created_at: parse_datetime(&row.get::<_, String>(6)?)?,
    })
}

impl<'a> UserStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a new user
    #[instrument(skip(self, user), fields(username = %user.username, kind = user.kind.as_str()))]
    pub fn create(&self, user: &User) -> Result<()> {
        self.conn.execute(
            "INSERT INTO users (id, username, email, wallet_address, kind, is_verified, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                user.id.to_string(),
                user.username,
                user.email,
                user.wallet_address,
                user.kind.as_str(),
                user.is_verified as i32,
                user.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Find user by ID
    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
        let user = self
            .conn
            .query_row(&sql, params![id.to_string()], user_from_row)
            .optional()?;
        Ok(user)
    }

    /// Find the durable user linked to a wallet address
    #[instrument(skip(self))]
    pub fn find_by_wallet(&self, address: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE wallet_address = ?1");
        let user = self
            .conn
            .query_row(&sql, params![address], user_from_row)
            .optional()?;
        Ok(user)
    }

    /// Search durable users by username prefix. Guests are never listed.
    #[instrument(skip(self))]
    pub fn search(&self, prefix: &str, limit: u32) -> Result<Vec<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users
             WHERE kind != ?1 AND username LIKE ?2 ESCAPE '\\'
             ORDER BY username LIMIT ?3"
        );
        let escaped = prefix
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        let mut stmt = self.conn.prepare(&sql)?;
        let users = stmt
            .query_map(
                params![IdentityKind::Guest.as_str(), format!("{escaped}%"), limit],
                user_from_row,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(users)
    }

    /// Create a session
    #[instrument(skip(self, session), fields(user_id = %session.user_id))]
    pub fn create_session(&self, session: &Session) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sessions (id, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                session.id.to_string(),
                session.user_id.to_string(),
                session.created_at.to_rfc3339(),
                session.expires_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Find a valid (non-expired) session
    #[instrument(skip(self))]
    pub fn find_valid_session(&self, session_id: Uuid) -> Result<Option<Session>> {
        let session = self
            .conn
            .query_row(
                "SELECT id, user_id, created_at, expires_at FROM sessions WHERE id = ?1",
                params![session_id.to_string()],
                |row| {
                    Ok(Session {
                        id: parse_uuid(&row.get::<_, String>(0)?)?,
                        user_id: parse_uuid(&row.get::<_, String>(1)?)?,
                        created_at: parse_datetime(&row.get::<_, String>(2)?)?,
                        expires_at: parse_datetime(&row.get::<_, String>(3)?)?,
                    })
                },
            )
            .optional()?;

        Ok(session.filter(Session::is_valid))
    }

    /// Clean up expired sessions
    #[instrument(skip(self))]
    pub fn cleanup_expired_sessions(&self) -> Result<u64> {
        let count = self.conn.execute(
            "DELETE FROM sessions WHERE expires_at < ?1",
            params![Utc::now().to_rfc3339()],
        )?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;

    #[test]
    fn test_search_skips_guests() {
        let db = Database::open_in_memory().unwrap();
        let users = db.users();

        users.create(&User::account("guestbook".into(), "gb@x.io".into())).unwrap();
        users.create(&User::guest("guest_1_abcdefg".into())).unwrap();

        let found = users.search("guest", 10).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].username, "guestbook");
    }

    #[test]
    fn test_search_escapes_wildcards() {
        let db = Database::open_in_memory().unwrap();
        let users = db.users();

        users.create(&User::account("a_b".into(), "1@x.io".into())).unwrap();
        users.create(&User::account("axb".into(), "2@x.io".into())).unwrap();

        let found = users.search("a_", 10).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].username, "a_b");
    }

    #[test]
    fn test_expired_session_not_returned() {
        let db = Database::open_in_memory().unwrap();
        let users = db.users();

        let user = User::account("alice".into(), "alice@x.io".into());
        users.create(&user).unwrap();

        let live = Session::new(user.id, 1);
        let stale = Session::new(user.id, -1);
        users.create_session(&live).unwrap();
        users.create_session(&stale).unwrap();

        assert!(users.find_valid_session(live.id).unwrap().is_some());
        assert!(users.find_valid_session(stale.id).unwrap().is_none());
        assert_eq!(users.cleanup_expired_sessions().unwrap(), 1);
    }

    #[test]
    fn test_find_by_wallet() {
        let db = Database::open_in_memory().unwrap();
        let user = User::wallet("0xfeedbeef".into());
        db.users().create(&user).unwrap();

        let found = db.users().find_by_wallet("0xfeedbeef").unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(found.kind, IdentityKind::Wallet);
        assert!(db.users().find_by_wallet("0xother").unwrap().is_none());
    }
}
