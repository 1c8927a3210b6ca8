//! Co-host grants and bans

use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{parse_datetime, parse_uuid, OptionalExt};
use crate::error::Result;
use crate::models::{BannedUser, CoHost, UserSummary};

pub struct ModerationStore<'a> {
    conn: &'a Connection,
}

fn ban_from_row(row: &Row<'_>) -> rusqlite::Result<BannedUser> {
    Ok(BannedUser {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        room_id: parse_uuid(&row.get::<_, String>(1)?)?,
        user_id: parse_uuid(&row.get::<_, String>(2)?)?,
        reason: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?)?,
    })
}

impl<'a> ModerationStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Grant co-host. Returns false if the grant already existed.
    #[instrument(skip(self, grant), fields(room_id = %grant.room_id, user_id = %grant.user_id))]
    pub fn add_co_host(&self, grant: &CoHost) -> Result<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO room_co_hosts (id, room_id, user_id, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                grant.id.to_string(),
                grant.room_id.to_string(),
                grant.user_id.to_string(),
                grant.created_at.to_rfc3339(),
            ],
        )?;
        Ok(inserted > 0)
    }

    #[instrument(skip(self))]
    pub fn remove_co_host(&self, room_id: Uuid, user_id: Uuid) -> Result<bool> {
        let removed = self.conn.execute(
            "DELETE FROM room_co_hosts WHERE room_id = ?1 AND user_id = ?2",
            params![room_id.to_string(), user_id.to_string()],
        )?;
        Ok(removed > 0)
    }

    pub fn is_co_host(&self, room_id: Uuid, user_id: Uuid) -> Result<bool> {
        let found: Option<i32> = self
            .conn
            .query_row(
                "SELECT 1 FROM room_co_hosts WHERE room_id = ?1 AND user_id = ?2",
                params![room_id.to_string(), user_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Co-hosts of a room, oldest grant first
    #[instrument(skip(self))]
    pub fn list_co_hosts(&self, room_id: Uuid) -> Result<Vec<UserSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT u.id, u.username, u.wallet_address, u.is_verified
             FROM room_co_hosts c
             INNER JOIN users u ON u.id = c.user_id
             WHERE c.room_id = ?1
             ORDER BY c.created_at ASC",
        )?;
        let co_hosts = stmt
            .query_map(params![room_id.to_string()], |row| {
                Ok(UserSummary {
                    id: parse_uuid(&row.get::<_, String>(0)?)?,
                    username: row.get(1)?,
                    wallet_address: row.get(2)?,
                    is_verified: row.get::<_, i32>(3)? != 0,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(co_hosts)
    }

    #[instrument(skip(self))]
    pub fn find_ban(&self, room_id: Uuid, user_id: Uuid) -> Result<Option<BannedUser>> {
        let ban = self
            .conn
            .query_row(
                "SELECT id, room_id, user_id, reason, created_at
                 FROM room_bans WHERE room_id = ?1 AND user_id = ?2",
                params![room_id.to_string(), user_id.to_string()],
                ban_from_row,
            )
            .optional()?;
        Ok(ban)
    }

    /// Insert a ban. Returns false if one already existed.
    #[instrument(skip(self, ban), fields(room_id = %ban.room_id, user_id = %ban.user_id))]
    pub fn insert_ban(&self, ban: &BannedUser) -> Result<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO room_bans (id, room_id, user_id, reason, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                ban.id.to_string(),
                ban.room_id.to_string(),
                ban.user_id.to_string(),
                ban.reason,
                ban.created_at.to_rfc3339(),
            ],
        )?;
        Ok(inserted > 0)
    }

    /// Insert a ban or refresh the reason of an existing one
    #[instrument(skip(self, ban), fields(room_id = %ban.room_id, user_id = %ban.user_id))]
    pub fn upsert_ban(&self, ban: &BannedUser) -> Result<()> {
        self.conn.execute(
            "INSERT INTO room_bans (id, room_id, user_id, reason, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(room_id, user_id) DO UPDATE SET reason = excluded.reason",
            params![
                ban.id.to_string(),
                ban.room_id.to_string(),
                ban.user_id.to_string(),
                ban.reason,
                ban.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn remove_ban(&self, room_id: Uuid, user_id: Uuid) -> Result<bool> {
        let removed = self.conn.execute(
            "DELETE FROM room_bans WHERE room_id = ?1 AND user_id = ?2",
            params![room_id.to_string(), user_id.to_string()],
        )?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewRoom, Room, User};
    use crate::storage::Database;

    fn setup() -> (Database, Room, User) {
        let db = Database::open_in_memory().unwrap();
        let host = User::account("host".into(), "host@x.io".into());
        let other = User::wallet("0xabcdef123456".into());
        db.users().create(&host).unwrap();
        db.users().create(&other).unwrap();
        let room = Room::new(&NewRoom::named("gm"), 10, host.id, "https://d.co/gm".into());
        db.rooms().create(&room).unwrap();
        (db, room, other)
    }

    #[test]
    fn test_co_host_grant_is_unique() {
        let (db, room, user) = setup();
        let store = db.moderation();

        assert!(store.add_co_host(&CoHost::new(room.id, user.id)).unwrap());
        assert!(!store.add_co_host(&CoHost::new(room.id, user.id)).unwrap());
        assert!(store.is_co_host(room.id, user.id).unwrap());
        assert_eq!(store.list_co_hosts(room.id).unwrap().len(), 1);

        assert!(store.remove_co_host(room.id, user.id).unwrap());
        assert!(!store.remove_co_host(room.id, user.id).unwrap());
        assert!(!store.is_co_host(room.id, user.id).unwrap());
    }

    #[test]
    fn test_ban_lifecycle() {
        let (db, room, user) = setup();
        let store = db.moderation();

        let ban = BannedUser::new(room.id, user.id, Some("spam".into()));
        assert!(store.insert_ban(&ban).unwrap());
        assert!(!store.insert_ban(&ban).unwrap());
        assert!(store.find_ban(room.id, user.id).unwrap().is_some());

        assert!(store.remove_ban(room.id, user.id).unwrap());
        assert!(store.find_ban(room.id, user.id).unwrap().is_none());
    }

    #[test]
    fn test_upsert_ban_refreshes_reason() {
        let (db, room, user) = setup();
        let store = db.moderation();

        store
            .upsert_ban(&BannedUser::new(room.id, user.id, Some("first".into())))
            .unwrap();
        store
            .upsert_ban(&BannedUser::new(room.id, user.id, Some("Kicked 2 times".into())))
            .unwrap();

        let ban = store.find_ban(room.id, user.id).unwrap().unwrap();
        assert_eq!(ban.reason.as_deref(), Some("Kicked 2 times"));
    }
}
