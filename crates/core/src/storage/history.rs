//! Room history storage operations

use rusqlite::{params, Connection};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{
    parse_datetime, parse_history_action, parse_json_opt, parse_uuid, parse_uuid_opt,
};
use crate::error::Result;
use crate::models::{HistoryAction, HistoryEntry, HistoryEvent};

pub struct HistoryStore<'a> {
    conn: &'a Connection,
}

impl<'a> HistoryStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Append an event to the log
    #[instrument(skip(self, event), fields(room_id = %event.room_id, action = %event.action))]
    pub fn append(&self, event: &HistoryEvent) -> Result<()> {
        let details = event
            .details
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        self.conn.execute(
            "INSERT INTO room_history (id, room_id, user_id, action, details, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                event.id.to_string(),
                event.room_id.to_string(),
                event.user_id.map(|id| id.to_string()),
                event.action.as_str(),
                details,
                event.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Most recent events first, with the subject's username when known
    #[instrument(skip(self))]
    pub fn list_recent(&self, room_id: Uuid, limit: u32) -> Result<Vec<HistoryEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT h.id, h.room_id, h.user_id, h.action, h.details, h.created_at, u.username
             FROM room_history h
             LEFT JOIN users u ON u.id = h.user_id
             WHERE h.room_id = ?1
             ORDER BY h.created_at DESC, h.rowid DESC
             LIMIT ?2",
        )?;

        let entries = stmt
            .query_map(params![room_id.to_string(), limit], |row| {
                Ok(HistoryEntry {
                    event: HistoryEvent {
                        id: parse_uuid(&row.get::<_, String>(0)?)?,
                        room_id: parse_uuid(&row.get::<_, String>(1)?)?,
                        user_id: parse_uuid_opt(row.get(2)?)?,
                        action: parse_history_action(&row.get::<_, String>(3)?)?,
                        details: parse_json_opt(row.get(4)?)?,
                        created_at: parse_datetime(&row.get::<_, String>(5)?)?,
                    },
                    username: row.get(6)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    /// How many times an action was logged against a user in a room
    #[instrument(skip(self))]
    pub fn count_actions(
        &self,
        room_id: Uuid,
        user_id: Uuid,
        action: HistoryAction,
    ) -> Result<u32> {
        let count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM room_history
             WHERE room_id = ?1 AND user_id = ?2 AND action = ?3",
            params![room_id.to_string(), user_id.to_string(), action.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewRoom, Room, User};
    use crate::storage::Database;
    use serde_json::json;

    #[test]
    fn test_append_and_list_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let host = User::account("host".into(), "host@x.io".into());
        db.users().create(&host).unwrap();
        let room = Room::new(&NewRoom::named("gm"), 10, host.id, "https://d.co/gm".into());
        db.rooms().create(&room).unwrap();

        let store = db.history();
        store
            .append(&HistoryEvent::new(room.id, Some(host.id), HistoryAction::RoomCreated))
            .unwrap();
        store
            .append(
                &HistoryEvent::new(room.id, Some(host.id), HistoryAction::Kicked)
                    .with_details(json!({ "kickedBy": host.id })),
            )
            .unwrap();

        let entries = store.list_recent(room.id, 50).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].event.action, HistoryAction::Kicked);
        assert_eq!(entries[0].username.as_deref(), Some("host"));
        assert!(entries[0].event.details.is_some());
        assert_eq!(entries[1].event.action, HistoryAction::RoomCreated);

        assert_eq!(store.list_recent(room.id, 1).unwrap().len(), 1);
        assert_eq!(
            store
                .count_actions(room.id, host.id, HistoryAction::Kicked)
                .unwrap(),
            1
        );
    }

    #[test]
    fn test_event_without_user() {
        let db = Database::open_in_memory().unwrap();
        let host = User::account("host".into(), "host@x.io".into());
        db.users().create(&host).unwrap();
        let room = Room::new(&NewRoom::named("gm"), 10, host.id, "https://d.co/gm".into());
        db.rooms().create(&room).unwrap();

        db.history()
            .append(&HistoryEvent::new(room.id, None, HistoryAction::RoomClosed))
            .unwrap();
        let entries = db.history().list_recent(room.id, 10).unwrap();
        assert!(entries[0].username.is_none());
        assert!(entries[0].event.user_id.is_none());
    }
}
