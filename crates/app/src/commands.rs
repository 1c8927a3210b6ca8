//! Operator commands
//!
//! Each command writes human-readable output, or pretty JSON with `--json`.

use std::io::Write;

use anyhow::Result;
use serde::Serialize;
use uuid::Uuid;

use jeetspace_core::{HistoryEntry, RoomDetails, RoomPage};

use crate::state::AppState;

/// Output format selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    Json,
}

fn emit_json<W: Write, T: Serialize>(out: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

pub fn list(
    state: &AppState,
    out: &mut impl Write,
    format: Format,
    limit: u32,
    offset: u32,
) -> Result<()> {
    let page = state.service.list_public_rooms(limit, offset)?;
    match format {
        Format::Json => emit_json(out, &page),
        Format::Text => write_page(out, &page),
    }
}

fn write_page(out: &mut impl Write, page: &RoomPage) -> Result<()> {
    if page.rooms.is_empty() {
        writeln!(out, "No public rooms")?;
        return Ok(());
    }
    for room in &page.rooms {
        writeln!(
            out,
            "{}  {:<32} {:>3}/{:<3} host={}{}",
            room.id,
            room.name,
            room.participant_count,
            room.max_participants,
            room.host.username,
            if room.is_closed { "  [closed]" } else { "" },
        )?;
    }
    writeln!(
        out,
        "-- showing {} of {} (offset {})",
        page.rooms.len(),
        page.total,
        page.offset
    )?;
    Ok(())
}

pub fn show(state: &AppState, out: &mut impl Write, format: Format, room_id: Uuid) -> Result<()> {
    let details = state.service.get_room(room_id)?;
    match format {
        Format::Json => emit_json(out, &details),
        Format::Text => write_details(out, &details),
    }
}

fn write_details(out: &mut impl Write, details: &RoomDetails) -> Result<()> {
    let room = &details.room;
    writeln!(out, "{} ({})", room.name, room.id)?;
    if let Some(description) = &room.description {
        writeln!(out, "  {}", description)?;
    }
    writeln!(
        out,
        "  mode={} quality={} public={} closed={} recording={}",
        room.speaker_mode.as_str(),
        room.voice_quality.as_str(),
        room.is_public,
        room.is_closed,
        room.is_recording
    )?;
    let host = details
        .host
        .as_ref()
        .map(|h| h.username.as_str())
        .unwrap_or("<deleted>");
    writeln!(out, "  host: {}", host)?;
    writeln!(out, "  url: {}", room.external_url)?;

    if !details.co_hosts.is_empty() {
        let names: Vec<&str> = details.co_hosts.iter().map(|c| c.username.as_str()).collect();
        writeln!(out, "  co-hosts: {}", names.join(", "))?;
    }

    writeln!(
        out,
        "  participants ({}/{}):",
        details.participant_count(),
        room.max_participants
    )?;
    for p in &details.participants {
        writeln!(
            out,
            "    {} {}{}",
            p.username,
            if p.is_speaker { "[speaker]" } else { "[listener]" },
            if p.is_guest { " guest" } else { "" },
        )?;
    }
    Ok(())
}

pub fn history(
    state: &AppState,
    out: &mut impl Write,
    format: Format,
    room_id: Uuid,
    limit: Option<u32>,
) -> Result<()> {
    let entries = state.service.history(room_id, limit)?;
    match format {
        Format::Json => emit_json(out, &entries),
        Format::Text => write_history(out, &entries),
    }
}

fn write_history(out: &mut impl Write, entries: &[HistoryEntry]) -> Result<()> {
    for entry in entries {
        let event = &entry.event;
        let who = entry.username.as_deref().unwrap_or("-");
        write!(
            out,
            "{}  {:<18} {}",
            event.created_at.format("%Y-%m-%d %H:%M:%S"),
            event.action.as_str(),
            who
        )?;
        if let Some(details) = &event.details {
            write!(out, "  {}", details)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

pub fn users(
    state: &AppState,
    out: &mut impl Write,
    format: Format,
    prefix: &str,
    limit: u32,
) -> Result<()> {
    let users = state.service.search_users(prefix, limit)?;
    if format == Format::Json {
        return emit_json(out, &users);
    }
    for user in &users {
        writeln!(
            out,
            "{}  {:<24} {}",
            user.id,
            user.username,
            user.wallet_address.as_deref().unwrap_or("-")
        )?;
    }
    Ok(())
}

pub fn prune_sessions(state: &AppState, out: &mut impl Write) -> Result<()> {
    let removed = state.service.prune_sessions()?;
    writeln!(out, "Removed {} expired sessions", removed)?;
    Ok(())
}

/// Close or reopen a room, acting as the given wallet (admin by default)
pub fn set_closed(
    state: &AppState,
    out: &mut impl Write,
    room_id: Uuid,
    wallet: Option<&str>,
    closed: bool,
) -> Result<()> {
    let actor = state.actor(wallet)?;
    let room = state.service.set_closed(room_id, &actor, closed)?;
    writeln!(
        out,
        "{} is now {}",
        room.name,
        if room.is_closed { "closed" } else { "open" }
    )?;
    Ok(())
}

pub fn delete(
    state: &AppState,
    out: &mut impl Write,
    room_id: Uuid,
    wallet: Option<&str>,
) -> Result<()> {
    let actor = state.actor(wallet)?;
    state.service.delete_room(room_id, &actor)?;
    writeln!(out, "Deleted {}", room_id)?;
    Ok(())
}

/// Returns whether every name was deleted
pub fn delete_by_names(state: &AppState, out: &mut impl Write, names: &[String]) -> Result<bool> {
    let admin = state.admin()?;
    let report = state.service.admin_delete_by_names(&admin, names)?;

    for (name, id) in &report.deleted {
        writeln!(out, "deleted  {}  {}", id, name)?;
    }
    for (name, error) in &report.errors {
        writeln!(out, "failed   {}: {}", name, error)?;
    }
    Ok(report.errors.is_empty())
}

pub async fn eject(
    state: &AppState,
    out: &mut impl Write,
    room_id: Uuid,
    session_id: &str,
    wallet: Option<&str>,
) -> Result<()> {
    let actor = state.actor(wallet)?;
    state
        .service
        .eject_session(room_id, &actor, session_id)
        .await?;
    writeln!(out, "Ejected session {} from {}", session_id, room_id)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use jeetspace_core::{Credentials, NewRoom};

    use super::*;
    use crate::state::testing::{state, StubProvider};

    fn output(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }

    async fn seeded(state: &AppState, name: &str) -> Uuid {
        let host = state
            .service
            .resolve(&Credentials::wallet("0xhost00000000000000000000000000000000000001"))
            .unwrap();
        state
            .service
            .create_room(&host, NewRoom::named(name))
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_list_and_show() {
        let state = state(Arc::new(StubProvider::default()));
        let room_id = seeded(&state, "GM Frens").await;

        let mut buf = Vec::new();
        list(&state, &mut buf, Format::Text, 20, 0).unwrap();
        let text = output(buf);
        assert!(text.contains("GM Frens"));
        assert!(text.contains("showing 1 of 1"));

        let mut buf = Vec::new();
        show(&state, &mut buf, Format::Text, room_id).unwrap();
        let text = output(buf);
        assert!(text.contains("url: https://stub.daily.co/gm-frens"));
        assert!(text.contains("participants (0/50)"));
    }

    #[tokio::test]
    async fn test_users_and_prune_sessions() {
        let state = state(Arc::new(StubProvider::default()));
        seeded(&state, "Anything").await;

        let mut buf = Vec::new();
        users(&state, &mut buf, Format::Text, "anon_", 10).unwrap();
        let text = output(buf);
        assert!(text.contains("anon_0xhost"));
        assert!(text.contains("0xhost00000000000000000000000000000000000001"));

        let mut buf = Vec::new();
        prune_sessions(&state, &mut buf).unwrap();
        assert_eq!(output(buf), "Removed 0 expired sessions\n");
    }

    #[tokio::test]
    async fn test_json_output_parses() {
        let state = state(Arc::new(StubProvider::default()));
        let room_id = seeded(&state, "Moon Talk").await;

        let mut buf = Vec::new();
        history(&state, &mut buf, Format::Json, room_id, None).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        let entries = value.as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["event"]["action"], "room_created");
    }

    #[tokio::test]
    async fn test_close_requires_host_wallet() {
        let state = state(Arc::new(StubProvider::default()));
        let room_id = seeded(&state, "Alpha").await;

        // The admin is not a moderator of the room
        let mut buf = Vec::new();
        assert!(set_closed(&state, &mut buf, room_id, None, true).is_err());

        let host = "0xhost00000000000000000000000000000000000001";
        set_closed(&state, &mut buf, room_id, Some(host), true).unwrap();
        assert!(output(buf).contains("Alpha is now closed"));
        assert!(state.service.get_room(room_id).unwrap().room.is_closed);
    }

    #[tokio::test]
    async fn test_delete_by_names_reports_missing() {
        let state = state(Arc::new(StubProvider::default()));
        seeded(&state, "Dupe").await;
        seeded(&state, "Dupe").await;

        let mut buf = Vec::new();
        let names = vec!["Dupe".to_string(), "Ghost".to_string()];
        let clean = delete_by_names(&state, &mut buf, &names).unwrap();
        assert!(!clean);

        let text = output(buf);
        assert_eq!(text.matches("deleted").count(), 2);
        assert!(text.contains("failed   Ghost"));
    }

    #[tokio::test]
    async fn test_admin_delete_and_eject() {
        let provider = Arc::new(StubProvider::default());
        let state = state(provider.clone());
        let room_id = seeded(&state, "Eject Me").await;

        let mut buf = Vec::new();
        eject(&state, &mut buf, room_id, "sess-9", None).await.unwrap();
        assert_eq!(
            provider.ejected.lock().unwrap().as_slice(),
            &[(
                "https://stub.daily.co/eject-me".to_string(),
                "sess-9".to_string()
            )]
        );

        delete(&state, &mut buf, room_id, None).unwrap();
        assert!(state.service.get_room(room_id).is_err());
    }
}
