//! Error types for Jeetspace Core

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("You cannot target yourself: {0}")]
    SelfTarget(String),

    #[error("User is already banned")]
    AlreadyBanned,

    #[error("User is already a co-host")]
    AlreadyCoHost,

    #[error("Room is closed - no new participants can join")]
    Closed,

    #[error("You are banned from this room")]
    Banned,

    #[error("Room is full")]
    Full,

    #[error("You are not in this room")]
    NotInRoom,

    #[error("Room is not in nominated speaker mode")]
    InvalidMode,

    #[error("Media provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Join token unavailable: {0}")]
    TokenUnavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Stable, machine-readable error kind for clients to branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Forbidden,
    NotFound,
    SelfTarget,
    AlreadyBanned,
    AlreadyCoHost,
    Closed,
    Banned,
    Full,
    NotInRoom,
    InvalidMode,
    ProviderUnavailable,
    TokenUnavailable,
    Internal,
}

impl ErrorKind {
    /// Conflict family: the request is well-formed but clashes with current state
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            ErrorKind::AlreadyBanned | ErrorKind::AlreadyCoHost | ErrorKind::SelfTarget
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not_found",
            ErrorKind::SelfTarget => "self_target",
            ErrorKind::AlreadyBanned => "already_banned",
            ErrorKind::AlreadyCoHost => "already_co_host",
            ErrorKind::Closed => "closed",
            ErrorKind::Banned => "banned",
            ErrorKind::Full => "full",
            ErrorKind::NotInRoom => "not_in_room",
            ErrorKind::InvalidMode => "invalid_mode",
            ErrorKind::ProviderUnavailable => "provider_unavailable",
            ErrorKind::TokenUnavailable => "token_unavailable",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::Forbidden(_) => ErrorKind::Forbidden,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::SelfTarget(_) => ErrorKind::SelfTarget,
            Error::AlreadyBanned => ErrorKind::AlreadyBanned,
            Error::AlreadyCoHost => ErrorKind::AlreadyCoHost,
            Error::Closed => ErrorKind::Closed,
            Error::Banned => ErrorKind::Banned,
            Error::Full => ErrorKind::Full,
            Error::NotInRoom => ErrorKind::NotInRoom,
            Error::InvalidMode => ErrorKind::InvalidMode,
            Error::ProviderUnavailable(_) => ErrorKind::ProviderUnavailable,
            Error::TokenUnavailable(_) => ErrorKind::TokenUnavailable,
            Error::Database(_) | Error::Config(_) | Error::Io(_) | Error::Serialization(_) => {
                ErrorKind::Internal
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_failures_are_distinct() {
        let kinds = [Error::Closed.kind(), Error::Banned.kind(), Error::Full.kind()];
        assert_ne!(kinds[0], kinds[1]);
        assert_ne!(kinds[1], kinds[2]);
        assert_ne!(kinds[0], kinds[2]);
    }

    #[test]
    fn test_conflict_family() {
        assert!(Error::AlreadyBanned.kind().is_conflict());
        assert!(Error::AlreadyCoHost.kind().is_conflict());
        assert!(Error::SelfTarget("kick".into()).kind().is_conflict());
        assert!(!Error::Forbidden("x".into()).kind().is_conflict());
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::AlreadyCoHost).unwrap();
        assert_eq!(json, "\"already_co_host\"");
        assert_eq!(ErrorKind::NotInRoom.to_string(), "not_in_room");
    }
}
