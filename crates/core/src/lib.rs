//! Jeetspace Core Library
//!
//! Voice room session management: models, permissions, storage, identity
//! resolution and the room service.

pub mod config;
pub mod error;
pub mod hosting;
pub mod identity;
pub mod invariants;
pub mod models;
pub mod permissions;
pub mod provider;
pub mod service;
pub mod storage;

pub use config::{Config, GuestHostFallback};
pub use error::{Error, ErrorKind, Result};
pub use hosting::{HostClaim, HostContext};
pub use identity::{Credentials, Identity, IdentityResolver};
pub use models::*;
pub use permissions::*;
pub use provider::{sanitize_room_name, MediaProvider, MediaRoom};
pub use service::{
    AdminDeleteReport, JoinOutcome, KickOutcome, RoomService, SpeakRequest,
    DEFAULT_HISTORY_LIMIT,
};
pub use storage::{
    Database, HistoryRepository, ModerationRepository, ParticipantRepository, RoomRepository,
    Storage, UserRepository,
};
