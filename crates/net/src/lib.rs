//! Jeetspace Network Library
//!
//! REST client for the hosted media provider (Daily). Implements
//! [`jeetspace_core::MediaProvider`] so the room service can allocate
//! rooms, mint join tokens and eject sessions.
//!
//! # Usage
//!
//! ```ignore
//! let config = Config::load(None)?;
//! let provider = Arc::new(DailyClient::new(&config.provider)?);
//! let service = RoomService::new(db, provider, config);
//! ```

pub mod client;
pub mod error;
pub mod protocol;
pub mod room_url;

pub use client::DailyClient;
pub use error::{Error, Result};
pub use room_url::{room_name_from_url, RoomUrl};
