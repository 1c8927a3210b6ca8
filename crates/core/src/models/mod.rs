//! Data models for Jeetspace voice rooms

mod history;
mod moderation;
mod participant;
mod room;
mod user;

pub use history::*;
pub use moderation::*;
pub use participant::*;
pub use room::*;
pub use user::*;
