//! User and identity models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Username prefix for ephemeral guests
pub const GUEST_PREFIX: &str = "guest_";

/// Username prefix for wallet users created on first sight
pub const WALLET_PREFIX: &str = "anon_";

/// How a user's identity was established
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityKind {
    /// Email account with a server session
    Account,
    /// Durable identity keyed by a linked wallet address
    Wallet,
    /// Ephemeral, minted per request
    Guest,
}

impl IdentityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentityKind::Account => "account",
            IdentityKind::Wallet => "wallet",
            IdentityKind::Guest => "guest",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "account" => Some(IdentityKind::Account),
            "wallet" => Some(IdentityKind::Wallet),
            "guest" => Some(IdentityKind::Guest),
            _ => None,
        }
    }

    pub fn is_durable(&self) -> bool {
        !matches!(self, IdentityKind::Guest)
    }
}

/// A user of the network, durable or ephemeral
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub wallet_address: Option<String>,
    pub kind: IdentityKind,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn account(username: String, email: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            username,
            email: Some(email),
            wallet_address: None,
            kind: IdentityKind::Account,
            is_verified: false,
            created_at: Utc::now(),
        }
    }

    /// Wallet users are verified by construction: the address was presented
    pub fn wallet(address: String) -> Self {
        let short: String = address.chars().take(6).collect();
        Self {
            id: Uuid::new_v4(),
            username: format!("{WALLET_PREFIX}{short}"),
            email: None,
            wallet_address: Some(address),
            kind: IdentityKind::Wallet,
            is_verified: true,
            created_at: Utc::now(),
        }
    }

    pub fn guest(username: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            username,
            email: None,
            wallet_address: None,
            kind: IdentityKind::Guest,
            is_verified: false,
            created_at: Utc::now(),
        }
    }

    /// Guest-flavored identities cannot be re-identified across requests.
    /// Legacy rows may only carry the `guest_` username, so both are checked.
    pub fn is_guest(&self) -> bool {
        self.kind == IdentityKind::Guest || self.username.starts_with(GUEST_PREFIX)
    }
}

/// Public projection of a user, safe to embed in room views
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub wallet_address: Option<String>,
    pub is_verified: bool,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            wallet_address: user.wallet_address.clone(),
            is_verified: user.is_verified,
        }
    }
}

/// Active session for a logged-in account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: Uuid, duration_hours: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            created_at: now,
            expires_at: now + chrono::Duration::hours(duration_hours),
        }
    }

    pub fn is_valid(&self) -> bool {
        Utc::now() < self.expires_at
    }
}
