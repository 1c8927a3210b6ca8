//! Request identity resolution
//!
//! Precedence: valid session, then wallet address, then a fresh guest.
//! Guests are minted per call and never reused.

use chrono::Utc;
use rand::distributions::Uniform;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{User, GUEST_PREFIX};
use crate::storage::UserRepository;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const GUEST_SUFFIX_LEN: usize = 7;

/// What a request presented about who it is
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    pub session_id: Option<Uuid>,
    pub wallet_address: Option<String>,
}

impl Credentials {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn session(session_id: Uuid) -> Self {
        Self {
            session_id: Some(session_id),
            wallet_address: None,
        }
    }

    pub fn wallet(address: impl Into<String>) -> Self {
        Self {
            session_id: None,
            wallet_address: Some(address.into()),
        }
    }
}

/// A resolved request identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user: User,
    pub display_name: String,
}

impl Identity {
    pub fn id(&self) -> Uuid {
        self.user.id
    }

    pub fn is_guest(&self) -> bool {
        self.user.is_guest()
    }
}

impl From<User> for Identity {
    fn from(user: User) -> Self {
        Self {
            display_name: user.username.clone(),
            user,
        }
    }
}

pub struct IdentityResolver<'a, S: UserRepository> {
    store: &'a S,
}

impl<'a, S: UserRepository> IdentityResolver<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    #[instrument(skip(self, credentials))]
    pub fn resolve(&self, credentials: &Credentials) -> Result<Identity> {
        if let Some(session_id) = credentials.session_id {
            if let Some(session) = self.store.find_valid_session(session_id)? {
                if let Some(user) = self.store.find_user_by_id(session.user_id)? {
                    debug!(user_id = %user.id, "Resolved identity from session");
                    return Ok(user.into());
                }
            }
            debug!(%session_id, "Session invalid or expired, falling through");
        }

        if let Some(address) = credentials
            .wallet_address
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
        {
            return self.resolve_wallet(address).map(Identity::from);
        }

        self.mint_guest().map(Identity::from)
    }

    /// Existing wallet user, or a durable one created on first sight
    fn resolve_wallet(&self, address: &str) -> Result<User> {
        if let Some(user) = self.store.find_user_by_wallet(address)? {
            return Ok(user);
        }
        let user = User::wallet(address.to_string());
        self.store.create_user(&user)?;
        info!(user_id = %user.id, username = %user.username, "Created wallet identity");
        Ok(user)
    }

    fn mint_guest(&self) -> Result<User> {
        let user = User::guest(guest_username());
        self.store.create_user(&user)?;
        debug!(user_id = %user.id, "Minted guest identity");
        Ok(user)
    }
}

/// `guest_<millis>_<7 base36 chars>`
pub fn guest_username() -> String {
    let rng = rand::thread_rng();
    let suffix: String = rng
        .sample_iter(Uniform::new(0, BASE36.len()))
        .take(GUEST_SUFFIX_LEN)
        .map(|i| BASE36[i] as char)
        .collect();
    format!("{GUEST_PREFIX}{}_{suffix}", Utc::now().timestamp_millis())
}
