//! Runtime configuration
//!
//! Loaded from an optional TOML file, then overridden by environment
//! variables. Every field has a default so an empty file is valid.

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{Error, Result};
use crate::models::User;

pub const ENV_API_KEY: &str = "DAILY_API_KEY";
pub const ENV_API_URL: &str = "DAILY_API_URL";
pub const ENV_ADMIN_EMAIL: &str = "ADMIN_EMAIL";
pub const ENV_ADMIN_WALLET: &str = "ADMIN_WALLET_ADDRESS";
pub const ENV_DATABASE_PATH: &str = "JEETSPACE_DB";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub provider: ProviderConfig,
    pub admin: AdminConfig,
    pub rooms: RoomsConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file; falls back to the platform data directory
    pub path: Option<PathBuf>,
}

/// Hosted media room provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    /// Lifetime of minted join tokens
    pub token_ttl_hours: i64,
    /// Capacity used when a room is created without one
    pub default_capacity: u32,
}

/// The out-of-band admin identity allowed to delete any room
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    pub email: Option<String>,
    pub wallet_address: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomsConfig {
    pub guest_host_fallback: GuestHostFallback,
}

/// How a guest requester may stand in for a guest host.
///
/// Guest identities are minted per request, so the creator of a guest-hosted
/// room comes back as a different user. These heuristics pick the stand-in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuestHostFallback {
    /// Only the recorded host counts
    Disabled,
    /// The earliest-joined active participant stands in
    EarliestActive,
    /// Like `EarliestActive`, but only while exactly one participant is active
    #[default]
    SoleActive,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.daily.co/v1".to_string(),
            api_key: None,
            token_ttl_hours: 24,
            default_capacity: 50,
        }
    }
}

impl Config {
    /// Load from a TOML file (if given) and apply environment overrides
    #[instrument]
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_toml(&fs::read_to_string(path)?)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|e| Error::Config(e.to_string()))
    }

    /// Apply overrides from a key lookup (the process environment in `load`)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get(ENV_API_KEY) {
            debug!("Provider API key taken from environment");
            self.provider.api_key = Some(key);
        }
        if let Some(url) = get(ENV_API_URL) {
            self.provider.api_url = url;
        }
        if let Some(email) = get(ENV_ADMIN_EMAIL) {
            self.admin.email = Some(email);
        }
        if let Some(wallet) = get(ENV_ADMIN_WALLET) {
            self.admin.wallet_address = Some(wallet);
        }
        if let Some(path) = get(ENV_DATABASE_PATH) {
            self.database.path = Some(PathBuf::from(path));
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.provider.default_capacity < crate::models::MIN_CAPACITY {
            return Err(Error::Config(format!(
                "provider.default_capacity must be at least {}",
                crate::models::MIN_CAPACITY
            )));
        }
        if self.provider.token_ttl_hours <= 0 {
            return Err(Error::Config(
                "provider.token_ttl_hours must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Resolved database path
    pub fn database_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.database.path {
            return Ok(path.clone());
        }
        let dirs = ProjectDirs::from("fun", "jeetspace", "jeetspace").ok_or_else(|| {
            Error::Config("Could not determine data directory".into())
        })?;
        Ok(dirs.data_dir().join("jeetspace.db"))
    }

    /// Whether a user is the configured admin
    pub fn is_admin(&self, user: &User) -> bool {
        let email_match = matches!(
            (&self.admin.email, &user.email),
            (Some(admin), Some(email)) if admin.eq_ignore_ascii_case(email)
        );
        let wallet_match = matches!(
            (&self.admin.wallet_address, &user.wallet_address),
            (Some(admin), Some(wallet)) if admin.eq_ignore_ascii_case(wallet)
        );
        email_match || wallet_match
    }

    /// The admin as a wallet identity, for operator tooling
    pub fn admin_wallet(&self) -> Option<&str> {
        self.admin.wallet_address.as_deref()
    }
}
