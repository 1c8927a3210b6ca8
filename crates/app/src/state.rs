//! Operator state: configuration, database and provider wiring

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use tracing::{info, warn};
use uuid::Uuid;

use jeetspace_core::{
    Config, Credentials, Database, Identity, MediaProvider, MediaRoom, RoomService,
};
use jeetspace_net::DailyClient;

/// Everything a command needs
pub struct AppState {
    pub service: RoomService<Database>,
    pub db_path: PathBuf,
}

impl AppState {
    /// Load config, open the database and connect the provider
    pub fn new(config_path: Option<&Path>) -> Result<Self> {
        let config = Config::load(config_path).context("Failed to load configuration")?;
        let db_path = config.database_path()?;

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let db = Database::open(&db_path)
            .with_context(|| format!("Failed to open database {}", db_path.display()))?;
        info!(path = %db_path.display(), "Database opened");

        let provider: Arc<dyn MediaProvider> = match DailyClient::new(&config.provider) {
            Ok(client) => Arc::new(client),
            Err(e) => {
                warn!("Media provider disabled: {}", e);
                Arc::new(DisabledProvider {
                    reason: e.to_string(),
                })
            }
        };

        Ok(Self::with_parts(db, provider, config, db_path))
    }

    pub fn with_parts(
        db: Database,
        provider: Arc<dyn MediaProvider>,
        config: Config,
        db_path: PathBuf,
    ) -> Self {
        Self {
            service: RoomService::new(db, provider, config),
            db_path,
        }
    }

    /// The configured admin, resolved as a wallet identity
    pub fn admin(&self) -> Result<Identity> {
        let wallet = self
            .service
            .config()
            .admin_wallet()
            .ok_or_else(|| anyhow!("admin.wallet_address is not configured"))?
            .to_string();
        Ok(self.service.resolve(&Credentials::wallet(wallet))?)
    }

    /// Act as the given wallet, or the admin when none is given
    pub fn actor(&self, wallet: Option<&str>) -> Result<Identity> {
        match wallet {
            Some(wallet) => Ok(self.service.resolve(&Credentials::wallet(wallet))?),
            None => self.admin(),
        }
    }
}

/// Stand-in when no API key is configured. Local commands keep working;
/// anything that needs the provider fails with `ProviderUnavailable`.
struct DisabledProvider {
    reason: String,
}

impl DisabledProvider {
    fn unavailable(&self) -> jeetspace_core::Error {
        jeetspace_core::Error::ProviderUnavailable(self.reason.clone())
    }
}

#[async_trait]
impl MediaProvider for DisabledProvider {
    async fn create_room(&self, _name: &str, _capacity: u32) -> jeetspace_core::Result<MediaRoom> {
        Err(self.unavailable())
    }

    async fn mint_join_token(
        &self,
        _external_url: &str,
        _user_id: Uuid,
        _display_name: &str,
    ) -> jeetspace_core::Result<String> {
        Err(self.unavailable())
    }

    async fn eject_session(
        &self,
        _external_url: &str,
        _session_id: &str,
    ) -> jeetspace_core::Result<()> {
        Err(self.unavailable())
    }
}
