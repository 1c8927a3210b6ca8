//! Scriptable in-memory provider for service tests

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use super::{MediaProvider, MediaRoom};
use crate::error::{Error, Result};

#[derive(Default)]
pub struct FakeProvider {
    pub fail_create: AtomicBool,
    pub fail_tokens: AtomicBool,
    pub fail_eject: AtomicBool,
    pub rooms_created: AtomicUsize,
    pub created_names: Mutex<Vec<String>>,
    pub ejected: Mutex<Vec<(String, String)>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_tokens() -> Self {
        let provider = Self::default();
        provider.fail_tokens.store(true, Ordering::SeqCst);
        provider
    }

    pub fn ejected(&self) -> Vec<(String, String)> {
        self.ejected.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaProvider for FakeProvider {
    async fn create_room(&self, sanitized_name: &str, _capacity: u32) -> Result<MediaRoom> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(Error::ProviderUnavailable("fake provider is down".into()));
        }
        let n = self.rooms_created.fetch_add(1, Ordering::SeqCst);
        let name = format!("{sanitized_name}-{n}");
        self.created_names.lock().unwrap().push(sanitized_name.to_string());
        Ok(MediaRoom {
            url: format!("https://fake.daily.co/{name}"),
            name,
        })
    }

    async fn mint_join_token(
        &self,
        external_url: &str,
        user_id: Uuid,
        _display_name: &str,
    ) -> Result<String> {
        if self.fail_tokens.load(Ordering::SeqCst) {
            return Err(Error::TokenUnavailable("fake tokens are down".into()));
        }
        Ok(format!("token:{external_url}:{user_id}"))
    }

    async fn eject_session(&self, external_url: &str, session_id: &str) -> Result<()> {
        if self.fail_eject.load(Ordering::SeqCst) {
            return Err(Error::ProviderUnavailable("fake eject failed".into()));
        }
        self.ejected
            .lock()
            .unwrap()
            .push((external_url.to_string(), session_id.to_string()));
        Ok(())
    }
}
