//! In-process user directory, claim store and governance config.
//!
//! Backs the standalone server (loaded from a JSON fixture) and the tests.

use super::external::{
    ClaimStore, ClaimStoreError, ConfigProperty, DirectoryError, GovernanceConfig,
    GovernanceError, UserDirectory,
};
use super::user::{add_domain_to_name, PRIMARY_DOMAIN};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        PoisonError, RwLock,
    },
};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct StoredUser {
    pub tenant_domain: String,
    #[serde(default = "primary_domain")]
    pub user_store_domain: String,
    pub username: String,
    #[serde(default)]
    pub claims: HashMap<String, String>,
}

fn primary_domain() -> String {
    PRIMARY_DOMAIN.to_string()
}

impl StoredUser {
    pub fn new(
        tenant_domain: impl Into<String>,
        user_store_domain: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            tenant_domain: tenant_domain.into(),
            user_store_domain: user_store_domain.into(),
            username: username.into(),
            claims: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_claim(mut self, uri: &str, value: &str) -> Self {
        self.claims.insert(uri.to_string(), value.to_string());
        self
    }

    fn qualified_username(&self) -> String {
        add_domain_to_name(&self.username, Some(&self.user_store_domain))
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct StoredConfig {
    pub tenant_domain: String,
    pub name: String,
    pub value: String,
}

/// Shape of the `--directory-file` fixture.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct DirectoryFixture {
    #[serde(default)]
    pub users: Vec<StoredUser>,
    #[serde(default)]
    pub config: Vec<StoredConfig>,
}

#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    users: RwLock<Vec<StoredUser>>,
    config: RwLock<Vec<StoredConfig>>,
    directory_offline: AtomicBool,
    claims_offline: AtomicBool,
    config_offline: AtomicBool,
}

impl InMemoryDirectory {
    #[must_use]
    pub fn from_fixture(fixture: DirectoryFixture) -> Self {
        Self {
            users: RwLock::new(fixture.users),
            config: RwLock::new(fixture.config),
            ..Self::default()
        }
    }

    /// Load a fixture from a JSON file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not a valid fixture.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read directory file: {}", path.display()))?;
        let fixture: DirectoryFixture = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid directory file: {}", path.display()))?;
        Ok(Self::from_fixture(fixture))
    }

    pub fn insert_user(&self, user: StoredUser) {
        self.users
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(user);
    }

    pub fn insert_config(&self, tenant_domain: &str, name: &str, value: &str) {
        self.config
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(StoredConfig {
                tenant_domain: tenant_domain.to_string(),
                name: name.to_string(),
                value: value.to_string(),
            });
    }

    /// Make user searches fail as if the directory were down.
    pub fn set_directory_offline(&self, offline: bool) {
        self.directory_offline.store(offline, Ordering::SeqCst);
    }

    /// Make every claim read/write fail as if the user store were down.
    pub fn set_claims_offline(&self, offline: bool) {
        self.claims_offline.store(offline, Ordering::SeqCst);
    }

    pub fn set_config_offline(&self, offline: bool) {
        self.config_offline.store(offline, Ordering::SeqCst);
    }

    fn tenant_known(users: &[StoredUser], tenant_domain: &str) -> bool {
        users
            .iter()
            .any(|user| user.tenant_domain.eq_ignore_ascii_case(tenant_domain))
    }

    fn find<'a>(
        users: &'a [StoredUser],
        tenant_domain: &str,
        qualified_username: &str,
    ) -> Option<&'a StoredUser> {
        users.iter().find(|user| {
            user.tenant_domain.eq_ignore_ascii_case(tenant_domain)
                && user.qualified_username() == qualified_username
        })
    }

    fn check_claims_online(&self) -> Result<(), ClaimStoreError> {
        if self.claims_offline.load(Ordering::SeqCst) {
            return Err(ClaimStoreError::UserStoreUnavailable(
                "user store is offline".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for InMemoryDirectory {
    async fn list_matching_users(
        &self,
        tenant_domain: &str,
        username: &str,
    ) -> Result<Vec<String>, DirectoryError> {
        if self.directory_offline.load(Ordering::SeqCst) {
            return Err(DirectoryError::Unavailable(
                "user directory is offline".to_string(),
            ));
        }
        let users = self.users.read().unwrap_or_else(PoisonError::into_inner);
        Ok(users
            .iter()
            .filter(|user| {
                user.tenant_domain.eq_ignore_ascii_case(tenant_domain) && user.username == username
            })
            .map(StoredUser::qualified_username)
            .collect())
    }
}

#[async_trait]
impl ClaimStore for InMemoryDirectory {
    async fn get_claims(
        &self,
        tenant_domain: &str,
        qualified_username: &str,
        claim_uris: &[&str],
    ) -> Result<HashMap<String, String>, ClaimStoreError> {
        self.check_claims_online()?;
        let users = self.users.read().unwrap_or_else(PoisonError::into_inner);
        if !Self::tenant_known(&users, tenant_domain) {
            return Err(ClaimStoreError::RealmUnavailable(tenant_domain.to_string()));
        }
        let user = Self::find(&users, tenant_domain, qualified_username).ok_or_else(|| {
            ClaimStoreError::ClaimsUnavailable(format!("user {qualified_username} not found"))
        })?;

        Ok(claim_uris
            .iter()
            .filter_map(|uri| {
                user.claims
                    .get(*uri)
                    .map(|value| ((*uri).to_string(), value.clone()))
            })
            .collect())
    }

    async fn set_claims(
        &self,
        tenant_domain: &str,
        qualified_username: &str,
        claims: HashMap<String, String>,
    ) -> Result<(), ClaimStoreError> {
        self.check_claims_online()?;
        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        if !Self::tenant_known(&users, tenant_domain) {
            return Err(ClaimStoreError::RealmUnavailable(tenant_domain.to_string()));
        }
        let user = users
            .iter_mut()
            .find(|user| {
                user.tenant_domain.eq_ignore_ascii_case(tenant_domain)
                    && user.qualified_username() == qualified_username
            })
            .ok_or_else(|| {
                ClaimStoreError::ClaimsUnavailable(format!("user {qualified_username} not found"))
            })?;
        user.claims.extend(claims);
        Ok(())
    }
}

#[async_trait]
impl GovernanceConfig for InMemoryDirectory {
    async fn get_config(
        &self,
        tenant_domain: &str,
        keys: &[&str],
    ) -> Result<Vec<ConfigProperty>, GovernanceError> {
        if self.config_offline.load(Ordering::SeqCst) {
            return Err(GovernanceError::Unavailable(
                "governance service is offline".to_string(),
            ));
        }
        let config = self.config.read().unwrap_or_else(PoisonError::into_inner);
        Ok(config
            .iter()
            .filter(|entry| {
                entry.tenant_domain.eq_ignore_ascii_case(tenant_domain)
                    && keys.contains(&entry.name.as_str())
            })
            .map(|entry| ConfigProperty {
                name: entry.name.clone(),
                value: entry.value.clone(),
            })
            .collect())
    }
}
