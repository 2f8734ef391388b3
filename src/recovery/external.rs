//! Seams to the platform services the recovery core depends on.
//!
//! Implementations live outside this crate in production; [`super::memory`]
//! provides an in-process one for standalone runs and tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("user directory unavailable: {0}")]
    Unavailable(String),
}

/// Failures reaching the claim backend. A claim that is simply not set is
/// never an error; it is absent from the returned map.
#[derive(Debug, Error)]
pub enum ClaimStoreError {
    #[error("failed to load realm for tenant {0}")]
    RealmUnavailable(String),
    #[error("failed to load user store manager: {0}")]
    UserStoreUnavailable(String),
    #[error("failed to load user claims: {0}")]
    ClaimsUnavailable(String),
}

#[derive(Debug, Error)]
pub enum GovernanceError {
    #[error("governance configuration unavailable: {0}")]
    Unavailable(String),
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ConfigProperty {
    pub name: String,
    pub value: String,
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Every account in the tenant whose name matches `username`, as
    /// store-domain qualified names (`DOMAIN/username`).
    async fn list_matching_users(
        &self,
        tenant_domain: &str,
        username: &str,
    ) -> Result<Vec<String>, DirectoryError>;
}

#[async_trait]
pub trait ClaimStore: Send + Sync {
    async fn get_claims(
        &self,
        tenant_domain: &str,
        qualified_username: &str,
        claim_uris: &[&str],
    ) -> Result<HashMap<String, String>, ClaimStoreError>;

    async fn set_claims(
        &self,
        tenant_domain: &str,
        qualified_username: &str,
        claims: HashMap<String, String>,
    ) -> Result<(), ClaimStoreError>;
}

#[async_trait]
pub trait GovernanceConfig: Send + Sync {
    /// Per-tenant connector settings for the requested keys. Unknown keys
    /// are omitted from the result.
    async fn get_config(
        &self,
        tenant_domain: &str,
        keys: &[&str],
    ) -> Result<Vec<ConfigProperty>, GovernanceError>;
}
