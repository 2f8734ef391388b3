//! Account-state checks and claim helpers.

use super::error::{ErrorCode, RecoveryError, Result};
use super::external::{ClaimStore, ClaimStoreError};
use super::user::UserIdentity;
use base64ct::{Base64, Encoding};
use sha2::{Digest, Sha256};
use std::{collections::HashMap, sync::Arc};
use tracing::instrument;

pub const ACCOUNT_LOCKED_CLAIM: &str = "http://wso2.org/claims/identity/accountLocked";
pub const ACCOUNT_DISABLED_CLAIM: &str = "http://wso2.org/claims/identity/accountDisabled";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AccountState {
    pub locked: bool,
    pub disabled: bool,
}

#[derive(Clone)]
pub struct AccountStateGuard {
    claims: Arc<dyn ClaimStore>,
}

impl AccountStateGuard {
    pub fn new(claims: Arc<dyn ClaimStore>) -> Self {
        Self { claims }
    }

    /// # Errors
    /// Server error when the realm, user store or claims cannot be loaded.
    pub async fn is_locked(&self, user: &UserIdentity) -> Result<bool> {
        self.flag(user, ACCOUNT_LOCKED_CLAIM).await
    }

    /// # Errors
    /// Server error when the realm, user store or claims cannot be loaded.
    pub async fn is_disabled(&self, user: &UserIdentity) -> Result<bool> {
        self.flag(user, ACCOUNT_DISABLED_CLAIM).await
    }

    /// Both flags, read fresh.
    ///
    /// # Errors
    /// Same as [`AccountStateGuard::is_locked`].
    pub async fn account_state(&self, user: &UserIdentity) -> Result<AccountState> {
        Ok(AccountState {
            locked: self.is_locked(user).await?,
            disabled: self.is_disabled(user).await?,
        })
    }

    /// Value of `claim_uri`, or an empty string when not set.
    ///
    /// # Errors
    /// Server error when the claim backend fails.
    pub async fn get_claim(&self, user: &UserIdentity, claim_uri: &str) -> Result<String> {
        let values = self
            .claims
            .get_claims(&user.tenant_domain, &user.qualified_username(), &[claim_uri])
            .await
            .map_err(|e| claim_store_error(user, e))?;
        Ok(values.get(claim_uri).cloned().unwrap_or_default())
    }

    /// Write `claim_uri` only when the stored value differs.
    ///
    /// Returns whether a write happened.
    ///
    /// # Errors
    /// Server error when the claim backend fails.
    #[instrument(skip(self, value), fields(user = %user))]
    pub async fn set_claim(&self, user: &UserIdentity, claim_uri: &str, value: &str) -> Result<bool> {
        let current = self
            .claims
            .get_claims(&user.tenant_domain, &user.qualified_username(), &[claim_uri])
            .await
            .map_err(|e| claim_store_error(user, e))?;

        if current.get(claim_uri).map(String::as_str) == Some(value) {
            return Ok(false);
        }

        self.claims
            .set_claims(
                &user.tenant_domain,
                &user.qualified_username(),
                HashMap::from([(claim_uri.to_string(), value.to_string())]),
            )
            .await
            .map_err(|e| claim_store_error(user, e))?;

        Ok(true)
    }

    async fn flag(&self, user: &UserIdentity, claim_uri: &str) -> Result<bool> {
        let value = self.get_claim(user, claim_uri).await?;
        Ok(parse_flag(&value))
    }
}

/// Permissive boolean: only a case-insensitive `true` is true.
#[must_use]
pub fn parse_flag(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

/// SHA-256 of `value`, standard base64.
#[must_use]
pub fn hash_value(value: &str) -> String {
    Base64::encode_string(&Sha256::digest(value.as_bytes()))
}

fn claim_store_error(user: &UserIdentity, source: ClaimStoreError) -> RecoveryError {
    match &source {
        ClaimStoreError::RealmUnavailable(_) => RecoveryError::new(
            ErrorCode::FailedToLoadRealmService,
            format!("Failed to retrieve user realm from tenant id: {}", user.tenant_domain),
        ),
        ClaimStoreError::UserStoreUnavailable(_) => RecoveryError::new(
            ErrorCode::FailedToLoadUserStoreManager,
            "Failed to retrieve user store manager.",
        ),
        ClaimStoreError::ClaimsUnavailable(_) => RecoveryError::new(
            ErrorCode::FailedToLoadUserClaims,
            "Failed to load user claims.",
        ),
    }
    .with_source(source)
}
