//! Tenant-scoped user identities and username disambiguation.

use super::error::{ErrorCode, RecoveryError, Result};
use super::external::UserDirectory;
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};
use tracing::{debug, instrument};

pub const SUPER_TENANT_DOMAIN: &str = "carbon.super";
pub const PRIMARY_DOMAIN: &str = "PRIMARY";
const DOMAIN_SEPARATOR: char = '/';

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct UserIdentity {
    pub username: String,
    pub tenant_domain: String,
    pub user_store_domain: Option<String>,
}

impl UserIdentity {
    /// Identity in `tenant_domain` (blank → super tenant). A trailing
    /// `@tenant` matching the tenant is stripped from the username.
    #[must_use]
    pub fn new(username: &str, tenant_domain: &str) -> Self {
        let tenant_domain = normalize_tenant(tenant_domain);
        Self {
            username: tenant_aware_username(username, &tenant_domain),
            tenant_domain,
            user_store_domain: None,
        }
    }

    #[must_use]
    pub fn with_user_store_domain(mut self, domain: &str) -> Self {
        let domain = domain.trim();
        self.user_store_domain = (!domain.is_empty()).then(|| domain.to_uppercase());
        self
    }

    /// Store-domain qualified name as the claim backend expects it.
    #[must_use]
    pub fn qualified_username(&self) -> String {
        add_domain_to_name(&self.username, self.user_store_domain.as_deref())
    }
}

impl fmt::Display for UserIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.qualified_username(), self.tenant_domain)
    }
}

/// Blank or whitespace-only tenants resolve to the super tenant.
#[must_use]
pub fn normalize_tenant(tenant_domain: &str) -> String {
    let trimmed = tenant_domain.trim();
    if trimmed.is_empty() {
        SUPER_TENANT_DOMAIN.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Prefix `username` with its store domain, leaving primary-store users bare.
#[must_use]
pub fn add_domain_to_name(username: &str, domain: Option<&str>) -> String {
    match domain.map(str::trim) {
        Some(domain) if !domain.is_empty() && !domain.eq_ignore_ascii_case(PRIMARY_DOMAIN) => {
            format!("{}{DOMAIN_SEPARATOR}{username}", domain.to_uppercase())
        }
        _ => username.to_string(),
    }
}

/// Store domain of a qualified name; unqualified names are in `PRIMARY`.
#[must_use]
pub fn extract_domain_from_name(qualified: &str) -> String {
    qualified
        .split_once(DOMAIN_SEPARATOR)
        .map_or_else(|| PRIMARY_DOMAIN.to_string(), |(domain, _)| domain.to_uppercase())
}

fn tenant_aware_username(username: &str, tenant_domain: &str) -> String {
    let username = username.trim();
    match username.rsplit_once('@') {
        Some((name, tenant)) if tenant.eq_ignore_ascii_case(tenant_domain) && !name.is_empty() => {
            name.to_string()
        }
        _ => username.to_string(),
    }
}

/// Turns a bare username plus optional hints into exactly one identity.
#[derive(Clone)]
pub struct UserResolver {
    directory: Arc<dyn UserDirectory>,
}

impl UserResolver {
    pub fn new(directory: Arc<dyn UserDirectory>) -> Self {
        Self { directory }
    }

    /// Resolve `username` within `tenant_domain`.
    ///
    /// A non-blank `realm` is trusted as the user store domain. Otherwise the
    /// directory is searched: no match is `user_not_found`, more than one is
    /// `multiple_users_matching`.
    ///
    /// # Errors
    /// Client errors for zero/many matches, `failed_to_load_realm_service` when
    /// the directory itself fails.
    #[instrument(skip(self))]
    pub async fn resolve(
        &self,
        username: &str,
        tenant_domain: &str,
        realm: &str,
    ) -> Result<UserIdentity> {
        let user = UserIdentity::new(username, tenant_domain);

        if !realm.trim().is_empty() {
            return Ok(user.with_user_store_domain(realm));
        }

        let matches = self
            .directory
            .list_matching_users(&user.tenant_domain, &user.username)
            .await
            .map_err(|e| {
                RecoveryError::new(
                    ErrorCode::FailedToLoadRealmService,
                    format!("Failed to search users in tenant {}", user.tenant_domain),
                )
                .with_source(e)
            })?;

        match matches.as_slice() {
            [] => {
                let err = RecoveryError::user_not_found(&user.username);
                debug!("{}", err.message());
                Err(err)
            }
            [qualified] => {
                let domain = extract_domain_from_name(qualified);
                Ok(user.with_user_store_domain(&domain))
            }
            _ => {
                let err = RecoveryError::multiple_users_matching(&user.username);
                debug!("{}", err.message());
                Err(err)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::recovery::memory::{InMemoryDirectory, StoredUser};

    fn directory(users: &[(&str, &str, &str)]) -> Arc<InMemoryDirectory> {
        let directory = InMemoryDirectory::default();
        for (tenant, domain, name) in users {
            directory.insert_user(StoredUser::new(*tenant, *domain, *name));
        }
        Arc::new(directory)
    }

    #[test]
    fn blank_tenant_defaults_to_super() {
        assert_eq!(normalize_tenant("   "), SUPER_TENANT_DOMAIN);
        assert_eq!(normalize_tenant(""), SUPER_TENANT_DOMAIN);
        assert_eq!(normalize_tenant(" acme.com "), "acme.com");
    }

    #[test]
    fn qualified_names() {
        assert_eq!(add_domain_to_name("alice", None), "alice");
        assert_eq!(add_domain_to_name("alice", Some("primary")), "alice");
        assert_eq!(add_domain_to_name("alice", Some("ldap")), "LDAP/alice");
        assert_eq!(extract_domain_from_name("LDAP/alice"), "LDAP");
        assert_eq!(extract_domain_from_name("alice"), PRIMARY_DOMAIN);
    }

    #[test]
    fn tenant_suffix_is_stripped() {
        let user = UserIdentity::new("alice@acme.com", "acme.com");
        assert_eq!(user.username, "alice");
        let user = UserIdentity::new("alice@other.com", "acme.com");
        assert_eq!(user.username, "alice@other.com");
    }

    #[tokio::test]
    async fn single_match_populates_store_domain() {
        let resolver = UserResolver::new(directory(&[("carbon.super", "LDAP", "alice")]));
        let user = resolver.resolve("alice", "", "").await.unwrap();
        assert_eq!(user.tenant_domain, SUPER_TENANT_DOMAIN);
        assert_eq!(user.user_store_domain.as_deref(), Some("LDAP"));
        assert_eq!(user.qualified_username(), "LDAP/alice");
    }

    #[tokio::test]
    async fn primary_match_populates_primary() {
        let resolver = UserResolver::new(directory(&[("carbon.super", "PRIMARY", "alice")]));
        let user = resolver.resolve("alice", "", "").await.unwrap();
        assert_eq!(user.user_store_domain.as_deref(), Some(PRIMARY_DOMAIN));
        assert_eq!(user.qualified_username(), "alice");
    }

    #[tokio::test]
    async fn zero_matches_is_not_found() {
        let resolver = UserResolver::new(directory(&[]));
        let err = resolver.resolve("alice", "", "").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::UserNotFound);
        assert!(err.message().contains("alice"));
    }

    #[tokio::test]
    async fn many_matches_is_ambiguous() {
        let resolver = UserResolver::new(directory(&[
            ("carbon.super", "PRIMARY", "alice"),
            ("carbon.super", "LDAP", "alice"),
            ("carbon.super", "AD", "alice"),
        ]));
        let err = resolver.resolve("alice", "", "").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::MultipleUsersMatching);
    }

    #[tokio::test]
    async fn matches_are_tenant_scoped() {
        let resolver = UserResolver::new(directory(&[
            ("carbon.super", "PRIMARY", "alice"),
            ("acme.com", "LDAP", "alice"),
        ]));
        let user = resolver.resolve("alice", "acme.com", "").await.unwrap();
        assert_eq!(user.user_store_domain.as_deref(), Some("LDAP"));
    }

    #[tokio::test]
    async fn explicit_realm_skips_lookup() {
        let resolver = UserResolver::new(directory(&[]));
        let user = resolver.resolve("alice", "acme.com", "ldap").await.unwrap();
        assert_eq!(user.user_store_domain.as_deref(), Some("LDAP"));
        assert_eq!(user.tenant_domain, "acme.com");
    }

    #[tokio::test]
    async fn directory_outage_is_server_error() {
        let directory = directory(&[("carbon.super", "PRIMARY", "alice")]);
        directory.set_directory_offline(true);
        let resolver = UserResolver::new(directory.clone());

        let err = resolver.resolve("alice", "", "").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::FailedToLoadRealmService);
        assert!(!err.is_client());
        assert!(err.message().contains(SUPER_TENANT_DOMAIN));
        assert!(err.chain().contains("user directory is offline"), "{}", err.chain());

        // An explicit realm never touches the directory.
        let user = resolver.resolve("alice", "", "primary").await.unwrap();
        assert_eq!(user.qualified_username(), "alice");
    }
}
