//! Entry point for security-question based password recovery.
//!
//! Flow:
//! 1) Normalize the tenant (blank → super tenant).
//! 2) Resolve the username to exactly one account.
//! 3) Refuse locked or disabled accounts.
//! 4) Hand the user to the [`RecoveryManager`] and map its outcome: "no
//!    challenge question configured" becomes [`RecoveryInitiation::NoContent`],
//!    client faults pass through, server faults and panics are logged and
//!    surfaced with their code (`unexpected` for panics and timeouts).

use super::catalog::ChallengeQuestionCatalog;
use super::config::{RecoveryConfig, QUESTION_RECOVERY_ENABLE};
use super::error::{ErrorCode, RecoveryError, Result};
use super::guard::AccountStateGuard;
use super::question::{ChallengeQuestion, LOCALE_EN_US};
use super::user::{UserIdentity, UserResolver};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use tokio::time::timeout;
use tracing::{debug, error, info, instrument};
use ulid::Ulid;
use utoipa::ToSchema;

pub const CHALLENGE_QUESTION_URIS_CLAIM: &str = "http://wso2.org/claims/challengeQuestionUris";
pub const STATUS_INCOMPLETE: &str = "INCOMPLETE";
const DEFAULT_CHALLENGE_TIMEOUT_SECONDS: u64 = 10;
const QUESTION_ANSWER_SEPARATOR: char = '!';
const QUESTION_URI_SEPARATOR: char = ',';

/// Question presented to the user plus the code that ties the answer to this attempt.
#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ChallengeQuestionResponse {
    pub code: String,
    pub question: ChallengeQuestion,
    pub status: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecoveryInitiation {
    Challenge(ChallengeQuestionResponse),
    /// The user has no challenge question configured.
    NoContent,
}

/// Password-recovery business logic that picks the question for a user.
#[async_trait]
pub trait RecoveryManager: Send + Sync {
    /// # Errors
    /// `challenge_question_not_found` when the user has none configured,
    /// other client or server errors as they occur.
    async fn initiate_challenge(&self, user: &UserIdentity) -> Result<ChallengeQuestionResponse>;
}

#[derive(Clone, Debug)]
pub struct ServiceOptions {
    enforce_account_state: bool,
    challenge_timeout: Duration,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            enforce_account_state: true,
            challenge_timeout: Duration::from_secs(DEFAULT_CHALLENGE_TIMEOUT_SECONDS),
        }
    }
}

impl ServiceOptions {
    #[must_use]
    pub fn with_enforce_account_state(mut self, enforce: bool) -> Self {
        self.enforce_account_state = enforce;
        self
    }

    #[must_use]
    pub fn with_challenge_timeout(mut self, timeout: Duration) -> Self {
        self.challenge_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn enforce_account_state(&self) -> bool {
        self.enforce_account_state
    }

    #[must_use]
    pub const fn challenge_timeout(&self) -> Duration {
        self.challenge_timeout
    }
}

#[derive(Clone)]
pub struct RecoveryPreconditionService {
    resolver: UserResolver,
    guard: AccountStateGuard,
    manager: Arc<dyn RecoveryManager>,
    options: ServiceOptions,
}

impl RecoveryPreconditionService {
    pub fn new(
        resolver: UserResolver,
        guard: AccountStateGuard,
        manager: Arc<dyn RecoveryManager>,
        options: ServiceOptions,
    ) -> Self {
        Self {
            resolver,
            guard,
            manager,
            options,
        }
    }

    /// Start question-based recovery for `username`.
    ///
    /// # Errors
    /// Client errors for resolution failures, locked/disabled accounts and
    /// client faults of the recovery manager; server errors otherwise.
    #[instrument(skip(self))]
    pub async fn initiate(
        &self,
        username: &str,
        tenant_hint: &str,
        realm_hint: &str,
    ) -> Result<RecoveryInitiation> {
        let result = self.run(username, tenant_hint, realm_hint).await;

        match &result {
            Ok(RecoveryInitiation::NoContent) => {
                debug!("no challenge question configured");
            }
            Ok(RecoveryInitiation::Challenge(_)) => {
                info!("challenge question initiated");
            }
            Err(err) if err.is_client() => {
                debug!(code = %err.code(), "{}", err.message());
            }
            Err(err) => {
                error!(code = %err.code(), "Error while initiating password recovery flow using security questions: {}", err.chain());
            }
        }

        result
    }

    async fn run(
        &self,
        username: &str,
        tenant_hint: &str,
        realm_hint: &str,
    ) -> Result<RecoveryInitiation> {
        let user = self.resolver.resolve(username, tenant_hint, realm_hint).await?;

        if self.options.enforce_account_state {
            if self.guard.is_locked(&user).await? {
                return Err(RecoveryError::new(
                    ErrorCode::AccountLocked,
                    format!("User account is locked: {}", user.username),
                ));
            }
            if self.guard.is_disabled(&user).await? {
                return Err(RecoveryError::new(
                    ErrorCode::AccountDisabled,
                    format!("User account is disabled: {}", user.username),
                ));
            }
        }

        match self.delegate(user).await {
            Ok(response) => Ok(RecoveryInitiation::Challenge(response)),
            Err(err) if err.code() == ErrorCode::ChallengeQuestionNotFound => {
                Ok(RecoveryInitiation::NoContent)
            }
            Err(err) => Err(err),
        }
    }

    /// Run the manager on its own task so a panic or a hang surfaces as
    /// `unexpected` instead of taking the request down with it.
    async fn delegate(&self, user: UserIdentity) -> Result<ChallengeQuestionResponse> {
        let manager = self.manager.clone();
        let mut handle = tokio::spawn(async move { manager.initiate_challenge(&user).await });

        match timeout(self.options.challenge_timeout, &mut handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => {
                Err(RecoveryError::unexpected("Recovery manager failed unexpectedly")
                    .with_source(join_error))
            }
            Err(elapsed) => {
                handle.abort();
                Err(RecoveryError::unexpected("Recovery manager timed out").with_source(elapsed))
            }
        }
    }
}

/// [`RecoveryManager`] backed by the user's claims and the question catalog.
///
/// The user's `challengeQuestionUris` claim lists the sets they answered;
/// each set uri is itself a claim holding `question!answer-hash`. The first
/// configured set is presented.
pub struct CatalogRecoveryManager {
    catalog: Arc<ChallengeQuestionCatalog>,
    claims: AccountStateGuard,
    config: RecoveryConfig,
}

impl CatalogRecoveryManager {
    pub fn new(
        catalog: Arc<ChallengeQuestionCatalog>,
        claims: AccountStateGuard,
        config: RecoveryConfig,
    ) -> Self {
        Self {
            catalog,
            claims,
            config,
        }
    }

    async fn lookup_question(&self, set_uri: &str, text: &str) -> Result<ChallengeQuestion> {
        let known = self
            .catalog
            .list_all()
            .await?
            .into_iter()
            .find(|q| q.question_set_id == set_uri && q.question == text);

        Ok(known.unwrap_or_else(|| ChallengeQuestion::new(set_uri, "", text, LOCALE_EN_US)))
    }
}

#[async_trait]
impl RecoveryManager for CatalogRecoveryManager {
    async fn initiate_challenge(&self, user: &UserIdentity) -> Result<ChallengeQuestionResponse> {
        if !self
            .config
            .flag(QUESTION_RECOVERY_ENABLE, &user.tenant_domain, true)
            .await?
        {
            return Err(RecoveryError::new(
                ErrorCode::QuestionRecoveryDisabled,
                "Security question based recovery is not enabled.",
            ));
        }

        let not_found = || {
            RecoveryError::new(
                ErrorCode::ChallengeQuestionNotFound,
                format!("Challenge questions not found for user: {}", user.username),
            )
        };

        let uris = self
            .claims
            .get_claim(user, CHALLENGE_QUESTION_URIS_CLAIM)
            .await?;
        let set_uri = uris
            .split(QUESTION_URI_SEPARATOR)
            .map(str::trim)
            .find(|uri| !uri.is_empty())
            .ok_or_else(not_found)?;

        let stored = self.claims.get_claim(user, set_uri).await?;
        let text = stored
            .split_once(QUESTION_ANSWER_SEPARATOR)
            .map_or(stored.as_str(), |(question, _)| question)
            .trim();
        if text.is_empty() {
            return Err(not_found());
        }

        Ok(ChallengeQuestionResponse {
            code: Ulid::new().to_string(),
            question: self.lookup_question(set_uri, text).await?,
            status: STATUS_INCOMPLETE.to_string(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::recovery::guard::{ACCOUNT_DISABLED_CLAIM, ACCOUNT_LOCKED_CLAIM};
    use crate::recovery::memory::{InMemoryDirectory, StoredUser};
    use crate::recovery::store::{LocaleFilter, QuestionStore};
    use tempfile::TempDir;

    const SET1: &str = "http://wso2.org/claims/challengeQuestion1";

    struct FixedManager(fn() -> Result<ChallengeQuestionResponse>);

    #[async_trait]
    impl RecoveryManager for FixedManager {
        async fn initiate_challenge(
            &self,
            _user: &UserIdentity,
        ) -> Result<ChallengeQuestionResponse> {
            (self.0)()
        }
    }

    struct PanickingManager;

    #[async_trait]
    impl RecoveryManager for PanickingManager {
        async fn initiate_challenge(
            &self,
            _user: &UserIdentity,
        ) -> Result<ChallengeQuestionResponse> {
            panic!("recovery manager exploded");
        }
    }

    struct SlowManager;

    #[async_trait]
    impl RecoveryManager for SlowManager {
        async fn initiate_challenge(
            &self,
            _user: &UserIdentity,
        ) -> Result<ChallengeQuestionResponse> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Err(RecoveryError::unexpected("unreachable"))
        }
    }

    fn sample_response() -> Result<ChallengeQuestionResponse> {
        Ok(ChallengeQuestionResponse {
            code: "code".to_string(),
            question: ChallengeQuestion::new(SET1, "question1", "City where you were born?", "en_US"),
            status: STATUS_INCOMPLETE.to_string(),
        })
    }

    fn directory() -> Arc<InMemoryDirectory> {
        let directory = Arc::new(InMemoryDirectory::default());
        directory.insert_user(StoredUser::new("carbon.super", "PRIMARY", "alice"));
        directory
    }

    fn service(
        directory: &Arc<InMemoryDirectory>,
        manager: Arc<dyn RecoveryManager>,
        options: ServiceOptions,
    ) -> RecoveryPreconditionService {
        RecoveryPreconditionService::new(
            UserResolver::new(directory.clone()),
            AccountStateGuard::new(directory.clone()),
            manager,
            options,
        )
    }

    #[tokio::test]
    async fn successful_challenge_is_returned() {
        let directory = directory();
        let service = service(
            &directory,
            Arc::new(FixedManager(sample_response)),
            ServiceOptions::default(),
        );
        let result = service.initiate("alice", "", "").await.unwrap();
        assert_eq!(result, RecoveryInitiation::Challenge(sample_response().unwrap()));
    }

    #[tokio::test]
    async fn unknown_user_short_circuits() {
        let directory = directory();
        let service = service(
            &directory,
            Arc::new(PanickingManager),
            ServiceOptions::default(),
        );
        let err = service.initiate("bob", "", "").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::UserNotFound);
    }

    #[tokio::test]
    async fn question_not_found_is_no_content() {
        let directory = directory();
        let service = service(
            &directory,
            Arc::new(FixedManager(|| {
                Err(RecoveryError::new(ErrorCode::ChallengeQuestionNotFound, "none"))
            })),
            ServiceOptions::default(),
        );
        assert_eq!(
            service.initiate("alice", "", "").await.unwrap(),
            RecoveryInitiation::NoContent
        );
    }

    #[tokio::test]
    async fn other_client_faults_pass_through() {
        let directory = directory();
        let service = service(
            &directory,
            Arc::new(FixedManager(|| {
                Err(RecoveryError::new(ErrorCode::QuestionRecoveryDisabled, "off"))
            })),
            ServiceOptions::default(),
        );
        let err = service.initiate("alice", "", "").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::QuestionRecoveryDisabled);
        assert!(err.is_client());
    }

    #[tokio::test]
    async fn panics_become_unexpected() {
        let directory = directory();
        let service = service(
            &directory,
            Arc::new(PanickingManager),
            ServiceOptions::default(),
        );
        let err = service.initiate("alice", "", "").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Unexpected);
        assert!(!err.is_client());
    }

    #[tokio::test]
    async fn hung_manager_times_out() {
        let directory = directory();
        let service = service(
            &directory,
            Arc::new(SlowManager),
            ServiceOptions::default().with_challenge_timeout(Duration::from_millis(20)),
        );
        let err = service.initiate("alice", "", "").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Unexpected);
    }

    #[tokio::test]
    async fn locked_and_disabled_accounts_are_refused() {
        let directory = Arc::new(InMemoryDirectory::default());
        directory.insert_user(
            StoredUser::new("carbon.super", "PRIMARY", "alice").with_claim(ACCOUNT_LOCKED_CLAIM, "true"),
        );
        directory.insert_user(
            StoredUser::new("carbon.super", "LDAP", "bob").with_claim(ACCOUNT_DISABLED_CLAIM, "true"),
        );
        let service = service(
            &directory,
            Arc::new(FixedManager(sample_response)),
            ServiceOptions::default(),
        );

        let err = service.initiate("alice", "", "").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::AccountLocked);
        let err = service.initiate("bob", "", "").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::AccountDisabled);
    }

    #[tokio::test]
    async fn account_state_check_can_be_disabled() {
        let directory = Arc::new(InMemoryDirectory::default());
        directory.insert_user(
            StoredUser::new("carbon.super", "PRIMARY", "alice").with_claim(ACCOUNT_LOCKED_CLAIM, "true"),
        );
        let service = service(
            &directory,
            Arc::new(FixedManager(sample_response)),
            ServiceOptions::default().with_enforce_account_state(false),
        );
        assert!(matches!(
            service.initiate("alice", "", "").await.unwrap(),
            RecoveryInitiation::Challenge(_)
        ));
    }

    #[tokio::test]
    async fn claim_store_outage_is_server_error() {
        let directory = directory();
        directory.set_claims_offline(true);
        let service = service(
            &directory,
            Arc::new(FixedManager(sample_response)),
            ServiceOptions::default(),
        );
        let err = service.initiate("alice", "", "").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::FailedToLoadUserStoreManager);
    }

    #[tokio::test]
    async fn directory_outage_passes_through() {
        let directory = directory();
        directory.set_directory_offline(true);
        let service = service(
            &directory,
            Arc::new(PanickingManager),
            ServiceOptions::default(),
        );

        let expected = UserResolver::new(directory.clone())
            .resolve("alice", "", "")
            .await
            .unwrap_err();
        let err = service.initiate("alice", "", "").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::FailedToLoadRealmService);
        assert_eq!(err.code(), expected.code());
        assert_eq!(err.message(), expected.message());
        assert!(!err.is_client());
    }

    async fn catalog_manager(
        dir: &TempDir,
        directory: &Arc<InMemoryDirectory>,
    ) -> CatalogRecoveryManager {
        let catalog = Arc::new(ChallengeQuestionCatalog::new(
            QuestionStore::new(dir.path().join("q.csv")),
            LocaleFilter::Matching,
        ));
        catalog.seed_if_empty().await.unwrap();
        CatalogRecoveryManager::new(
            catalog,
            AccountStateGuard::new(directory.clone()),
            RecoveryConfig::new(directory.clone()),
        )
    }

    #[tokio::test]
    async fn catalog_manager_picks_first_configured_set() {
        let dir = TempDir::new().unwrap();
        let directory = Arc::new(InMemoryDirectory::default());
        directory.insert_user(
            StoredUser::new("carbon.super", "PRIMARY", "alice")
                .with_claim(CHALLENGE_QUESTION_URIS_CLAIM, &format!(" {SET1} ,other"))
                .with_claim(SET1, "Favorite food?!c2VjcmV0"),
        );
        let manager = catalog_manager(&dir, &directory).await;
        let user = UserIdentity::new("alice", "").with_user_store_domain("PRIMARY");

        let response = manager.initiate_challenge(&user).await.unwrap();
        assert_eq!(response.question.question_id, "question3");
        assert_eq!(response.question.question_set_id, SET1);
        assert_eq!(response.status, STATUS_INCOMPLETE);
        assert!(Ulid::from_string(&response.code).is_ok());
    }

    #[tokio::test]
    async fn catalog_manager_without_questions_is_not_found() {
        let dir = TempDir::new().unwrap();
        let directory = directory();
        let manager = catalog_manager(&dir, &directory).await;
        let user = UserIdentity::new("alice", "").with_user_store_domain("PRIMARY");

        let err = manager.initiate_challenge(&user).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ChallengeQuestionNotFound);
    }

    #[tokio::test]
    async fn catalog_manager_respects_tenant_switch() {
        let dir = TempDir::new().unwrap();
        let directory = directory();
        directory.insert_config("carbon.super", QUESTION_RECOVERY_ENABLE, "false");
        let manager = catalog_manager(&dir, &directory).await;
        let user = UserIdentity::new("alice", "").with_user_store_domain("PRIMARY");

        let err = manager.initiate_challenge(&user).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::QuestionRecoveryDisabled);
    }
}
