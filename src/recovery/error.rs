//! Error taxonomy for the recovery core.
//!
//! Every failure carries a stable machine code and a human message. The
//! [`ErrorKind`] decides how the HTTP layer surfaces it and at which level
//! it gets logged: client errors are operationally normal, server errors
//! always carry their cause.

use std::fmt;
use thiserror::Error;

type Source = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// User-correctable; surfaced as 400.
    Client,
    /// Infrastructure or unexpected; surfaced as 500 with a generic message.
    Server,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    UserNotFound,
    MultipleUsersMatching,
    MalformedChallengeQuestion,
    ChallengeQuestionNotFound,
    AccountLocked,
    AccountDisabled,
    QuestionRecoveryDisabled,
    InvalidRequest,
    FailedToLoadRealmService,
    FailedToLoadUserStoreManager,
    FailedToLoadUserClaims,
    IssueInLoadingRecoveryConfigs,
    QuestionStoreIo,
    Unexpected,
}

impl ErrorCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UserNotFound => "user_not_found",
            Self::MultipleUsersMatching => "multiple_users_matching",
            Self::MalformedChallengeQuestion => "malformed_challenge_question",
            Self::ChallengeQuestionNotFound => "challenge_question_not_found",
            Self::AccountLocked => "account_locked",
            Self::AccountDisabled => "account_disabled",
            Self::QuestionRecoveryDisabled => "question_recovery_disabled",
            Self::InvalidRequest => "invalid_request",
            Self::FailedToLoadRealmService => "failed_to_load_realm_service",
            Self::FailedToLoadUserStoreManager => "failed_to_load_user_store_manager",
            Self::FailedToLoadUserClaims => "failed_to_load_user_claims",
            Self::IssueInLoadingRecoveryConfigs => "issue_in_loading_recovery_configs",
            Self::QuestionStoreIo => "question_store_io",
            Self::Unexpected => "unexpected",
        }
    }

    #[must_use]
    pub const fn kind(self) -> ErrorKind {
        match self {
            Self::UserNotFound
            | Self::MultipleUsersMatching
            | Self::MalformedChallengeQuestion
            | Self::ChallengeQuestionNotFound
            | Self::AccountLocked
            | Self::AccountDisabled
            | Self::QuestionRecoveryDisabled
            | Self::InvalidRequest => ErrorKind::Client,
            Self::FailedToLoadRealmService
            | Self::FailedToLoadUserStoreManager
            | Self::FailedToLoadUserClaims
            | Self::IssueInLoadingRecoveryConfigs
            | Self::QuestionStoreIo
            | Self::Unexpected => ErrorKind::Server,
        }
    }

    /// Look up a code from its wire form (`user_not_found`, ...).
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        [
            Self::UserNotFound,
            Self::MultipleUsersMatching,
            Self::MalformedChallengeQuestion,
            Self::ChallengeQuestionNotFound,
            Self::AccountLocked,
            Self::AccountDisabled,
            Self::QuestionRecoveryDisabled,
            Self::InvalidRequest,
            Self::FailedToLoadRealmService,
            Self::FailedToLoadUserStoreManager,
            Self::FailedToLoadUserClaims,
            Self::IssueInLoadingRecoveryConfigs,
            Self::QuestionStoreIo,
            Self::Unexpected,
        ]
        .into_iter()
        .find(|candidate| candidate.as_str() == code)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("{code}: {message}")]
pub struct RecoveryError {
    code: ErrorCode,
    message: String,
    #[source]
    source: Option<Source>,
}

impl RecoveryError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    #[must_use]
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn user_not_found(username: &str) -> Self {
        Self::new(
            ErrorCode::UserNotFound,
            format!("Unable to find an user with username: {username} in the system."),
        )
    }

    pub fn multiple_users_matching(username: &str) -> Self {
        Self::new(
            ErrorCode::MultipleUsersMatching,
            format!(
                "There are multiple users with username: {username} in the system, please send the correct user-store domain along with the username."
            ),
        )
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unexpected, message)
    }

    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        self.code
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.code.kind()
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub const fn is_client(&self) -> bool {
        matches!(self.code.kind(), ErrorKind::Client)
    }

    /// Full cause chain, outermost first, joined with `: `.
    #[must_use]
    pub fn chain(&self) -> String {
        let mut out = self.to_string();
        let mut current = std::error::Error::source(self);
        while let Some(cause) = current {
            out.push_str(": ");
            out.push_str(&cause.to_string());
            current = cause.source();
        }
        out
    }
}

pub type Result<T, E = RecoveryError> = std::result::Result<T, E>;
