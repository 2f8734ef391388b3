//! Challenge-question account recovery core.
//!
//! - [`user`]: tenant normalization and username disambiguation.
//! - [`catalog`] / [`store`]: the question registry and its CSV file.
//! - [`guard`]: lock/disable flags and other per-user claims.
//! - [`service`]: the recovery entry point and the default recovery manager.
//!
//! Identity infrastructure (directory, claims, governance config) is reached
//! through the traits in [`external`]; [`memory`] provides in-process
//! implementations.

pub mod catalog;
pub mod config;
pub mod context;
pub mod error;
pub mod external;
pub mod guard;
pub mod memory;
pub mod question;
pub mod service;
pub mod store;
pub mod user;

pub use self::catalog::ChallengeQuestionCatalog;
pub use self::config::RecoveryConfig;
pub use self::context::OperationContext;
pub use self::error::{ErrorCode, ErrorKind, RecoveryError};
pub use self::guard::{AccountState, AccountStateGuard};
pub use self::memory::InMemoryDirectory;
pub use self::question::ChallengeQuestion;
pub use self::service::{
    CatalogRecoveryManager, ChallengeQuestionResponse, RecoveryInitiation, RecoveryManager,
    RecoveryPreconditionService, ServiceOptions,
};
pub use self::store::{LocaleFilter, QuestionStore};
pub use self::user::{UserIdentity, UserResolver};
