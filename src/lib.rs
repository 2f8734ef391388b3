//! # Recovery (Challenge-Question Account Recovery)
//!
//! `recovery` starts password recovery with security questions for a
//! multi-tenant identity platform. Given a username and optional tenant and
//! user-store hints it resolves exactly one account, refuses locked or
//! disabled accounts, and hands the user to a recovery manager that picks the
//! question to present.
//!
//! ## Tenants and user stores
//!
//! A blank tenant means the super tenant (`carbon.super`). Usernames are
//! qualified as `DOMAIN/name`; the primary store (`PRIMARY`) is implicit. When
//! no user-store hint is given and the same name exists in several stores
//! the request is rejected instead of guessing.
//!
//! ## Question catalog
//!
//! Questions live in one CSV file per deployment
//! (`<home>/repository/conf/identity/challenge-questions.csv`). All writes go
//! through a single lock and replace the file atomically.
//!
//! ## Errors
//!
//! Every failure has a stable machine code. Client errors surface as `400`
//! with the code and message; server errors surface as `500` with a generic
//! message and are logged with their full cause.

pub mod api;
pub mod cli;
pub mod recovery;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
