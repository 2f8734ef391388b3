use crate::{
    api,
    recovery::{
        AccountStateGuard, CatalogRecoveryManager, ChallengeQuestionCatalog, InMemoryDirectory,
        LocaleFilter, QuestionStore, RecoveryConfig, RecoveryPreconditionService, ServiceOptions,
        UserResolver,
    },
};
use anyhow::{Context, Result};
use std::{path::PathBuf, sync::Arc};
use tracing::{info, warn};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub questions_path: PathBuf,
    pub locale_filter: LocaleFilter,
    pub seed_defaults: bool,
    pub directory_file: Option<PathBuf>,
    pub service_options: ServiceOptions,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the directory fixture cannot be loaded, seeding fails, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let directory = match &args.directory_file {
        Some(path) => InMemoryDirectory::from_file(path)?,
        None => {
            warn!("No directory file configured, every lookup will report an unknown user");
            InMemoryDirectory::default()
        }
    };
    let directory = Arc::new(directory);

    let catalog = Arc::new(ChallengeQuestionCatalog::new(
        QuestionStore::new(args.questions_path),
        args.locale_filter,
    ));

    if args.seed_defaults {
        let seeded = catalog
            .seed_if_empty()
            .await
            .context("Failed to seed default challenge questions")?;
        info!("Seeded {} default challenge questions", seeded);
    }

    let guard = AccountStateGuard::new(directory.clone());
    let manager = Arc::new(CatalogRecoveryManager::new(
        catalog.clone(),
        guard.clone(),
        RecoveryConfig::new(directory.clone()),
    ));
    let service = RecoveryPreconditionService::new(
        UserResolver::new(directory),
        guard,
        manager,
        args.service_options,
    );

    api::new(args.port, api::AppState::new(catalog, service)).await
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        ("questions_file", args.questions_path.display().to_string()),
        ("locale_filter", args.locale_filter.as_str().to_string()),
        ("seed_defaults", args.seed_defaults.to_string()),
        (
            "directory_file",
            args.directory_file
                .as_ref()
                .map_or_else(|| "none".to_string(), |p| p.display().to_string()),
        ),
        (
            "enforce_account_state",
            args.service_options.enforce_account_state().to_string(),
        ),
        (
            "challenge_timeout",
            format!("{}s", args.service_options.challenge_timeout().as_secs()),
        ),
    ];

    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = String::from("Startup configuration:");
    for (key, value) in &entries {
        message.push_str(&format!("\n  {key:<max_key_len$} : {value}"));
    }
    info!("{message}");
}
