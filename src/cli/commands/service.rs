use crate::recovery::ServiceOptions;
use clap::{builder::BoolishValueParser, Arg, ArgAction, ArgMatches, Command};
use std::{path::PathBuf, time::Duration};

pub const ARG_DIRECTORY_FILE: &str = "directory-file";
pub const ARG_ENFORCE_ACCOUNT_STATE: &str = "enforce-account-state";
pub const ARG_CHALLENGE_TIMEOUT_SECONDS: &str = "challenge-timeout-seconds";

#[derive(Debug, Clone)]
pub struct Options {
    pub directory_file: Option<PathBuf>,
    pub enforce_account_state: bool,
    pub challenge_timeout_seconds: u64,
}

impl Options {
    #[must_use]
    pub fn parse(matches: &ArgMatches) -> Self {
        Self {
            directory_file: matches.get_one::<String>(ARG_DIRECTORY_FILE).map(PathBuf::from),
            enforce_account_state: matches
                .get_one::<bool>(ARG_ENFORCE_ACCOUNT_STATE)
                .copied()
                .unwrap_or(true),
            challenge_timeout_seconds: matches
                .get_one::<u64>(ARG_CHALLENGE_TIMEOUT_SECONDS)
                .copied()
                .unwrap_or(10),
        }
    }

    #[must_use]
    pub fn service_options(&self) -> ServiceOptions {
        ServiceOptions::default()
            .with_enforce_account_state(self.enforce_account_state)
            .with_challenge_timeout(Duration::from_secs(self.challenge_timeout_seconds))
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_DIRECTORY_FILE)
                .long(ARG_DIRECTORY_FILE)
                .help("JSON fixture with users, claims and tenant recovery settings")
                .env("RECOVERY_DIRECTORY_FILE"),
        )
        .arg(
            Arg::new(ARG_ENFORCE_ACCOUNT_STATE)
                .long(ARG_ENFORCE_ACCOUNT_STATE)
                .help("Refuse recovery for locked or disabled accounts")
                .env("RECOVERY_ENFORCE_ACCOUNT_STATE")
                .action(ArgAction::Set)
                .num_args(0..=1)
                .default_value("true")
                .default_missing_value("true")
                .value_parser(BoolishValueParser::new()),
        )
        .arg(
            Arg::new(ARG_CHALLENGE_TIMEOUT_SECONDS)
                .long(ARG_CHALLENGE_TIMEOUT_SECONDS)
                .help("Upper bound for selecting a challenge question, in seconds")
                .env("RECOVERY_CHALLENGE_TIMEOUT_SECONDS")
                .default_value("10")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}
