use crate::recovery::store::{LocaleFilter, QuestionStore, QUESTIONS_RELATIVE_PATH};
use clap::{builder::BoolishValueParser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;

pub const ARG_HOME: &str = "home";
pub const ARG_QUESTIONS_FILE: &str = "questions-file";
pub const ARG_LOCALE_FILTER: &str = "locale-filter";
pub const ARG_SEED_DEFAULTS: &str = "seed-defaults";

#[derive(Debug, Clone)]
pub struct Options {
    pub questions_path: PathBuf,
    pub locale_filter: LocaleFilter,
    pub seed_defaults: bool,
}

impl Options {
    /// Parse question store arguments from matches.
    ///
    /// An explicit `--questions-file` wins over `--home`.
    ///
    /// # Errors
    /// Returns an error if neither a home nor a questions file is available.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let questions_path = match matches.get_one::<String>(ARG_QUESTIONS_FILE) {
            Some(path) if !path.trim().is_empty() => PathBuf::from(path),
            _ => {
                let home = matches
                    .get_one::<String>(ARG_HOME)
                    .filter(|v| !v.trim().is_empty())
                    .ok_or_else(|| anyhow::anyhow!("missing required argument: --{ARG_HOME}"))?;
                QuestionStore::under_home(home).path().to_path_buf()
            }
        };

        Ok(Self {
            questions_path,
            locale_filter: matches
                .get_one::<LocaleFilter>(ARG_LOCALE_FILTER)
                .copied()
                .unwrap_or_default(),
            seed_defaults: matches
                .get_one::<bool>(ARG_SEED_DEFAULTS)
                .copied()
                .unwrap_or(false),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_HOME)
                .long(ARG_HOME)
                .help("Platform home directory")
                .long_help(format!(
                    "Platform home directory. The question file is read from <home>/{QUESTIONS_RELATIVE_PATH}."
                ))
                .env("RECOVERY_HOME")
                .default_value("."),
        )
        .arg(
            Arg::new(ARG_QUESTIONS_FILE)
                .long(ARG_QUESTIONS_FILE)
                .help("Path to the challenge question CSV file (overrides --home)")
                .env("RECOVERY_QUESTIONS_FILE"),
        )
        .arg(
            Arg::new(ARG_LOCALE_FILTER)
                .long(ARG_LOCALE_FILTER)
                .help("Locale-filtered reads return matching (default) or non-matching records")
                .env("RECOVERY_LOCALE_FILTER")
                .default_value("matching")
                .value_parser(|value: &str| value.parse::<LocaleFilter>()),
        )
        .arg(
            Arg::new(ARG_SEED_DEFAULTS)
                .long(ARG_SEED_DEFAULTS)
                .help("Write the default question sets when the question file is empty")
                .env("RECOVERY_SEED_DEFAULTS")
                .action(ArgAction::Set)
                .num_args(0..=1)
                .default_value("false")
                .default_missing_value("true")
                .value_parser(BoolishValueParser::new()),
        )
}
