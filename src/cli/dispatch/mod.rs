//! Maps validated CLI arguments to the action to run.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{service, store, ARG_PORT};
use anyhow::Result;

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);

    let store_opts = store::Options::parse(matches)?;
    let service_opts = service::Options::parse(matches);

    Ok(Action::Server(Args {
        port,
        questions_path: store_opts.questions_path,
        locale_filter: store_opts.locale_filter,
        seed_defaults: store_opts.seed_defaults,
        directory_file: service_opts.directory_file.clone(),
        service_options: service_opts.service_options(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_home_without_questions_file_is_rejected() {
        temp_env::with_vars(
            [
                ("RECOVERY_HOME", Some(" ")),
                ("RECOVERY_QUESTIONS_FILE", None::<&str>),
            ],
            || {
                let matches = crate::cli::commands::new().get_matches_from(vec!["recovery"]);
                let result = handler(&matches);
                assert!(result.is_err());
                if let Err(err) = result {
                    assert!(err
                        .to_string()
                        .contains("missing required argument: --home"));
                }
            },
        );
    }

    #[test]
    fn server_action_carries_options() {
        temp_env::with_vars(
            [
                ("RECOVERY_HOME", None::<&str>),
                ("RECOVERY_PORT", None),
                ("RECOVERY_CHALLENGE_TIMEOUT_SECONDS", None),
            ],
            || {
                let matches = crate::cli::commands::new().get_matches_from(vec![
                    "recovery",
                    "--questions-file",
                    "/tmp/q.csv",
                    "--challenge-timeout-seconds",
                    "4",
                ]);
                let Ok(Action::Server(args)) = handler(&matches) else {
                    panic!("expected a server action");
                };
                assert_eq!(args.port, 8080);
                assert_eq!(args.questions_path, std::path::PathBuf::from("/tmp/q.csv"));
                assert_eq!(
                    args.service_options.challenge_timeout(),
                    std::time::Duration::from_secs(4)
                );
            },
        );
    }
}
