use clap::{Arg, ArgAction, Command};

pub const ARG_VERBOSITY: &str = "verbosity";

const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Accept a level name or its numeric position (0-5) from `RECOVERY_LOG_LEVEL`.
///
/// # Errors
/// Returns an error for anything that is neither.
pub fn parse_log_level(level: &str) -> Result<u8, String> {
    if let Ok(parsed) = level.parse::<u8>() {
        if parsed <= 5 {
            return Ok(parsed);
        }
    }

    LEVELS
        .iter()
        .position(|name| name.eq_ignore_ascii_case(level.trim()))
        .and_then(|index| u8::try_from(index).ok())
        .ok_or_else(|| format!("invalid log level: {level}"))
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
            .env("RECOVERY_LOG_LEVEL")
            .global(true)
            .action(ArgAction::Count)
            .value_parser(parse_log_level),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_and_numbers() {
        assert_eq!(parse_log_level("error"), Ok(0));
        assert_eq!(parse_log_level("DEBUG"), Ok(3));
        assert_eq!(parse_log_level("5"), Ok(5));
        assert!(parse_log_level("6").is_err());
        assert!(parse_log_level("loud").is_err());
    }
}
