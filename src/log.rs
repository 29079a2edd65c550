//! Logging for the command-line program, built on `fern`.
//!
//! Informational messages go to stdout and warnings and errors to stderr, coloured when the stream
//! is a terminal. A run also writes two plain log files into its output folder: one with the
//! ordinary progress messages and one with only warnings and errors.
//!
//! The level is taken from the `OFFGRID_LOG_LEVEL` environment variable, then from
//! `settings.toml`, then [`DEFAULT_LOG_LEVEL`].
use anyhow::{Context, Result, anyhow, bail};
use chrono::Local;
use fern::colors::{Color, ColoredLevelConfig};
use fern::{Dispatch, FormatCallback};
use log::{Level, LevelFilter, Metadata, Record, debug};
use std::env;
use std::fmt::Arguments;
use std::fs::{File, OpenOptions};
use std::io::{self, IsTerminal};
use std::path::Path;
use std::sync::OnceLock;

/// Set once the logger has been installed
static LOGGER_INIT: OnceLock<()> = OnceLock::new();

/// The log level used if none is configured
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// The environment variable which overrides the log level
pub const LOG_LEVEL_ENV_VAR: &str = "OFFGRID_LOG_LEVEL";

/// Progress messages of a run
const LOG_INFO_FILE_NAME: &str = "offgrid_info.log";

/// Warnings and errors of a run
const LOG_ERROR_FILE_NAME: &str = "offgrid_error.log";

/// Whether the program logger has been initialised
pub fn is_logger_initialised() -> bool {
    LOGGER_INIT.get().is_some()
}

/// Convert a log level name (`off`, `error`, `warn`, `info`, `debug` or `trace`) to a
/// [`LevelFilter`]
pub fn parse_level(log_level: &str) -> Result<LevelFilter> {
    let level = match log_level.trim().to_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        unknown => bail!("Unknown log level: {unknown}"),
    };

    Ok(level)
}

/// Pick the log level from the environment, the settings file or the default, in that order
fn resolve_level(from_env: Option<&str>, from_settings: Option<&str>) -> Result<LevelFilter> {
    let (level, source) = match (from_env, from_settings) {
        (Some(level), _) => (level, LOG_LEVEL_ENV_VAR),
        (None, Some(level)) => (level, "settings.toml"),
        (None, None) => (DEFAULT_LOG_LEVEL, "default"),
    };

    parse_level(level).with_context(|| format!("Invalid log level in {source}"))
}

/// Whether solver output should be shown, given the log level from the environment.
///
/// Solver output is suppressed entirely when logging is turned off.
pub fn solver_output_enabled() -> bool {
    let level = env::var(LOG_LEVEL_ENV_VAR).map(|level| parse_level(&level));
    !matches!(level, Ok(Ok(LevelFilter::Off)))
}

/// Initialise the program logger.
///
/// # Arguments
///
/// * `log_level_from_settings` - The log level from `settings.toml`, if any
/// * `log_dir` - Folder to write log files to. No log files are written if this is `None`.
pub fn init(log_level_from_settings: Option<&str>, log_dir: Option<&Path>) -> Result<()> {
    let from_env = env::var(LOG_LEVEL_ENV_VAR).ok();
    let level = resolve_level(from_env.as_deref(), log_level_from_settings)?;

    let mut dispatch = Dispatch::new()
        .chain(console_output(level, Stream::Stdout))
        .chain(console_output(level.min(LevelFilter::Warn), Stream::Stderr));
    if let Some(log_dir) = log_dir {
        dispatch = dispatch
            .chain(
                file_output(&log_dir.join(LOG_INFO_FILE_NAME))?
                    .filter(|metadata| !is_warning_or_error(metadata))
                    .level(level.max(LevelFilter::Info)),
            )
            .chain(file_output(&log_dir.join(LOG_ERROR_FILE_NAME))?.level(LevelFilter::Warn));
    }

    dispatch.apply()?;
    LOGGER_INIT
        .set(())
        .map_err(|()| anyhow!("Logger already initialised"))?;
    debug!("Logging at level {level}");

    Ok(())
}

/// A console stream
#[derive(Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

fn is_warning_or_error(metadata: &Metadata) -> bool {
    metadata.level() <= Level::Warn
}

/// Log to the console, with colours if the stream is a terminal
fn console_output(level: LevelFilter, stream: Stream) -> Dispatch {
    let colours = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::Magenta);

    let dispatch = Dispatch::new().level(level);
    match stream {
        Stream::Stdout => {
            let colours = io::stdout().is_terminal().then_some(colours);
            dispatch
                .filter(|metadata| !is_warning_or_error(metadata))
                .format(move |out, message, record| {
                    write_line(out, message, record, colours.as_ref());
                })
                .chain(io::stdout())
        }
        Stream::Stderr => {
            let colours = io::stderr().is_terminal().then_some(colours);
            dispatch
                .format(move |out, message, record| {
                    write_line(out, message, record, colours.as_ref());
                })
                .chain(io::stderr())
        }
    }
}

/// Log to a new file, replacing any file from a previous run
fn file_output(file_path: &Path) -> Result<Dispatch> {
    let file: File = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(file_path)
        .with_context(|| format!("Could not create log file {}", file_path.display()))?;

    Ok(Dispatch::new()
        .format(|out, message, record| write_line(out, message, record, None))
        .chain(file))
}

/// Write one log line, e.g. `[14:02:11 INFO project] Found optimal solution`
fn write_line(
    out: FormatCallback,
    message: &Arguments,
    record: &Record,
    colours: Option<&ColoredLevelConfig>,
) {
    let timestamp = Local::now().format("%H:%M:%S");
    let target = module_name(record.target());
    match colours {
        Some(colours) => out.finish(format_args!(
            "[{timestamp} {} {target}] {message}",
            colours.color(record.level())
        )),
        None => out.finish(format_args!(
            "[{timestamp} {} {target}] {message}",
            record.level()
        )),
    }
}

/// The log target without the crate prefix
fn module_name(target: &str) -> &str {
    target.strip_prefix("offgrid::").unwrap_or(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("off", LevelFilter::Off)]
    #[case("WARN", LevelFilter::Warn)]
    #[case(" info ", LevelFilter::Info)]
    #[case("trace", LevelFilter::Trace)]
    fn test_parse_level(#[case] input: &str, #[case] expected: LevelFilter) {
        assert_eq!(parse_level(input).unwrap(), expected);
    }

    #[test]
    fn test_parse_level_unknown() {
        assert_eq!(
            parse_level("loud").unwrap_err().to_string(),
            "Unknown log level: loud"
        );
    }

    #[rstest]
    #[case(Some("debug"), Some("warn"), LevelFilter::Debug)]
    #[case(None, Some("warn"), LevelFilter::Warn)]
    #[case(None, None, LevelFilter::Info)]
    fn test_resolve_level(
        #[case] from_env: Option<&str>,
        #[case] from_settings: Option<&str>,
        #[case] expected: LevelFilter,
    ) {
        assert_eq!(resolve_level(from_env, from_settings).unwrap(), expected);
    }

    #[test]
    fn test_resolve_level_names_source() {
        let err = resolve_level(None, Some("loud")).unwrap_err();
        assert_eq!(err.to_string(), "Invalid log level in settings.toml");

        let err = resolve_level(Some("loud"), Some("info")).unwrap_err();
        assert_eq!(err.to_string(), "Invalid log level in OFFGRID_LOG_LEVEL");
    }

    #[rstest]
    #[case("offgrid::project", "project")]
    #[case("offgrid::solver::highs", "solver::highs")]
    #[case("offgrid", "offgrid")]
    fn test_module_name(#[case] target: &str, #[case] expected: &str) {
        assert_eq!(module_name(target), expected);
    }
}
