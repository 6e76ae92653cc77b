use crate::error::{CliError, Result};
use std::fs::File;
use std::path::Path;
use tracing_subscriber::{
    filter::{LevelFilter, Targets},
    fmt::{self},
    prelude::*,
};

/// Target prefix shared by the planner library and this binary.
const PLANNER_TARGET: &str = "trackplan";

pub fn level_for(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::ERROR;
    }
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Planner events follow `level`; other crates never go below warnings.
pub fn planner_filter(level: LevelFilter) -> Targets {
    Targets::new()
        .with_target(PLANNER_TARGET, level)
        .with_default(level.min(LevelFilter::WARN))
}

/// Installs the global subscriber.
///
/// The console follows `-v`/`--quiet`. A log file, when given, always records
/// the search at debug level or finer so a quiet run can still be diagnosed.
pub fn setup_logging(verbosity: u8, quiet: bool, log_file: Option<&Path>) -> Result<()> {
    let level = level_for(verbosity, quiet);

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false)
        .compact()
        .with_filter(planner_filter(level));

    let subscriber = tracing_subscriber::registry().with(stderr_layer);

    if let Some(path) = log_file {
        let file = File::create(path).map_err(CliError::Io)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_thread_ids(true)
            .with_target(true)
            .with_filter(planner_filter(level.max(LevelFilter::DEBUG)));

        subscriber.with(file_layer).init();
    } else {
        subscriber.init();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::sync::Once;
    use tracing::{Level, debug, info, warn};

    static INIT: Once = Once::new();

    fn ensure_global_logger_is_set() {
        INIT.call_once(|| {
            setup_logging(3, false, None).expect("Failed to set up global logger for tests");
        });
    }

    #[test]
    fn quiet_keeps_errors_and_verbosity_raises_level() {
        assert_eq!(level_for(0, true), LevelFilter::ERROR);
        assert_eq!(level_for(0, false), LevelFilter::WARN);
        assert_eq!(level_for(1, false), LevelFilter::INFO);
        assert_eq!(level_for(2, false), LevelFilter::DEBUG);
        assert_eq!(level_for(7, false), LevelFilter::TRACE);
    }

    #[test]
    fn verbosity_applies_to_planner_targets_only() {
        let filter = planner_filter(LevelFilter::DEBUG);
        assert!(filter.would_enable("trackplan::workflows::generate", &Level::DEBUG));
        assert!(filter.would_enable("trackplan::commands::validate", &Level::INFO));
        assert!(!filter.would_enable("trackplan::engine::graph", &Level::TRACE));
        assert!(!filter.would_enable("rayon_core::registry", &Level::INFO));
        assert!(filter.would_enable("rayon_core::registry", &Level::WARN));
    }

    #[test]
    fn quiet_filter_silences_dependency_warnings() {
        let filter = planner_filter(level_for(0, true));
        assert!(filter.would_enable("trackplan::workflows::validate", &Level::ERROR));
        assert!(!filter.would_enable("trackplan::workflows::validate", &Level::WARN));
        assert!(!filter.would_enable("indicatif", &Level::WARN));
    }

    #[test]
    #[serial]
    fn global_logger_accepts_search_events() {
        ensure_global_logger_is_set();

        warn!(target: "trackplan::workflows::generate", "No catalogue piece fits on the board.");
        info!(target: "trackplan::workflows::generate", pieces = 3, "Starting layout generation.");
        debug!(target: "trackplan::workflows::generate", round = 1, "Beam round finished.");
    }

    #[test]
    #[serial]
    fn file_layer_keeps_planner_events_and_drops_chatty_dependencies() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_path = temp_dir.path().join("search.log");

        let file = File::create(&log_path).unwrap();
        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_thread_ids(true)
            .with_filter(planner_filter(LevelFilter::DEBUG));
        let subscriber = tracing_subscriber::registry().with(file_layer);

        tracing::subscriber::with_default(subscriber, || {
            debug!(target: "trackplan::workflows::generate", round = 4, "Beam round finished.");
            info!(target: "some_dependency", "Chatty dependency message.");
        });

        let content = std::fs::read_to_string(log_path).unwrap();
        assert!(content.contains("Beam round finished."));
        assert!(content.contains("round=4"));
        assert!(content.contains("ThreadId"));
        assert!(!content.contains("Chatty dependency message."));
    }

    #[test]
    #[serial]
    fn invalid_log_file_path_propagates_error() {
        let invalid_path = Path::new("/");

        if cfg!(unix) && invalid_path.is_dir() {
            let result = setup_logging(0, false, Some(invalid_path));
            assert!(matches!(result, Err(CliError::Io(_))));
        }
    }
}
