//! Integration tests for the `validate` command.
use offgrid::cli::handle_validate_command;
use offgrid::log::is_logger_initialised;
use offgrid::settings::Settings;
use std::path::PathBuf;

/// Get the path to the example project.
fn get_project_dir() -> PathBuf {
    PathBuf::from("demos/logan")
}

/// An integration test for the `validate` command.
///
/// We also check that the logger is initialised after it is run.
#[test]
fn test_handle_validate_command() {
    unsafe { std::env::set_var("OFFGRID_LOG_LEVEL", "off") };

    assert!(!is_logger_initialised());

    handle_validate_command(&get_project_dir(), Some(Settings::default())).unwrap();

    assert!(is_logger_initialised());
}
