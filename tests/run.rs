//! Integration tests for the `run` command.
use offgrid::cli::{RunOpts, handle_run_command};
use offgrid::settings::Settings;
use std::path::PathBuf;
use tempfile::tempdir;

/// Get the path to the example project.
fn get_project_dir() -> PathBuf {
    PathBuf::from("demos/logan")
}

/// An integration test for the `run` command.
#[test]
fn test_handle_run_command() {
    unsafe { std::env::set_var("OFFGRID_LOG_LEVEL", "off") };

    let tempdir = tempdir().unwrap();
    {
        // Save results to non-existent directory to check that directory creation works
        let output_dir = tempdir.path().join("results");
        let opts = RunOpts {
            output_dir: Some(output_dir.clone()),
            debug_model: true,
            ..Default::default()
        };
        handle_run_command(&get_project_dir(), &opts, Some(Settings::default())).unwrap();

        for file_name in [
            "selected_products.csv",
            "grid.csv",
            "costs.csv",
            "hourly_results.csv",
            "debug_big_m.csv",
            "metadata.toml",
            "offgrid_info.log",
            "offgrid_error.log",
        ] {
            assert!(output_dir.join(file_name).is_file(), "Missing {file_name}");
        }
    }

    // Second time will fail because the logging is already initialised
    let opts = RunOpts {
        output_dir: Some(tempdir.path().join("more_results")),
        ..Default::default()
    };
    assert_eq!(
        handle_run_command(&get_project_dir(), &opts, Some(Settings::default()))
            .unwrap_err()
            .chain()
            .next()
            .unwrap()
            .to_string(),
        "Failed to initialise logging."
    );
}
