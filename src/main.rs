//! Provides the main entry point to the program.
use human_panic::{metadata, setup_panic};
use offgrid::cli::run_cli;
use offgrid::log::is_logger_initialised;

fn main() {
    setup_panic!(metadata!().support(
        "Open an issue with the contents of the report file, along with the project files you used."
    ));

    if let Err(err) = run_cli() {
        if is_logger_initialised() {
            ::log::error!("{err:?}");
        } else {
            eprintln!("Error: {err:?}");
        }

        // Terminate program, signalling an error
        std::process::exit(1);
    }
}
