//! Common functionality for the off-grid sizing optimiser.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod cli;
pub mod constraints;
pub mod error;
pub mod grid;
pub mod hour;
pub mod id;
pub mod input;
pub mod log;
pub mod output;
pub mod product;
pub mod profile;
pub mod project;
pub mod settings;
pub mod solver;
pub mod units;

#[cfg(test)]
mod fixture;

/// Get the directory where program settings are stored.
///
/// Falls back to the current directory if the platform has no config directory.
pub fn get_offgrid_config_dir() -> PathBuf {
    let Some(mut config_dir) = dirs::config_dir() else {
        return PathBuf::from(".");
    };
    config_dir.push("offgrid");

    config_dir
}
