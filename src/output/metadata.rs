//! Code for writing metadata about a run to file
use anyhow::Result;
use chrono::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// The output file name for metadata
const METADATA_FILE_NAME: &str = "metadata.toml";

#[derive(Serialize)]
struct Metadata<'a> {
    run: RunMetadata<'a>,
    program: ProgramMetadata<'a>,
}

/// Information about the project run
#[derive(Serialize)]
struct RunMetadata<'a> {
    /// Path to the project which was run
    project_path: &'a Path,
    /// Where the installation is
    location: &'a str,
    /// The date and time at which the results were written
    datetime: String,
    /// The value of the objective for the optimal solution
    objective_value: f64,
}

#[derive(Serialize)]
struct ProgramMetadata<'a> {
    /// The program name
    name: &'a str,
    /// The program version as specified in Cargo.toml
    version: &'a str,
    /// Whether it is a debug build
    is_debug: bool,
}

impl Default for ProgramMetadata<'_> {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            is_debug: cfg!(debug_assertions),
        }
    }
}

/// Write metadata to the specified output path in TOML format
pub fn write_metadata(
    output_path: &Path,
    project_path: &Path,
    location: &str,
    objective_value: f64,
) -> Result<()> {
    let metadata = Metadata {
        run: RunMetadata {
            project_path,
            location,
            datetime: Local::now().to_rfc2822(),
            objective_value,
        },
        program: ProgramMetadata::default(),
    };
    let file_path = output_path.join(METADATA_FILE_NAME);
    fs::write(&file_path, toml::to_string(&metadata)?)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_metadata() {
        let dir = tempdir().unwrap();
        write_metadata(dir.path(), Path::new("demos/logan"), "Logan, UT", 1234.5).unwrap();

        let contents = fs::read_to_string(dir.path().join(METADATA_FILE_NAME)).unwrap();
        let value: toml::Table = toml::from_str(&contents).unwrap();
        assert_eq!(value["run"]["location"].as_str(), Some("Logan, UT"));
        assert_eq!(value["run"]["objective_value"].as_float(), Some(1234.5));
        assert_eq!(value["program"]["name"].as_str(), Some("offgrid"));
    }
}
