//! Common routines for handling input data.
use crate::project::ProjectInputs;
use crate::units::Dimensionless;
use anyhow::{Context, Result, ensure};
use chrono::NaiveDateTime;
use serde::de::{Deserialize, DeserializeOwned, Deserializer};
use std::fs;
use std::path::Path;

pub mod config;
pub use config::{GridConfig, PROJECT_FILE_NAME, ProjectConfig};
pub mod profile;
pub use profile::{data_file_stem, read_capacity_profile, read_demand_profile, read_grid_prices};

/// Timestamp formats accepted in hourly data files
const TIMESTAMP_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%m-%d-%Y %H:%M",
    "%m/%d/%Y %H:%M",
];

/// Format an error message to include the file path. To be used with `anyhow::Context`.
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().display())
}

/// Read a series of type `T`s from a CSV file.
///
/// Lines starting with `#` are treated as comments. An empty file is an error.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv<T: DeserializeOwned>(file_path: &Path) -> Result<Vec<T>> {
    let vec = read_csv_internal(file_path).with_context(|| input_err_msg(file_path))?;
    ensure!(
        !vec.is_empty(),
        "{}: CSV file cannot be empty",
        input_err_msg(file_path)
    );

    Ok(vec)
}

fn read_csv_internal<T: DeserializeOwned>(file_path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_path(file_path)?;

    let vec = reader.deserialize().collect::<Result<_, _>>()?;
    Ok(vec)
}

/// Parse a TOML file at the specified path.
///
/// # Arguments
///
/// * `file_path` - Path to the TOML file
///
/// # Returns
///
/// * The deserialised TOML data or an error if the file could not be read or parsed.
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let toml_data = toml::from_str(&toml_str).with_context(|| input_err_msg(file_path))?;
    Ok(toml_data)
}

/// Read a [`Dimensionless`] value, checking that it is between 0 and 1
pub fn deserialise_proportion<'de, D>(deserialiser: D) -> Result<Dimensionless, D::Error>
where
    D: Deserializer<'de>,
{
    let value: f64 = Deserialize::deserialize(deserialiser)?;
    if !(0.0..=1.0).contains(&value) {
        Err(serde::de::Error::custom("Value must be between 0 and 1"))?;
    }

    Ok(Dimensionless(value))
}

/// Parse a timestamp from an hourly data file, trying each supported format in turn
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime> {
    let value = value.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .with_context(|| format!("Invalid timestamp: '{value}'"))
}

/// A project read from a directory, ready to be built
pub struct LoadedProject {
    /// The contents of the project file
    pub config: ProjectConfig,
    /// The validated inputs for building the project
    pub inputs: ProjectInputs,
}

/// Read a project from the specified directory.
///
/// # Arguments
///
/// * `project_dir` - Folder containing `project.toml` and the hourly data files
///
/// # Returns
///
/// The project configuration and the inputs needed to build it
pub fn load_project(project_dir: &Path) -> Result<LoadedProject> {
    let config = ProjectConfig::from_path(project_dir)?;
    let hours = config.sampling.hours()?;

    let stem = data_file_stem(&config.location);
    let capacity = read_capacity_profile(project_dir, &stem, &config)?;
    let demand = read_demand_profile(project_dir, &stem, config.aggregation)?;
    let grid_prices = read_grid_prices(project_dir, &config.grid, config.aggregation)?;

    let inputs = ProjectInputs {
        catalog: config.products.clone(),
        grid_prices,
        allow_grid: config.allow_grid,
        sell_fraction: config.grid.sell_fraction,
        capacity,
        demand,
        hours,
        budget: config.budget,
        parameters: config.parameters.clone(),
    };

    Ok(LoadedProject { config, inputs })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Record {
        id: String,
        value: u32,
    }

    /// Create an example CSV file in dir_path
    fn create_csv_file(dir_path: &Path, contents: &str) -> std::path::PathBuf {
        let file_path = dir_path.join("test.csv");
        let mut file = File::create(&file_path).unwrap();
        writeln!(file, "{contents}").unwrap();
        file_path
    }

    #[test]
    fn test_read_csv() {
        let dir = tempdir().unwrap();
        let file_path = create_csv_file(
            dir.path(),
            "# Renewables.ninja style comment\nid,value\nhello,1\nworld, 2\n",
        );
        let records: Vec<Record> = read_csv(&file_path).unwrap();
        assert_eq!(
            records,
            &[
                Record {
                    id: "hello".to_string(),
                    value: 1,
                },
                Record {
                    id: "world".to_string(),
                    value: 2,
                }
            ]
        );

        // Empty file with header
        let file_path = create_csv_file(dir.path(), "id,value");
        assert!(read_csv::<Record>(&file_path).is_err());
    }

    #[test]
    fn test_read_toml() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test.toml");
        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "id = \"hello\"\nvalue = 1").unwrap();
        }

        assert_eq!(
            read_toml::<Record>(&file_path).unwrap(),
            Record {
                id: "hello".to_string(),
                value: 1,
            }
        );

        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "bad toml syntax").unwrap();
        }

        assert!(read_toml::<Record>(&file_path).is_err());
    }

    #[derive(Debug, Deserialize)]
    struct Proportion {
        #[serde(deserialize_with = "deserialise_proportion")]
        value: Dimensionless,
    }

    #[test]
    fn test_deserialise_proportion() {
        let parse = |s: &str| toml::from_str::<Proportion>(s).map(|p| p.value);
        assert_eq!(parse("value = 0.0").unwrap(), Dimensionless(0.0));
        assert_eq!(parse("value = 0.3").unwrap(), Dimensionless(0.3));
        assert_eq!(parse("value = 1.0").unwrap(), Dimensionless(1.0));
        assert!(parse("value = -0.1").is_err());
        assert!(parse("value = 1.1").is_err());
    }

    #[test]
    fn test_parse_timestamp() {
        let expected = NaiveDateTime::parse_from_str("2019-03-01 14:00", "%Y-%m-%d %H:%M").unwrap();
        for value in [
            "2019-03-01 14:00",
            "2019-03-01 14:00:00",
            "2019-03-01T14:00",
            "03-01-2019 14:00",
            " 03/01/2019 14:00",
        ] {
            assert_eq!(parse_timestamp(value).unwrap(), expected);
        }
        assert!(parse_timestamp("yesterday").is_err());
    }
}
