//! Code for reading hourly demand, capacity factor and grid price data from CSV files.
use super::{input_err_msg, parse_timestamp, read_csv};
use crate::input::{GridConfig, ProjectConfig};
use crate::product::EnergyType;
use crate::profile::{Aggregation, CapacityProfile, DemandProfile, HourlyProfile};
use anyhow::{Context, Result};
use indexmap::IndexMap;
use log::info;
use std::collections::HashMap;
use std::path::Path;

/// The column holding the timestamp in every hourly data file
const TIMESTAMP_COLUMN: &str = "local_time";

/// Get the part of the data file names which identifies a location.
///
/// The location is lowercased, with runs of commas and spaces replaced by underscores
/// (e.g. "Logan, UT" becomes "logan_ut").
pub fn data_file_stem(location: &str) -> String {
    location
        .to_lowercase()
        .split([',', ' '])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// The name of the capacity factor file for an energy type and location
fn capacity_file_name(energy_type: EnergyType, stem: &str) -> Option<String> {
    match energy_type {
        EnergyType::Solar => Some(format!("ninja_pv_{stem}.csv")),
        EnergyType::Wind => Some(format!("ninja_wind_{stem}.csv")),
        _ => None,
    }
}

/// Read an hourly profile from the given column of a CSV file
fn read_hourly_file(
    file_path: &Path,
    value_column: &str,
    aggregation: Aggregation,
) -> Result<HourlyProfile> {
    let rows: Vec<HashMap<String, String>> = read_csv(file_path)?;
    let profile = rows
        .iter()
        .map(|row| {
            let timestamp = row
                .get(TIMESTAMP_COLUMN)
                .with_context(|| format!("Missing column {TIMESTAMP_COLUMN}"))?;
            let value = row
                .get(value_column)
                .with_context(|| format!("Missing column {value_column}"))?;
            let value: f64 = value
                .parse()
                .with_context(|| format!("Invalid {value_column} value '{value}'"))?;

            Ok((parse_timestamp(timestamp)?, value))
        })
        .collect::<Result<Vec<_>>>()
        .and_then(|records| HourlyProfile::from_records(records, aggregation))
        .with_context(|| input_err_msg(file_path))?;

    Ok(profile)
}

/// Read capacity factors for the weather-dependent energy types used by the product catalog.
///
/// # Arguments
///
/// * `project_dir` - Folder containing the data files
/// * `stem` - The location part of the file names
/// * `config` - The project configuration
pub fn read_capacity_profile(
    project_dir: &Path,
    stem: &str,
    config: &ProjectConfig,
) -> Result<CapacityProfile> {
    let mut factors = IndexMap::new();
    for raw in &config.products {
        let Ok(energy_type) = raw.energy_type.trim().parse::<EnergyType>() else {
            continue;
        };
        if factors.contains_key(&energy_type) {
            continue;
        }
        let Some(file_name) = capacity_file_name(energy_type, stem) else {
            continue;
        };

        let file_path = project_dir.join(file_name);
        info!("Reading {energy_type} capacity factors from {}", file_path.display());
        let profile = read_hourly_file(&file_path, "electricity", config.aggregation)?;
        factors.insert(energy_type, profile);
    }

    CapacityProfile::new(factors)
}

/// Read electricity demand for the location.
///
/// # Arguments
///
/// * `project_dir` - Folder containing the data files
/// * `stem` - The location part of the file names
/// * `aggregation` - How records are reduced to hourly values
pub fn read_demand_profile(
    project_dir: &Path,
    stem: &str,
    aggregation: Aggregation,
) -> Result<DemandProfile> {
    let file_path = project_dir.join(format!("demand_{stem}.csv"));
    let profile = read_hourly_file(&file_path, "demand", aggregation)?;
    DemandProfile::new(profile).with_context(|| input_err_msg(&file_path))
}

/// Get the grid buy price for every hour, including the environmental cost.
///
/// # Arguments
///
/// * `project_dir` - Folder containing the data files
/// * `grid` - The grid configuration
/// * `aggregation` - How records in a price file are reduced to hourly values
pub fn read_grid_prices(
    project_dir: &Path,
    grid: &GridConfig,
    aggregation: Aggregation,
) -> Result<HourlyProfile> {
    let prices = match (&grid.price_file, grid.price) {
        (Some(file_name), _) => {
            let file_path = project_dir.join(file_name);
            let profile = read_hourly_file(&file_path, "price", aggregation)?;
            if profile.min() < 0.0 {
                return Err(anyhow::anyhow!("Grid prices cannot be negative"))
                    .with_context(|| input_err_msg(&file_path));
            }
            profile
        }
        (None, Some(price)) => HourlyProfile::constant(price.value()),
        (None, None) => HourlyProfile::constant(0.0),
    };

    Ok(prices.offset(grid.environmental_cost.value()))
}
