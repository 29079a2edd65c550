//! Defines the `ProjectConfig` struct, which represents the contents of `project.toml`.
use super::{deserialise_proportion, input_err_msg, read_toml};
use crate::constraints::Budget;
use crate::hour::HourSampling;
use crate::product::ProductRaw;
use crate::profile::Aggregation;
use crate::project::ProjectParameters;
use crate::solver::SolverOptions;
use crate::units::{Dimensionless, MoneyPerEnergy};
use anyhow::{Context, Result, ensure};
use log::warn;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// The name of the project file in a project directory
pub const PROJECT_FILE_NAME: &str = "project.toml";

fn default_sell_fraction() -> Dimensionless {
    Dimensionless(0.5)
}

/// Grid pricing
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GridConfig {
    /// Flat price per unit of energy bought
    #[serde(alias = "grid_cost_kwh")]
    pub price: Option<MoneyPerEnergy>,
    /// CSV file with an hourly price (columns `local_time` and `price`), used instead of `price`
    pub price_file: Option<PathBuf>,
    /// Environmental cost per unit of energy, added to the price
    #[serde(alias = "grid_cost_env", default)]
    pub environmental_cost: MoneyPerEnergy,
    /// Fraction of the buy price paid for energy sold to the grid
    #[serde(default = "default_sell_fraction")]
    #[serde(deserialize_with = "deserialise_proportion")]
    pub sell_fraction: Dimensionless,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            price: None,
            price_file: None,
            environmental_cost: MoneyPerEnergy(0.0),
            sell_fraction: default_sell_fraction(),
        }
    }
}

/// Represents the contents of the project file
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Where the installation is; used to find the hourly data files
    pub location: String,
    /// Whether energy may be bought from the grid
    pub allow_grid: bool,
    /// Spending limits
    #[serde(default)]
    pub budget: Budget,
    /// Grid pricing
    #[serde(default)]
    pub grid: GridConfig,
    /// Which hours of the year to model
    #[serde(default)]
    pub sampling: HourSampling,
    /// How hourly data records are reduced to a value for each hour of the year
    #[serde(default)]
    pub aggregation: Aggregation,
    /// Modelling parameters
    #[serde(default)]
    pub parameters: ProjectParameters,
    /// Options passed to the solver
    #[serde(default)]
    pub solver: SolverOptions,
    /// The product catalog
    #[serde(default)]
    pub products: Vec<ProductRaw>,
}

/// Check that the grid prices are usable
fn check_grid(grid: &GridConfig, allow_grid: bool) -> Result<()> {
    if let Some(price) = grid.price {
        ensure!(
            price.is_finite() && price >= MoneyPerEnergy(0.0),
            "Grid price must be a finite number greater than or equal to zero"
        );
    }
    ensure!(
        grid.environmental_cost.is_finite() && grid.environmental_cost >= MoneyPerEnergy(0.0),
        "Grid environmental cost must be a finite number greater than or equal to zero"
    );
    ensure!(
        grid.price.is_none() || grid.price_file.is_none(),
        "Only one of grid price and grid price file may be given"
    );
    if allow_grid {
        ensure!(
            grid.price.is_some() || grid.price_file.is_some(),
            "A grid price or grid price file is required when grid use is allowed"
        );
    }

    Ok(())
}

impl ProjectConfig {
    /// Read the project file from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `project_dir` - Folder containing project configuration files
    ///
    /// # Returns
    ///
    /// The file contents as a [`ProjectConfig`] struct or an error if the file is invalid
    pub fn from_path<P: AsRef<Path>>(project_dir: P) -> Result<ProjectConfig> {
        let file_path = project_dir.as_ref().join(PROJECT_FILE_NAME);
        let config: ProjectConfig = read_toml(&file_path)?;

        config
            .validate()
            .with_context(|| input_err_msg(file_path))?;

        Ok(config)
    }

    /// Validate the configuration after reading in file
    fn validate(&self) -> Result<()> {
        ensure!(!self.location.trim().is_empty(), "location cannot be empty");
        self.budget.validate()?;
        check_grid(&self.grid, self.allow_grid)?;
        self.parameters.validate()?;

        if self.products.is_empty() {
            warn!("The product catalog is empty, so only the grid can meet demand");
        }

        Ok(())
    }
}
