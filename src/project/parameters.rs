//! Defines the `ProjectParameters` struct, which holds the tunable modelling parameters from the
//! `[parameters]` section of `project.toml`.
use crate::input::deserialise_proportion;
use crate::units::{Dimensionless, MoneyPerEnergy};
use anyhow::{Result, ensure};
use log::warn;
use serde::Deserialize;

macro_rules! define_unit_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            <$type>::new($value)
        }
    };
}

macro_rules! define_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            $value
        }
    };
}

define_unit_param_default!(default_grid_penalty, MoneyPerEnergy, 0.0);
define_unit_param_default!(default_initial_storage, Dimensionless, 0.0);
define_param_default!(default_max_units, u32, 10_000);

/// Threshold above which a unit limit is likely to cause numerical trouble
const LARGE_MAX_UNITS: u32 = 1_000_000;

/// Modelling parameters for a project
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ProjectParameters {
    /// An artificial cost per unit of grid energy, used to favour self-sufficiency.
    ///
    /// This is not a real cost, so it is excluded from the reported net total.
    #[serde(default = "default_grid_penalty")]
    pub grid_penalty: MoneyPerEnergy,
    /// The fraction of total storage capacity which is full before the first modelled hour
    #[serde(default = "default_initial_storage")]
    #[serde(deserialize_with = "deserialise_proportion")]
    pub initial_storage: Dimensionless,
    /// The largest number of units of any one product which can be installed
    #[serde(default = "default_max_units")]
    pub max_units: u32,
}

impl Default for ProjectParameters {
    fn default() -> Self {
        Self {
            grid_penalty: default_grid_penalty(),
            initial_storage: default_initial_storage(),
            max_units: default_max_units(),
        }
    }
}

/// Check that the `grid_penalty` parameter is valid
fn check_grid_penalty(value: MoneyPerEnergy) -> Result<()> {
    ensure!(
        value.is_finite() && value >= MoneyPerEnergy(0.0),
        "grid_penalty must be a finite number greater than or equal to zero"
    );

    Ok(())
}

/// Check that the `max_units` parameter is valid
fn check_max_units(value: u32) -> Result<()> {
    ensure!(value > 0, "max_units cannot be zero");

    if value > LARGE_MAX_UNITS {
        warn!(
            "max_units is very large ({value}). Big-M values derived from it may cause numerical \
            problems in the solver."
        );
    }

    Ok(())
}

impl ProjectParameters {
    /// Validate parameters after reading in file
    pub fn validate(&self) -> Result<()> {
        // grid_penalty
        check_grid_penalty(self.grid_penalty)?;

        // initial_storage already validated with deserialise_proportion, unless set in code
        ensure!(
            (0.0..=1.0).contains(&self.initial_storage.value()),
            "initial_storage must be between 0 and 1"
        );

        // max_units
        check_max_units(self.max_units)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fmt::Display;

    /// Helper function to assert validation result based on expected validity
    fn assert_validation_result<T, U: Display>(
        result: Result<T>,
        expected_valid: bool,
        value: U,
        expected_error_fragment: &str,
    ) {
        if expected_valid {
            assert!(
                result.is_ok(),
                "Expected value {} to be valid, but got error: {:?}",
                value,
                result.err()
            );
        } else {
            assert!(
                result.is_err(),
                "Expected value {value} to be invalid, but it was accepted",
            );
            let error_message = result.err().unwrap().to_string();
            assert!(
                error_message.contains(expected_error_fragment),
                "Error message should mention the validation constraint, got: {error_message}",
            );
        }
    }

    #[test]
    fn test_defaults() {
        let params: ProjectParameters = toml::from_str("").unwrap();
        assert_eq!(params, ProjectParameters::default());
        assert_eq!(params.max_units, 10_000);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_initial_storage_out_of_range() {
        assert!(toml::from_str::<ProjectParameters>("initial_storage = 0.5").is_ok());
        assert!(toml::from_str::<ProjectParameters>("initial_storage = 1.5").is_err());
    }

    #[rstest]
    #[case(0.0, true)] // Valid minimum value (default)
    #[case(0.05, true)] // Valid typical value
    #[case(f64::MAX, true)] // Valid maximum finite value
    #[case(-1e-10, false)] // Invalid: negative value
    #[case(f64::INFINITY, false)] // Invalid: infinite value
    #[case(f64::NAN, false)] // Invalid: NaN value
    fn test_check_grid_penalty(#[case] value: f64, #[case] expected_valid: bool) {
        let result = check_grid_penalty(MoneyPerEnergy::new(value));

        assert_validation_result(
            result,
            expected_valid,
            value,
            "grid_penalty must be a finite number greater than or equal to zero",
        );
    }

    #[rstest]
    #[case(1, true)] // Valid minimum value
    #[case(10_000, true)] // Valid default value
    #[case(u32::MAX, true)] // Valid but warns
    #[case(0, false)] // Invalid: zero
    fn test_check_max_units(#[case] value: u32, #[case] expected_valid: bool) {
        let result = check_max_units(value);

        assert_validation_result(result, expected_valid, value, "max_units cannot be zero");
    }
}
