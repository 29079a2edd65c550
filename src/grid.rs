//! The optional connection to the utility grid.
use crate::error::OffGridError;
use crate::hour::Hour;
use crate::profile::HourlyProfile;
use crate::solver::{ConstraintHandle, LinearExpr, SolverModel, Variable};
use crate::units::{Dimensionless, MoneyPerEnergy};
use anyhow::{Context, Result};
use indexmap::IndexMap;
use log::debug;

/// A grid connection, with prices and decision variables for the modelled hours
#[derive(Debug)]
pub struct Grid {
    /// Price paid per unit of energy bought at each hour
    buy_price: IndexMap<Hour, MoneyPerEnergy>,
    /// Fraction of the buy price paid for energy sold back
    sell_fraction: Dimensionless,
    /// Whether the grid may be used at all
    allow_grid: bool,
    /// Binary: whether the connection is installed
    installed: Variable,
    /// Energy bought at each hour
    usage: IndexMap<Hour, Variable>,
    /// Keeps `installed` at zero when the grid is disallowed
    disallowed: Option<ConstraintHandle>,
}

impl Grid {
    /// Create the grid component and bind its variables to the model.
    ///
    /// If the grid is disallowed, the connection is permanently pinned to "not installed".
    ///
    /// # Arguments
    ///
    /// * `prices` - The buy price for every hour of the year
    /// * `allow_grid` - Whether energy may be bought from the grid
    /// * `sell_fraction` - Fraction of the buy price paid for energy sold to the grid
    /// * `hours` - The modelled hours
    /// * `model` - The model to bind variables to
    pub fn from_hourly_price<M: SolverModel>(
        prices: &HourlyProfile,
        allow_grid: bool,
        sell_fraction: Dimensionless,
        hours: &[Hour],
        model: &mut M,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&sell_fraction.value()) {
            Err(OffGridError::Configuration(
                "Grid sell fraction must be between 0 and 1".into(),
            ))?;
        }
        let buy_price: IndexMap<_, _> = hours
            .iter()
            .map(|&hour| (hour, MoneyPerEnergy(prices.at(hour))))
            .collect();
        if let Some((hour, price)) = buy_price
            .iter()
            .find(|(_, price)| !price.is_finite() || price.value() < 0.0)
        {
            Err(OffGridError::Configuration(format!(
                "Grid prices must be finite and non-negative (price at hour {hour} is {price})"
            )))?;
        }

        let installed = model.add_binary();
        let usage = hours
            .iter()
            .map(|&hour| (hour, model.add_continuous()))
            .collect();

        let disallowed = (!allow_grid).then(|| {
            debug!("Grid use is disallowed: pinning grid connection to zero");
            model.add_constraint(LinearExpr::from(installed).eq(0.0))
        });

        Ok(Self {
            buy_price,
            sell_fraction,
            allow_grid,
            installed,
            usage,
            disallowed,
        })
    }

    /// Whether grid use is allowed
    pub fn is_allowed(&self) -> bool {
        self.allow_grid
    }

    /// Whether the constraint pinning the connection to zero is registered
    pub fn is_pinned(&self) -> bool {
        self.disallowed.is_some()
    }

    /// The binary variable for whether the grid is installed
    pub fn installed(&self) -> Variable {
        self.installed
    }

    /// The variable for energy bought at the given hour
    pub fn usage_at(&self, hour: Hour) -> Result<Variable> {
        self.usage
            .get(&hour)
            .copied()
            .with_context(|| format!("Hour {hour} is not modelled"))
    }

    /// Energy bought over all modelled hours
    pub fn total_usage(&self) -> LinearExpr {
        self.usage.values().copied().sum()
    }

    /// The buy price at the given hour
    pub fn buy_price(&self, hour: Hour) -> Result<MoneyPerEnergy> {
        self.buy_price
            .get(&hour)
            .copied()
            .with_context(|| format!("Hour {hour} is not modelled"))
    }

    /// The price paid for energy sold at the given hour
    pub fn sell_price(&self, hour: Hour) -> Result<MoneyPerEnergy> {
        Ok(self.buy_price(hour)? * self.sell_fraction)
    }

    /// The cost of energy bought at the given hour
    pub fn cost_at(&self, hour: Hour) -> Result<LinearExpr> {
        Ok(self.usage_at(hour)? * self.buy_price(hour)?.value())
    }

    /// The revenue from selling `sold` at the given hour
    pub fn sale_revenue(&self, hour: Hour, sold: Variable) -> Result<LinearExpr> {
        Ok(sold * self.sell_price(hour)?.value())
    }
}
