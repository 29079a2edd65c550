//! Concretized results read from a solved project.
use super::Formulation;
use crate::hour::{Hour, hour_label};
use crate::id::ProductID;
use crate::product::EnergyType;
use crate::solver::Solution;
use crate::units::{Dimensionless, Energy, Money};
use anyhow::Result;
use serde::Serialize;

/// A product with at least one unit installed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectedProduct {
    /// The product's ID
    pub product_id: ProductID,
    /// The product's energy type
    pub energy_type: EnergyType,
    /// Number of units installed
    pub units: u32,
    /// Whether this product's opening cost was charged
    pub opened: bool,
    /// Nameplate capacity of the installed units
    pub installed_capacity: Energy,
}

/// How the grid was used
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridSummary {
    /// Whether the grid connection is installed
    pub installed: bool,
    /// Energy bought over the modelled hours
    pub total_usage: Energy,
    /// Energy sold over the modelled hours
    pub total_sold: Energy,
}

/// Costs of a solution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostBreakdown {
    /// Opening costs
    pub opening: Money,
    /// Monthly maintenance costs
    pub maintenance: Money,
    /// Cost of installed units
    pub incremental: Money,
    /// Cost of grid energy over the modelled hours
    pub grid: Money,
    /// Revenue from selling energy over the modelled hours
    pub revenue: Money,
    /// The artificial grid penalty (not part of the net total)
    pub grid_penalty: Money,
    /// Total of all real costs, less revenue
    pub net_total: Money,
}

/// The state of the system in one modelled hour
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyResult {
    /// Hour of the year
    pub hour: Hour,
    /// Calendar position of the hour
    pub label: String,
    /// Electricity demand
    pub demand: Energy,
    /// Solar capacity factor
    pub solar_factor: Dimensionless,
    /// Wind capacity factor
    pub wind_factor: Dimensionless,
    /// Electricity generated by non-storage products
    pub generation: Energy,
    /// Energy routed into storage
    pub stored: Energy,
    /// Energy drawn from storage
    pub consumed: Energy,
    /// Energy in storage at the end of the hour
    pub storage_level: Energy,
    /// Energy sold to the grid
    pub sold: Energy,
    /// Energy bought from the grid
    pub grid_usage: Energy,
}

/// All results of a solved project
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    /// Installed products
    pub selected_products: Vec<SelectedProduct>,
    /// Grid use
    pub grid: GridSummary,
    /// Costs
    pub costs: CostBreakdown,
    /// Hour-by-hour results
    pub hourly: Vec<HourlyResult>,
}

pub(super) fn selected_products(
    formulation: &Formulation,
    solution: &Solution,
) -> Vec<SelectedProduct> {
    formulation
        .products()
        .iter()
        .filter_map(|product| {
            let units = product.units_in(solution);
            (units > 0).then(|| SelectedProduct {
                product_id: product.id.clone(),
                energy_type: product.energy_type,
                units,
                opened: product.is_opened_in(solution),
                installed_capacity: Energy(solution.evaluate(&product.installed_capacity())),
            })
        })
        .collect()
}

pub(super) fn grid_summary(formulation: &Formulation, solution: &Solution) -> GridSummary {
    let grid = formulation.grid();
    let total_sold = formulation
        .hours()
        .iter()
        .filter_map(|&hour| formulation.sold_at(hour).ok())
        .map(|sold| solution.value(sold))
        .sum();

    GridSummary {
        installed: solution.value(grid.installed()) > 0.5,
        total_usage: Energy(solution.evaluate(&grid.total_usage())),
        total_sold: Energy(total_sold),
    }
}

pub(super) fn cost_breakdown(
    formulation: &Formulation,
    solution: &Solution,
) -> Result<CostBreakdown> {
    let opening = Money(solution.evaluate(&formulation.opening_cost()));
    let maintenance = Money(solution.evaluate(&formulation.maintenance_cost()));
    let incremental = Money(solution.evaluate(&formulation.incremental_cost()));
    let grid = Money(solution.evaluate(&formulation.grid_cost()?));
    let revenue = Money(solution.evaluate(&formulation.sale_revenue()?));
    let grid_penalty = Money(solution.evaluate(&formulation.grid_penalty()));

    Ok(CostBreakdown {
        opening,
        maintenance,
        incremental,
        grid,
        revenue,
        grid_penalty,
        net_total: opening + maintenance + incremental + grid - revenue,
    })
}

pub(super) fn hourly_series(
    formulation: &Formulation,
    solution: &Solution,
) -> Result<Vec<HourlyResult>> {
    let capacity = formulation.capacity_profile();
    let mut level = solution.evaluate(&formulation.total_storage_capacity())
        * formulation.parameters().initial_storage.value();

    formulation
        .hours()
        .iter()
        .map(|&hour| {
            let stored = solution.evaluate(&formulation.storage_stored(hour));
            let consumed = solution.evaluate(&formulation.storage_consumed(hour));
            let sold = solution.value(formulation.sold_at(hour)?);
            level += stored - consumed - sold;

            Ok(HourlyResult {
                hour,
                label: hour_label(hour),
                demand: Energy(formulation.demand_at(hour)),
                solar_factor: Dimensionless(capacity.factor(hour, EnergyType::Solar)),
                wind_factor: Dimensionless(capacity.factor(hour, EnergyType::Wind)),
                generation: Energy(solution.evaluate(&formulation.electricity_capacity(hour))),
                stored: Energy(stored),
                consumed: Energy(consumed),
                storage_level: Energy(level),
                sold: Energy(sold),
                grid_usage: Energy(solution.evaluate(&formulation.grid_usage(hour)?)),
            })
        })
        .collect()
}
