//! The inputs and decision variables of a project, and the expressions built from them.
use super::ProjectParameters;
use crate::constraints::Budget;
use crate::error::OffGridError;
use crate::grid::Grid;
use crate::hour::{HOURS_IN_MONTH, Hour, check_hours};
use crate::product::{EnergyType, Product, ProductRaw};
use crate::profile::{CapacityProfile, DemandProfile, HourlyProfile};
use crate::solver::{LinearExpr, SolverModel, Variable};
use crate::units::Dimensionless;
use anyhow::{Context, Result};
use indexmap::{IndexMap, IndexSet};
use log::info;

/// Small allowance when rounding down affordable unit counts
const AFFORDABILITY_TOLERANCE: f64 = 1e-9;

/// Everything needed to build a project
#[derive(Debug, Clone)]
pub struct ProjectInputs {
    /// The candidate products
    pub catalog: Vec<ProductRaw>,
    /// Grid buy price for every hour of the year
    pub grid_prices: HourlyProfile,
    /// Whether energy may be bought from the grid
    pub allow_grid: bool,
    /// Fraction of the buy price paid for energy sold to the grid
    pub sell_fraction: Dimensionless,
    /// Capacity factors of weather-dependent products
    pub capacity: CapacityProfile,
    /// Electricity demand
    pub demand: DemandProfile,
    /// The ordered hours to model
    pub hours: Vec<Hour>,
    /// Spending limits
    pub budget: Budget,
    /// Modelling parameters
    pub parameters: ProjectParameters,
}

/// Check that every weather-dependent product has a capacity factor profile
fn check_capacity_profile(products: &[ProductRaw], capacity: &CapacityProfile) -> Result<()> {
    for raw in products {
        let Ok(energy_type) = raw.energy_type.trim().parse::<EnergyType>() else {
            // Reported when the catalog is parsed
            continue;
        };
        if energy_type.is_weather_dependent() && !capacity.contains(energy_type) {
            Err(OffGridError::Configuration(format!(
                "No capacity factors provided for {energy_type} (needed by product '{}')",
                raw.name
            )))?;
        }
    }

    Ok(())
}

/// The live state of a project which constraints and the objective are built from
#[derive(Debug)]
pub struct Formulation {
    hours: Vec<Hour>,
    catalog: Vec<ProductRaw>,
    products: Vec<Product>,
    grid: Grid,
    sold: IndexMap<Hour, Variable>,
    storage_installed: Variable,
    capacity: CapacityProfile,
    demand: DemandProfile,
    budget: Budget,
    parameters: ProjectParameters,
}

impl Formulation {
    /// Validate the inputs and bind all decision variables to the model.
    ///
    /// All inputs are checked before any variable is added.
    pub fn new<M: SolverModel>(model: &mut M, inputs: ProjectInputs) -> Result<Self> {
        check_hours(&inputs.hours)?;
        inputs.budget.validate()?;
        inputs
            .parameters
            .validate()
            .context("Invalid project parameters")?;
        check_capacity_profile(&inputs.catalog, &inputs.capacity)?;

        let hours = inputs.hours;
        let products = Product::create(&inputs.catalog, model, &hours)?;
        let grid = Grid::from_hourly_price(
            &inputs.grid_prices,
            inputs.allow_grid,
            inputs.sell_fraction,
            &hours,
            model,
        )?;
        let sold = hours
            .iter()
            .map(|&hour| (hour, model.add_continuous()))
            .collect();
        let storage_installed = model.add_binary();
        info!(
            "Formulated {} products over {} hours ({} variables)",
            products.len(),
            hours.len(),
            model.num_variables()
        );

        Ok(Self {
            hours,
            catalog: inputs.catalog,
            products,
            grid,
            sold,
            storage_installed,
            capacity: inputs.capacity,
            demand: inputs.demand,
            budget: inputs.budget,
            parameters: inputs.parameters,
        })
    }

    /// The modelled hours, in order
    pub fn hours(&self) -> &[Hour] {
        &self.hours
    }

    /// All products
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Products which provide storage
    pub fn storage_products(&self) -> impl Iterator<Item = &Product> {
        self.products.iter().filter(|product| product.is_storage())
    }

    /// The energy types with at least one product, in catalog order
    pub fn energy_types(&self) -> IndexSet<EnergyType> {
        self.products
            .iter()
            .map(|product| product.energy_type)
            .collect()
    }

    /// Products of the given energy type
    pub fn products_of_type(&self, energy_type: EnergyType) -> impl Iterator<Item = &Product> {
        self.products
            .iter()
            .filter(move |product| product.energy_type == energy_type)
    }

    /// The grid connection
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Binary: whether any storage is installed
    pub fn storage_installed(&self) -> Variable {
        self.storage_installed
    }

    /// The variable for energy sold at the given hour
    pub fn sold_at(&self, hour: Hour) -> Result<Variable> {
        self.sold
            .get(&hour)
            .copied()
            .with_context(|| format!("Hour {hour} is not modelled"))
    }

    /// Capacity factors
    pub fn capacity_profile(&self) -> &CapacityProfile {
        &self.capacity
    }

    /// Electricity demand
    pub fn demand_profile(&self) -> &DemandProfile {
        &self.demand
    }

    /// Demand at the given hour
    pub fn demand_at(&self, hour: Hour) -> f64 {
        self.demand.demand_at(hour)
    }

    /// Spending limits
    pub fn budget(&self) -> &Budget {
        &self.budget
    }

    /// Modelling parameters
    pub fn parameters(&self) -> &ProjectParameters {
        &self.parameters
    }

    pub(super) fn set_demand(&mut self, demand: DemandProfile) {
        self.demand = demand;
    }

    pub(super) fn set_capacity(&mut self, capacity: CapacityProfile) -> Result<()> {
        check_capacity_profile(&self.catalog, &capacity)?;
        self.capacity = capacity;
        Ok(())
    }

    pub(super) fn set_max_units(&mut self, max_units: u32) {
        self.parameters.max_units = max_units;
    }

    pub(super) fn set_budget(&mut self, budget: Budget) -> Result<()> {
        budget.validate()?;
        self.budget = budget;
        Ok(())
    }

    /// Electricity generated at the given hour by non-storage electricity products
    pub fn electricity_capacity(&self, hour: Hour) -> LinearExpr {
        self.products
            .iter()
            .filter(|product| product.generates_electricity())
            .map(|product| {
                product.installed_capacity() * self.capacity.factor(hour, product.energy_type)
            })
            .sum()
    }

    /// Energy routed into storage at the given hour
    pub fn storage_stored(&self, hour: Hour) -> LinearExpr {
        self.storage_products()
            .filter_map(|product| product.stored_at(hour))
            .sum()
    }

    /// Energy drawn from storage at the given hour
    pub fn storage_consumed(&self, hour: Hour) -> LinearExpr {
        self.storage_products()
            .filter_map(|product| product.consumed_at(hour))
            .sum()
    }

    /// Energy bought from the grid at the given hour
    pub fn grid_usage(&self, hour: Hour) -> Result<LinearExpr> {
        Ok(self.grid.usage_at(hour)?.into())
    }

    /// Total capacity of installed storage
    pub fn total_storage_capacity(&self) -> LinearExpr {
        self.storage_products()
            .map(Product::installed_capacity)
            .sum()
    }

    /// The number of units of a product which the budgets could pay for, if either budget limits
    /// it
    fn affordable_units(&self, product: &Product) -> Option<f64> {
        let mut affordable: Option<f64> = None;
        let mut limit_to = |units: f64| {
            let units = (units + AFFORDABILITY_TOLERANCE).floor().max(0.0);
            affordable = Some(affordable.map_or(units, |current| current.min(units)));
        };

        let incremental = product.cost.incremental.value();
        if let Some(initial) = self.budget.initial_limit()
            && incremental > 0.0
        {
            let cheapest_opening = self
                .products_of_type(product.energy_type)
                .map(|other| other.cost.opening.value())
                .fold(f64::INFINITY, f64::min);
            limit_to((initial.value() - cheapest_opening) / incremental);
        }

        let maintenance = product.cost.maintenance.value();
        if let Some(monthly) = self.budget.monthly_limit()
            && maintenance > 0.0
        {
            limit_to(monthly.value() / maintenance);
        }

        affordable
    }

    /// The largest number of units of a product which can be installed.
    ///
    /// This is the configured maximum, reduced to what could be afforded with either budget.
    pub fn unit_limit(&self, product: &Product) -> f64 {
        let max_units = f64::from(self.parameters.max_units);
        self.affordable_units(product)
            .map_or(max_units, |affordable| affordable.min(max_units))
    }

    /// Whether the unit limit of a product is the configured `max_units`, rather than what the
    /// budgets could pay for
    pub fn is_limited_by_max_units(&self, product: &Product) -> bool {
        let max_units = f64::from(self.parameters.max_units);
        self.affordable_units(product)
            .is_none_or(|affordable| affordable > max_units)
    }

    /// The largest storage capacity which could be installed
    pub fn max_storage_capacity(&self) -> f64 {
        self.storage_products()
            .map(|product| self.unit_limit(product) * product.capacity.value())
            .sum()
    }

    /// Opening costs of all products
    pub fn opening_cost(&self) -> LinearExpr {
        self.products.iter().map(Product::opening_cost).sum()
    }

    /// Monthly maintenance costs of all products
    pub fn maintenance_cost(&self) -> LinearExpr {
        self.products.iter().map(Product::maintenance_cost).sum()
    }

    /// Cost of all installed units
    pub fn incremental_cost(&self) -> LinearExpr {
        self.products.iter().map(Product::incremental_cost).sum()
    }

    /// Cost of grid energy over the modelled hours
    pub fn grid_cost(&self) -> Result<LinearExpr> {
        self.hours
            .iter()
            .map(|&hour| self.grid.cost_at(hour))
            .sum()
    }

    /// Revenue from energy sold over the modelled hours
    pub fn sale_revenue(&self) -> Result<LinearExpr> {
        self.hours
            .iter()
            .map(|&hour| -> Result<LinearExpr> {
                self.grid.sale_revenue(hour, self.sold_at(hour)?)
            })
            .sum()
    }

    /// The artificial penalty on grid energy
    pub fn grid_penalty(&self) -> LinearExpr {
        self.grid.total_usage() * self.parameters.grid_penalty.value()
    }

    /// Capital spending: opening and incremental costs
    pub fn capital_cost(&self) -> LinearExpr {
        self.opening_cost() + self.incremental_cost()
    }

    /// The grid cost scaled from the modelled hours to an average month
    pub fn monthly_grid_cost(&self) -> Result<LinearExpr> {
        Ok(self.grid_cost()? * (HOURS_IN_MONTH / self.hours.len() as f64))
    }

    /// Monthly spending: maintenance and, if configured, grid costs
    pub fn operational_cost(&self) -> Result<LinearExpr> {
        let mut cost = self.maintenance_cost();
        if self.budget.include_grid_cost {
            cost += self.monthly_grid_cost()?;
        }

        Ok(cost)
    }

    /// The quantity to minimise
    pub fn objective(&self) -> Result<LinearExpr> {
        Ok(self.opening_cost()
            + self.maintenance_cost()
            + self.incremental_cost()
            + self.grid_cost()?
            - self.sale_revenue()?
            + self.grid_penalty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{
        assert_error, flat_inputs, new_model, solar_entry, solar_formulation, storage_entry,
    };
    use crate::units::Money;
    use float_cmp::assert_approx_eq;

    #[test]
    fn test_electricity_capacity() {
        let (_, formulation) = solar_formulation(Budget::unlimited());
        let panel = &formulation.products()[0];
        let capacity = formulation.electricity_capacity(5);
        assert_approx_eq!(f64, capacity.coefficient(panel.units), 10.0);
        assert!(formulation.storage_consumed(5).num_terms() == 0);
    }

    #[test]
    fn test_unit_limit() {
        let (_, formulation) = solar_formulation(Budget::new(1000.0, 20.0));
        let panel = &formulation.products()[0];
        // (1000 - 500) / 100 = 5 from initial, 20 / 5 = 4 from monthly
        assert_approx_eq!(f64, formulation.unit_limit(panel), 4.0);

        let (_, formulation) = solar_formulation(Budget::unlimited());
        let panel = &formulation.products()[0];
        assert_approx_eq!(f64, formulation.unit_limit(panel), 10_000.0);

        let (_, formulation) = solar_formulation(Budget::new(400.0, 1000.0));
        let panel = &formulation.products()[0];
        assert_approx_eq!(f64, formulation.unit_limit(panel), 0.0);
    }

    #[test]
    fn test_is_limited_by_max_units() {
        let (_, formulation) = solar_formulation(Budget::unlimited());
        assert!(formulation.is_limited_by_max_units(&formulation.products()[0]));

        let (_, formulation) = solar_formulation(Budget::new(1000.0, 20.0));
        assert!(!formulation.is_limited_by_max_units(&formulation.products()[0]));

        // A budget which affords more than max_units doesn't limit the product
        let (_, formulation) = solar_formulation(Budget::new(1e7, 1e7));
        assert!(formulation.is_limited_by_max_units(&formulation.products()[0]));
    }

    #[test]
    fn test_storage_expressions() {
        let mut model = new_model();
        let mut inputs = flat_inputs(vec![solar_entry(), storage_entry()], 8.0);
        inputs.budget = Budget {
            initial: Some(Money(2500.0)),
            monthly: None,
            include_grid_cost: false,
        };
        let formulation = Formulation::new(&mut model, inputs).unwrap();
        let battery = &formulation.products()[1];
        assert_eq!(formulation.storage_products().count(), 1);
        assert_eq!(formulation.storage_stored(0).num_terms(), 1);
        assert_approx_eq!(
            f64,
            formulation
                .total_storage_capacity()
                .coefficient(battery.units),
            50.0
        );
        // (2500 - 300) / 200 = 11 units of 50
        assert_approx_eq!(f64, formulation.max_storage_capacity(), 550.0);
    }

    #[test]
    fn test_operational_cost_with_grid() {
        let mut model = new_model();
        let mut inputs = flat_inputs(vec![solar_entry()], 8.0);
        inputs.budget.include_grid_cost = true;
        let formulation = Formulation::new(&mut model, inputs).unwrap();
        let cost = formulation.operational_cost().unwrap();
        let usage = formulation.grid().usage_at(0).unwrap();
        // price 0.1 scaled from 24 hours to a month
        assert_approx_eq!(f64, cost.coefficient(usage), 0.1 * 730.0 / 24.0);
    }

    #[test]
    fn test_objective() {
        let mut model = new_model();
        let mut inputs = flat_inputs(vec![solar_entry()], 8.0);
        inputs.parameters.grid_penalty = crate::units::MoneyPerEnergy(1.0);
        let formulation = Formulation::new(&mut model, inputs).unwrap();
        let objective = formulation.objective().unwrap();
        let panel = &formulation.products()[0];
        let usage = formulation.grid().usage_at(3).unwrap();
        let sold = formulation.sold_at(3).unwrap();
        assert_approx_eq!(f64, objective.coefficient(panel.opened), 500.0);
        assert_approx_eq!(f64, objective.coefficient(panel.units), 105.0);
        assert_approx_eq!(f64, objective.coefficient(usage), 1.1);
        assert_approx_eq!(f64, objective.coefficient(sold), -0.05);
    }

    #[test]
    fn test_missing_capacity_profile() {
        let mut model = new_model();
        let mut inputs = flat_inputs(vec![solar_entry()], 8.0);
        inputs.capacity = CapacityProfile::default();
        assert_error!(
            Formulation::new(&mut model, inputs),
            "Configuration error: No capacity factors provided for solar (needed by product \
            'panel')"
        );
        assert_eq!(model.num_variables(), 0);
    }

    #[test]
    fn test_invalid_hours() {
        let mut model = new_model();
        let mut inputs = flat_inputs(vec![solar_entry()], 8.0);
        inputs.hours = vec![5, 2];
        assert_error!(
            Formulation::new(&mut model, inputs),
            "Configuration error: Modelled hours must be strictly increasing"
        );
    }
}
