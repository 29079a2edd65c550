//! Fixtures for tests

use crate::constraints::Budget;
use crate::product::{EnergyType, ProductRaw};
use crate::profile::{CapacityProfile, DemandProfile, HourlyProfile};
use crate::project::{Formulation, ProjectInputs, ProjectParameters};
use crate::solver::{HighsModel, SolverOptions, SolverSession};
use crate::units::{Dimensionless, Energy, Money};
use indexmap::indexmap;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// A fresh, empty solver model
pub fn new_model() -> HighsModel {
    SolverSession::new(SolverOptions::default()).create_model("test")
}

/// A solar panel with 10 units of energy per hour
pub fn solar_entry() -> ProductRaw {
    ProductRaw {
        name: "panel".into(),
        utility_type: "electricity".into(),
        energy_type: "solar".into(),
        opening_cost: Money(500.0),
        incremental_cost: Money(100.0),
        maintenance_cost: Money(5.0),
        capacity: Energy(10.0),
        amortization: Dimensionless(0.0),
    }
}

/// A battery storing 50 units of energy
pub fn storage_entry() -> ProductRaw {
    ProductRaw {
        name: "battery".into(),
        utility_type: "electricity".into(),
        energy_type: "storage".into(),
        opening_cost: Money(300.0),
        incremental_cost: Money(200.0),
        maintenance_cost: Money(2.0),
        capacity: Energy(50.0),
        amortization: Dimensionless(0.0),
    }
}

/// Inputs for one day with constant sunshine and demand, and no grid connection
pub fn flat_inputs(catalog: Vec<ProductRaw>, demand: f64) -> ProjectInputs {
    ProjectInputs {
        catalog,
        grid_prices: HourlyProfile::constant(0.1),
        allow_grid: false,
        sell_fraction: Dimensionless(0.5),
        capacity: CapacityProfile::new(indexmap! {
            EnergyType::Solar => HourlyProfile::constant(1.0)
        })
        .unwrap(),
        demand: DemandProfile::flat(demand).unwrap(),
        hours: (0..24).collect(),
        budget: Budget::unlimited(),
        parameters: ProjectParameters::default(),
    }
}

/// A solar-only formulation with the given budget
pub fn solar_formulation(budget: Budget) -> (HighsModel, Formulation) {
    let mut model = new_model();
    let inputs = ProjectInputs {
        budget,
        ..flat_inputs(vec![solar_entry()], 8.0)
    };
    let formulation = Formulation::new(&mut model, inputs).unwrap();

    (model, formulation)
}
