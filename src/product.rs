//! Candidate products which can be installed, and the decision variables describing how many
//! units of each are chosen.
use crate::error::OffGridError;
use crate::hour::Hour;
use crate::id::{ProductID, check_unique_ids};
use crate::solver::{LinearExpr, Solution, SolverModel, Variable};
use crate::units::{Dimensionless, Energy, Money};
use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{Display, EnumIter, EnumString};

/// The kind of energy a product delivers
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum UtilityType {
    /// Electrical power
    Electricity,
    /// Heat
    Heat,
}

/// The source of the energy a product delivers
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    EnumString,
    EnumIter,
    Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum EnergyType {
    /// Photovoltaic panels
    Solar,
    /// Wind turbines
    Wind,
    /// Geothermal plant
    Geothermal,
    /// Biomass generator
    Biomass,
    /// Battery storage
    Storage,
}

impl EnergyType {
    /// Whether the output of this energy type varies with the weather.
    ///
    /// Products of these types need an hourly capacity factor profile; all others produce at
    /// their nameplate capacity in every hour.
    pub fn is_weather_dependent(self) -> bool {
        matches!(self, Self::Solar | Self::Wind)
    }
}

/// An entry in the product catalog, as read from the project file
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ProductRaw {
    /// Unique name of the product
    pub name: String,
    /// The kind of energy delivered (e.g. "electricity")
    #[serde(alias = "ut")]
    pub utility_type: String,
    /// The source of the energy (e.g. "solar")
    #[serde(alias = "et")]
    pub energy_type: String,
    /// One-off cost paid once per energy type if any unit of that type is installed
    #[serde(alias = "oc")]
    pub opening_cost: Money,
    /// Cost per unit installed
    #[serde(alias = "ic")]
    pub incremental_cost: Money,
    /// Recurring monthly cost per unit installed
    #[serde(alias = "mc")]
    pub maintenance_cost: Money,
    /// Energy per hour per unit, or storage capacity per unit for storage products
    #[serde(alias = "ca")]
    pub capacity: Energy,
    /// Amortization factor (not used in the formulation)
    #[serde(alias = "am", default)]
    pub amortization: Dimensionless,
}

/// The costs associated with a product
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProductCost {
    /// Paid once if the product's energy type is opened
    pub opening: Money,
    /// Paid per unit installed
    pub incremental: Money,
    /// Paid monthly per unit installed
    pub maintenance: Money,
}

/// Per-hour decision variables for a storage product
#[derive(Debug, Clone, PartialEq)]
pub struct StorageVariables {
    /// Energy routed into storage in each hour
    pub stored: IndexMap<Hour, Variable>,
    /// Energy drawn from storage in each hour
    pub consumed: IndexMap<Hour, Variable>,
}

/// A candidate product along with its decision variables
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    /// Unique identifier
    pub id: ProductID,
    /// The kind of energy delivered
    pub utility_type: UtilityType,
    /// The source of the energy
    pub energy_type: EnergyType,
    /// Cost attributes
    pub cost: ProductCost,
    /// Energy per hour per unit (or storage capacity per unit)
    pub capacity: Energy,
    /// Amortization factor (informational)
    pub amortization: Dimensionless,
    /// Binary: whether the opening cost is incurred
    pub opened: Variable,
    /// Integer: the number of units installed
    pub units: Variable,
    /// Hourly variables, present only for storage products
    pub storage: Option<StorageVariables>,
}

/// Parse the string in a catalog entry into a typed value
fn parse_field<T: FromStr>(value: &str, field: &str, product: &str) -> Result<T> {
    T::from_str(value.trim()).map_err(|_| {
        OffGridError::Configuration(format!(
            "Unknown {field} '{value}' for product '{product}'"
        ))
        .into()
    })
}

/// Check that a cost or capacity attribute of a catalog entry is usable
fn check_attribute(value: f64, field: &str, product: &str) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        Err(OffGridError::Configuration(format!(
            "{field} for product '{product}' must be a finite, non-negative number"
        )))?;
    }

    Ok(())
}

/// The validated attributes of a catalog entry, before any variables are bound
struct ValidatedEntry<'a> {
    raw: &'a ProductRaw,
    utility_type: UtilityType,
    energy_type: EnergyType,
}

fn validate_entry(raw: &ProductRaw) -> Result<ValidatedEntry<'_>> {
    if raw.name.trim().is_empty() {
        Err(OffGridError::Configuration(
            "Product name cannot be empty".into(),
        ))?;
    }
    let utility_type: UtilityType = parse_field(&raw.utility_type, "utility type", &raw.name)?;
    let energy_type: EnergyType = parse_field(&raw.energy_type, "energy type", &raw.name)?;

    check_attribute(raw.opening_cost.value(), "Opening cost", &raw.name)?;
    check_attribute(raw.incremental_cost.value(), "Incremental cost", &raw.name)?;
    check_attribute(raw.maintenance_cost.value(), "Maintenance cost", &raw.name)?;
    check_attribute(raw.capacity.value(), "Capacity", &raw.name)?;
    check_attribute(raw.amortization.value(), "Amortization", &raw.name)?;

    if energy_type == EnergyType::Storage && utility_type != UtilityType::Electricity {
        Err(OffGridError::Configuration(format!(
            "Storage product '{}' must have utility type electricity",
            raw.name
        )))?;
    }

    Ok(ValidatedEntry {
        raw,
        utility_type,
        energy_type,
    })
}

impl Product {
    /// Create one product per catalog entry, binding its decision variables to the model.
    ///
    /// The whole catalog is validated before any variable is created, so a malformed entry
    /// leaves the model untouched.
    ///
    /// # Arguments
    ///
    /// * `catalog` - The product catalog
    /// * `model` - The model to add decision variables to
    /// * `hours` - The modelled hours, used for the hourly storage variables
    pub fn create<M: SolverModel>(
        catalog: &[ProductRaw],
        model: &mut M,
        hours: &[Hour],
    ) -> Result<Vec<Product>> {
        let entries: Vec<_> = catalog
            .iter()
            .map(validate_entry)
            .collect::<Result<_>>()?;

        let ids: Vec<ProductID> = catalog.iter().map(|raw| raw.name.trim().into()).collect();
        check_unique_ids(&ids).map_err(|err| OffGridError::Configuration(err.to_string()))?;

        let products = entries
            .into_iter()
            .zip(ids)
            .map(|(entry, id)| {
                let opened = model.add_binary();
                let units = model.add_integer();
                let storage = (entry.energy_type == EnergyType::Storage).then(|| {
                    let stored = hours.iter().map(|&h| (h, model.add_continuous())).collect();
                    let consumed = hours.iter().map(|&h| (h, model.add_continuous())).collect();
                    StorageVariables { stored, consumed }
                });

                Product {
                    id,
                    utility_type: entry.utility_type,
                    energy_type: entry.energy_type,
                    cost: ProductCost {
                        opening: entry.raw.opening_cost,
                        incremental: entry.raw.incremental_cost,
                        maintenance: entry.raw.maintenance_cost,
                    },
                    capacity: entry.raw.capacity,
                    amortization: entry.raw.amortization,
                    opened,
                    units,
                    storage,
                }
            })
            .collect();

        Ok(products)
    }

    /// Whether this is a storage product
    pub fn is_storage(&self) -> bool {
        self.storage.is_some()
    }

    /// Whether this product generates electricity (i.e. isn't storage or heat)
    pub fn generates_electricity(&self) -> bool {
        self.utility_type == UtilityType::Electricity && !self.is_storage()
    }

    /// The opening cost incurred by this product
    pub fn opening_cost(&self) -> LinearExpr {
        self.opened * self.cost.opening.value()
    }

    /// The monthly maintenance cost for the installed units
    pub fn maintenance_cost(&self) -> LinearExpr {
        self.units * self.cost.maintenance.value()
    }

    /// The cost of the installed units
    pub fn incremental_cost(&self) -> LinearExpr {
        self.units * self.cost.incremental.value()
    }

    /// Total nameplate capacity of the installed units
    pub fn installed_capacity(&self) -> LinearExpr {
        self.units * self.capacity.value()
    }

    /// The variable for energy routed into storage at the given hour
    pub fn stored_at(&self, hour: Hour) -> Option<Variable> {
        self.storage.as_ref()?.stored.get(&hour).copied()
    }

    /// The variable for energy drawn from storage at the given hour
    pub fn consumed_at(&self, hour: Hour) -> Option<Variable> {
        self.storage.as_ref()?.consumed.get(&hour).copied()
    }

    /// The number of units installed in a solution
    pub fn units_in(&self, solution: &Solution) -> u32 {
        solution.value(self.units).round().max(0.0) as u32
    }

    /// Whether the opening cost was incurred in a solution
    pub fn is_opened_in(&self, solution: &Solution) -> bool {
        solution.value(self.opened) > 0.5
    }
}

/// Get the product with the given ID
pub fn find_product<'a>(products: &'a [Product], id: &str) -> Result<&'a Product> {
    products
        .iter()
        .find(|product| &*product.id.0 == id)
        .with_context(|| format!("Unknown product: {id}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::find_offgrid_error;
    use crate::fixture::{assert_error, new_model, solar_entry, storage_entry};
    use crate::solver::SolverModel;
    use rstest::rstest;

    #[rstest]
    #[case("solar", EnergyType::Solar)]
    #[case("Wind", EnergyType::Wind)]
    #[case("GEOTHERMAL", EnergyType::Geothermal)]
    #[case(" biomass ", EnergyType::Biomass)]
    #[case("storage", EnergyType::Storage)]
    fn test_parse_energy_type(#[case] input: &str, #[case] expected: EnergyType) {
        assert_eq!(
            parse_field::<EnergyType>(input, "energy type", "p").unwrap(),
            expected
        );
    }

    #[test]
    fn test_create_products() {
        let mut model = new_model();
        let hours = [0, 1, 2];
        let catalog = [solar_entry(), storage_entry()];
        let products = Product::create(&catalog, &mut model, &hours).unwrap();

        assert_eq!(products.len(), 2);
        let solar = &products[0];
        assert_eq!(solar.energy_type, EnergyType::Solar);
        assert!(!solar.is_storage());
        assert!(solar.generates_electricity());
        assert!(solar.stored_at(0).is_none());

        let storage = &products[1];
        assert!(storage.is_storage());
        assert!(!storage.generates_electricity());
        assert!(storage.stored_at(1).is_some());
        assert!(storage.consumed_at(2).is_some());
        assert!(storage.stored_at(3).is_none());

        // 2 variables each, plus 2 per hour for storage
        assert_eq!(model.num_variables(), 2 + 2 + 2 * hours.len());
    }

    #[test]
    fn test_cost_expressions() {
        let mut model = new_model();
        let products = Product::create(&[solar_entry()], &mut model, &[0]).unwrap();
        let solar = &products[0];
        assert_eq!(solar.opening_cost().coefficient(solar.opened), 500.0);
        assert_eq!(solar.incremental_cost().coefficient(solar.units), 100.0);
        assert_eq!(solar.maintenance_cost().coefficient(solar.units), 5.0);
        assert_eq!(solar.installed_capacity().coefficient(solar.units), 10.0);
    }

    #[test]
    fn test_unknown_energy_type() {
        let mut model = new_model();
        let mut entry = solar_entry();
        entry.energy_type = "nuclear".into();
        let err = Product::create(&[entry], &mut model, &[0]).unwrap_err();
        assert!(matches!(
            find_offgrid_error(&err),
            Some(OffGridError::Configuration(_))
        ));
        assert_eq!(
            err.to_string(),
            "Configuration error: Unknown energy type 'nuclear' for product 'panel'"
        );
        assert_eq!(model.num_variables(), 0);
    }

    #[test]
    fn test_unknown_utility_type() {
        let mut model = new_model();
        let mut entry = solar_entry();
        entry.utility_type = "steam".into();
        assert_error!(
            Product::create(&[entry], &mut model, &[0]),
            "Configuration error: Unknown utility type 'steam' for product 'panel'"
        );
    }

    #[test]
    fn test_duplicate_names() {
        let mut model = new_model();
        assert_error!(
            Product::create(&[solar_entry(), solar_entry()], &mut model, &[0]),
            "Configuration error: Duplicate ID found: panel"
        );
    }

    #[rstest]
    #[case(-1.0)]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    fn test_invalid_cost(#[case] value: f64) {
        let mut model = new_model();
        let mut entry = solar_entry();
        entry.incremental_cost = Money(value);
        assert_error!(
            Product::create(&[entry], &mut model, &[0]),
            "Configuration error: Incremental cost for product 'panel' must be a finite, \
            non-negative number"
        );
    }

    #[test]
    fn test_heat_storage_rejected() {
        let mut model = new_model();
        let mut entry = storage_entry();
        entry.utility_type = "heat".into();
        assert_error!(
            Product::create(&[entry], &mut model, &[0]),
            "Configuration error: Storage product 'battery' must have utility type electricity"
        );
    }

    #[test]
    fn test_catalog_aliases() {
        let entry: ProductRaw = toml::from_str(
            r#"
            name = "panel"
            ut = "electricity"
            et = "solar"
            oc = 500.0
            ic = 100.0
            mc = 5.0
            ca = 10.0
            am = 20.0
            "#,
        )
        .unwrap();
        assert_eq!(entry.energy_type, "solar");
        assert_eq!(entry.capacity, Energy(10.0));
        assert_eq!(entry.amortization, Dimensionless(20.0));
    }

    #[test]
    fn test_find_product() {
        let mut model = new_model();
        let products = Product::create(&[solar_entry()], &mut model, &[0]).unwrap();
        assert!(find_product(&products, "panel").is_ok());
        assert_error!(find_product(&products, "missing"), "Unknown product: missing");
    }
}
