//! Product selection logic and the storage balance.
//!
//! Every link between a binary indicator and a quantity uses a big-M value derived from the
//! declared upper bounds of that quantity, and is recorded so it can be checked after solving.
use super::{BigMLink, ConstraintSet, Derivation, FamilyState, big_m};
use crate::project::Formulation;
use crate::solver::LinearExpr;
use anyhow::Result;
use itertools::Itertools;

/// Links the binary indicators to the quantities they govern and conserves stored energy
#[derive(Debug, Default)]
pub struct ProductConstraint {
    state: FamilyState,
}

impl ProductConstraint {
    /// Upper bounds on the number of units of each product and on hourly grid imports.
    ///
    /// These are the bounds that the big-M values are derived from.
    fn add_bounds(formulation: &Formulation, derivation: &mut Derivation) -> Result<()> {
        for product in formulation.products() {
            derivation
                .constraints
                .push(LinearExpr::from(product.units).leq(formulation.unit_limit(product)));
        }

        let max_storage = formulation.max_storage_capacity();
        for &hour in formulation.hours() {
            let limit = formulation.demand_at(hour) + max_storage;
            derivation
                .constraints
                .push(formulation.grid_usage(hour)?.leq(limit));
        }

        Ok(())
    }

    /// Units of a product can only be installed if an opening cost for its type is paid, and
    /// at most one opening cost is paid per energy type.
    fn add_opening_costs(formulation: &Formulation, derivation: &mut Derivation) -> Result<()> {
        for product in formulation.products() {
            let m = big_m([formulation.unit_limit(product)])?;
            let opened: LinearExpr = formulation
                .products_of_type(product.energy_type)
                .map(|other| other.opened)
                .sum();
            derivation
                .constraints
                .push(LinearExpr::from(product.units).leq(opened * m));
            derivation.big_m_links.push(BigMLink {
                name: format!("units of {}", product.id),
                big_m: m,
                quantity: product.units.into(),
                configured_cap: formulation
                    .is_limited_by_max_units(product)
                    .then_some("max_units"),
            });
        }

        for energy_type in formulation.energy_types() {
            let opened: LinearExpr = formulation
                .products_of_type(energy_type)
                .map(|product| product.opened)
                .sum();
            derivation.constraints.push(opened.leq(1.0));
        }

        Ok(())
    }

    /// Grid imports and sales require a grid connection; storage throughput and capacity
    /// require storage to be installed.
    fn add_installed_links(formulation: &Formulation, derivation: &mut Derivation) -> Result<()> {
        let hours = formulation.hours();
        let grid = formulation.grid();
        let max_storage = formulation.max_storage_capacity();

        let m = big_m(
            hours
                .iter()
                .map(|&hour| formulation.demand_at(hour) + max_storage),
        )?;
        let usage = grid.total_usage();
        derivation
            .constraints
            .push(usage.clone().leq(grid.installed() * m));
        derivation.big_m_links.push(BigMLink {
            name: "grid usage".into(),
            big_m: m,
            quantity: usage,
            configured_cap: None,
        });

        let sold: LinearExpr = hours
            .iter()
            .map(|&hour| formulation.sold_at(hour))
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .sum();
        let m = big_m(hours.iter().map(|_| max_storage))?;
        derivation
            .constraints
            .push(sold.clone().leq(grid.installed() * m));
        derivation.big_m_links.push(BigMLink {
            name: "energy sold".into(),
            big_m: m,
            quantity: sold,
            configured_cap: None,
        });

        let storage_installed = formulation.storage_installed();
        let throughput: LinearExpr = hours
            .iter()
            .map(|&hour| formulation.storage_stored(hour) + formulation.storage_consumed(hour))
            .sum();
        let m = big_m(hours.iter().flat_map(|_| [max_storage, max_storage]))?;
        derivation
            .constraints
            .push(throughput.clone().leq(storage_installed * m));
        derivation.big_m_links.push(BigMLink {
            name: "storage throughput".into(),
            big_m: m,
            quantity: throughput,
            configured_cap: None,
        });

        let capacity = formulation.total_storage_capacity();
        let m = big_m(formulation.storage_products().map(|product| {
            formulation.unit_limit(product) * product.capacity.value()
        }))?;
        derivation
            .constraints
            .push(capacity.clone().leq(storage_installed * m));
        derivation.big_m_links.push(BigMLink {
            name: "storage capacity".into(),
            big_m: m,
            quantity: capacity,
            configured_cap: None,
        });

        Ok(())
    }

    /// The level of storage after each hour stays within the installed capacity, and energy
    /// can only be stored from that hour's surplus.
    ///
    /// The storage level is a running sum over the ordered hours, starting from the configured
    /// initial level.
    fn add_storage_balance(formulation: &Formulation, derivation: &mut Derivation) -> Result<()> {
        let capacity = formulation.total_storage_capacity();
        let initial_fraction = formulation.parameters().initial_storage.value();
        let mut level = capacity.clone() * initial_fraction;

        for &hour in formulation.hours() {
            let stored = formulation.storage_stored(hour);
            let consumed = formulation.storage_consumed(hour);
            let sold = formulation.sold_at(hour)?;

            level += stored.clone() - consumed.clone() - sold;
            derivation.constraints.push(level.clone().geq(0.0));
            derivation
                .constraints
                .push(level.clone().leq(capacity.clone()));

            let surplus = formulation.electricity_capacity(hour)
                + consumed.clone()
                + formulation.grid_usage(hour)?
                - formulation.demand_at(hour)
                - sold;
            derivation.constraints.push(stored.clone().leq(surplus));

            for flow in [stored, consumed, sold.into()] {
                derivation.constraints.push(flow.leq(capacity.clone()));
            }
        }

        Ok(())
    }
}

impl ConstraintSet for ProductConstraint {
    fn name(&self) -> &'static str {
        "product"
    }

    fn derive(&self, formulation: &Formulation) -> Result<Derivation> {
        let mut derivation = Derivation::default();
        Self::add_bounds(formulation, &mut derivation)?;
        Self::add_opening_costs(formulation, &mut derivation)?;
        Self::add_installed_links(formulation, &mut derivation)?;
        Self::add_storage_balance(formulation, &mut derivation)?;

        debug_assert!(
            derivation
                .big_m_links
                .iter()
                .map(|link| &link.name)
                .all_unique(),
            "big-M links should have unique names"
        );

        Ok(derivation)
    }

    fn state(&self) -> &FamilyState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut FamilyState {
        &mut self.state
    }
}
