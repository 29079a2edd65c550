//! Demand must be met in every modelled hour.
use super::{ConstraintSet, Derivation, FamilyState};
use crate::project::Formulation;
use anyhow::Result;

/// Requires generation, storage discharge and grid imports to cover demand in every hour.
///
/// There is no unmet-demand variable, so if no combination of products can meet demand the model
/// is infeasible.
#[derive(Debug, Default)]
pub struct DemandConstraint {
    state: FamilyState,
}

impl ConstraintSet for DemandConstraint {
    fn name(&self) -> &'static str {
        "demand"
    }

    fn derive(&self, formulation: &Formulation) -> Result<Derivation> {
        let constraints = formulation
            .hours()
            .iter()
            .map(|&hour| {
                let supply = formulation.electricity_capacity(hour)
                    + formulation.storage_consumed(hour)
                    + formulation.grid_usage(hour)?;
                Ok(supply.geq(formulation.demand_at(hour)))
            })
            .collect::<Result<_>>()?;

        Ok(Derivation {
            constraints,
            big_m_links: Vec::new(),
        })
    }

    fn state(&self) -> &FamilyState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut FamilyState {
        &mut self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::Budget;
    use crate::fixture::solar_formulation;
    use crate::solver::{Relation, SolverModel};
    use float_cmp::assert_approx_eq;

    #[test]
    fn test_one_constraint_per_hour() {
        let (_, formulation) = solar_formulation(Budget::unlimited());
        let derivation = DemandConstraint::default().derive(&formulation).unwrap();
        assert_eq!(derivation.constraints.len(), formulation.hours().len());

        let panel = &formulation.products()[0];
        let usage = formulation.grid().usage_at(0).unwrap();
        let constraint = &derivation.constraints[0];
        assert_eq!(constraint.relation(), Relation::GreaterOrEqual);
        assert_approx_eq!(f64, constraint.rhs(), 8.0);
        assert_approx_eq!(f64, constraint.expr().coefficient(panel.units), 10.0);
        assert_approx_eq!(f64, constraint.expr().coefficient(usage), 1.0);
    }

    #[test]
    fn test_rebuild_replaces_constraints() {
        let (mut model, formulation) = solar_formulation(Budget::unlimited());
        let mut demand = DemandConstraint::default();
        demand.rebuild(&mut model, &formulation).unwrap();
        let first: Vec<_> = model.constraints().into_iter().cloned().collect();
        assert_eq!(demand.num_constraints(), 24);

        demand.rebuild(&mut model, &formulation).unwrap();
        let second: Vec<_> = model.constraints().into_iter().cloned().collect();
        assert_eq!(demand.num_constraints(), 24);
        assert_eq!(first, second);
    }
}
