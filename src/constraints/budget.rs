//! Limits on capital and operational spending.
use super::{ConstraintSet, Derivation, FamilyState};
use crate::project::Formulation;
use crate::units::Money;
use anyhow::{Result, ensure};
use serde::Deserialize;

/// Spending limits for a project. A missing (or infinite) limit means no limit.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Budget {
    /// Limit on capital spending (opening and incremental costs)
    #[serde(default)]
    pub initial: Option<Money>,
    /// Limit on monthly spending (maintenance and, optionally, grid costs)
    #[serde(default)]
    pub monthly: Option<Money>,
    /// Whether the monthly grid bill counts towards the monthly limit
    #[serde(default)]
    pub include_grid_cost: bool,
}

impl Budget {
    /// A budget with no limits
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// A budget with the given capital and monthly limits
    pub fn new(initial: f64, monthly: f64) -> Self {
        Self {
            initial: Some(Money(initial)),
            monthly: Some(Money(monthly)),
            include_grid_cost: false,
        }
    }

    /// The capital limit, if there is one
    pub fn initial_limit(&self) -> Option<Money> {
        self.initial.filter(|limit| limit.is_finite())
    }

    /// The monthly limit, if there is one
    pub fn monthly_limit(&self) -> Option<Money> {
        self.monthly.filter(|limit| limit.is_finite())
    }

    /// Check that the limits are usable
    pub fn validate(&self) -> Result<()> {
        for (name, limit) in [("initial", self.initial), ("monthly", self.monthly)] {
            if let Some(limit) = limit {
                ensure!(
                    !limit.value().is_nan() && limit >= Money(0.0),
                    "The {name} budget cannot be negative"
                );
            }
        }

        Ok(())
    }
}

/// Keeps capital and operational costs within the budget
#[derive(Debug, Default)]
pub struct BudgetConstraint {
    state: FamilyState,
}

impl ConstraintSet for BudgetConstraint {
    fn name(&self) -> &'static str {
        "budget"
    }

    fn derive(&self, formulation: &Formulation) -> Result<Derivation> {
        let budget = formulation.budget();
        let mut derivation = Derivation::default();

        if let Some(initial) = budget.initial_limit() {
            derivation
                .constraints
                .push(formulation.capital_cost().leq(initial.value()));
        }
        if let Some(monthly) = budget.monthly_limit() {
            derivation
                .constraints
                .push(formulation.operational_cost()?.leq(monthly.value()));
        }

        Ok(derivation)
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
    use crate::fixture::{assert_error, solar_formulation};
    use crate::solver::Relation;
    use float_cmp::assert_approx_eq;

    #[test]
    fn test_budget_limits() {
        let budget = Budget {
            initial: Some(Money(f64::INFINITY)),
            monthly: Some(Money(100.0)),
            include_grid_cost: false,
        };
        assert!(budget.initial_limit().is_none());
        assert_eq!(budget.monthly_limit(), Some(Money(100.0)));
        assert!(budget.validate().is_ok());
        assert_error!(
            Budget::new(-1.0, 0.0).validate(),
            "The initial budget cannot be negative"
        );
    }

    #[test]
    fn test_deserialise_budget() {
        let budget: Budget = toml::from_str("monthly = 50.0").unwrap();
        assert_eq!(budget.initial, None);
        assert_eq!(budget.monthly, Some(Money(50.0)));
        assert!(!budget.include_grid_cost);
    }

    #[test]
    fn test_unlimited_budget_has_no_constraints() {
        let (_, formulation) = solar_formulation(Budget::unlimited());
        let derivation = BudgetConstraint::default().derive(&formulation).unwrap();
        assert!(derivation.constraints.is_empty());
    }

    #[test]
    fn test_budget_constraints() {
        let (_, formulation) = solar_formulation(Budget::new(1000.0, 20.0));
        let derivation = BudgetConstraint::default().derive(&formulation).unwrap();
        assert_eq!(derivation.constraints.len(), 2);

        let capital = &derivation.constraints[0];
        assert_eq!(capital.relation(), Relation::LessOrEqual);
        assert_approx_eq!(f64, capital.rhs(), 1000.0);
        let panel = &formulation.products()[0];
        assert_approx_eq!(f64, capital.expr().coefficient(panel.opened), 500.0);
        assert_approx_eq!(f64, capital.expr().coefficient(panel.units), 100.0);

        let operational = &derivation.constraints[1];
        assert_approx_eq!(f64, operational.rhs(), 20.0);
        assert_approx_eq!(f64, operational.expr().coefficient(panel.units), 5.0);
        // Grid costs aren't included by default
        assert_eq!(operational.expr().num_terms(), 1);
        assert!(derivation.big_m_links.is_empty());
    }
}
