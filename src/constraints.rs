//! Families of constraints which are registered with the solver model.
//!
//! Each family derives its constraints from the current state of a [`Formulation`] and owns the
//! handles of the constraints it has registered, so that it can retract them and register a fresh
//! set when the inputs change.
use crate::error::OffGridError;
use crate::project::Formulation;
use crate::solver::{ConstraintHandle, LinearConstraint, LinearExpr, Solution, SolverModel};
use anyhow::{Context, Result};
use log::{debug, warn};

mod budget;
pub use budget::{Budget, BudgetConstraint};
mod demand;
pub use demand::DemandConstraint;
mod product;
pub use product::ProductConstraint;

/// Big-M values larger than this are likely to cause numerical trouble in the solver
const LARGE_BIG_M: f64 = 1e9;

/// Relative tolerance used when checking that a big-M value was large enough
const BIG_M_TOLERANCE: f64 = 1e-6;

/// Calculate a big-M value for a quantity which is a sum of terms with known upper bounds.
///
/// The result is the smallest value which can never bind: the sum of the upper bounds.
///
/// # Arguments
///
/// * `upper_bounds` - The declared maximum of each term of the linked quantity
pub fn big_m<I>(upper_bounds: I) -> Result<f64>
where
    I: IntoIterator<Item = f64>,
{
    let mut total = 0.0;
    for bound in upper_bounds {
        if !bound.is_finite() || bound < 0.0 {
            Err(OffGridError::NumericConfiguration(format!(
                "Cannot derive big-M from bound {bound}: bounds must be finite and non-negative"
            )))?;
        }
        total += bound;
    }

    if !total.is_finite() {
        Err(OffGridError::NumericConfiguration(
            "Big-M value overflowed".into(),
        ))?;
    }
    if total > LARGE_BIG_M {
        warn!("Big-M value {total} is very large and may cause numerical problems");
    }

    Ok(total)
}

/// A big-M link between a binary indicator and a quantity, recorded for checking after a solve
#[derive(Debug, Clone, PartialEq)]
pub struct BigMLink {
    /// Describes which quantity is linked
    pub name: String,
    /// The big-M value used
    pub big_m: f64,
    /// The quantity which must never exceed `big_m`
    pub quantity: LinearExpr,
    /// The configured parameter `big_m` was taken from, if it is not a true bound of the quantity.
    ///
    /// A quantity which reaches such a value may have been cut off by it.
    pub configured_cap: Option<&'static str>,
}

impl BigMLink {
    /// Check that the linked quantity in the solution is strictly governed by the big-M value
    pub fn check(&self, solution: &Solution) -> Result<()> {
        let value = solution.evaluate(&self.quantity);
        let tolerance = BIG_M_TOLERANCE * self.big_m.max(1.0);
        if value > self.big_m + tolerance {
            Err(OffGridError::NumericConfiguration(format!(
                "Big-M value {} for {} is smaller than the linked quantity ({value})",
                self.big_m, self.name
            )))?;
        }
        if let Some(cap) = self.configured_cap
            && value >= self.big_m - tolerance
        {
            Err(OffGridError::NumericConfiguration(format!(
                "{} reached the limit of {} set by {cap}, so the solution may be cut off. \
                Increase {cap} and solve again.",
                self.name, self.big_m
            )))?;
        }

        Ok(())
    }

    /// Whether the linked quantity in the solution is within the big-M value
    pub fn holds_for(&self, solution: &Solution) -> bool {
        self.check(solution).is_ok()
    }
}

/// Check that no linked quantity in the solution exceeds its big-M value, or reaches one which
/// comes from a configured cap.
///
/// A quantity at or above such a value means the linking constraint was binding, so the solution
/// may be wrong.
pub fn check_big_m<'a, I>(links: I, solution: &Solution) -> Result<()>
where
    I: IntoIterator<Item = &'a BigMLink>,
{
    for link in links {
        link.check(solution)?;
    }

    Ok(())
}

/// The constraints derived by a family from the current inputs
#[derive(Debug, Default)]
pub struct Derivation {
    /// The constraints to register
    pub constraints: Vec<LinearConstraint>,
    /// The big-M links which the constraints rely on
    pub big_m_links: Vec<BigMLink>,
}

/// What a constraint family has registered with the model
#[derive(Debug, Default)]
pub struct FamilyState {
    handles: Vec<ConstraintHandle>,
    big_m_links: Vec<BigMLink>,
}

/// A family of constraints which can be rebuilt from a [`Formulation`]
pub trait ConstraintSet {
    /// The name of the family, for logging
    fn name(&self) -> &'static str;

    /// Derive the full set of constraints for the current inputs
    fn derive(&self, formulation: &Formulation) -> Result<Derivation>;

    /// The family's registered constraints
    fn state(&self) -> &FamilyState;

    /// The family's registered constraints (mutable)
    fn state_mut(&mut self) -> &mut FamilyState;

    /// Replace all constraints registered by this family with ones derived from the current
    /// inputs.
    ///
    /// The new constraints are derived before anything is retracted, so if derivation fails the
    /// previous constraints are left in place.
    fn rebuild<M: SolverModel>(&mut self, model: &mut M, formulation: &Formulation) -> Result<()>
    where
        Self: Sized,
    {
        let name = self.name();
        let derivation = self
            .derive(formulation)
            .with_context(|| format!("Could not derive {name} constraints"))?;

        let state = self.state_mut();
        for handle in state.handles.drain(..) {
            model.remove_constraint(handle)?;
        }
        state.handles = derivation
            .constraints
            .into_iter()
            .map(|constraint| model.add_constraint(constraint))
            .collect();
        state.big_m_links = derivation.big_m_links;
        debug!("Registered {} {name} constraints", state.handles.len());

        Ok(())
    }

    /// The number of constraints currently registered by this family
    fn num_constraints(&self) -> usize {
        self.state().handles.len()
    }

    /// The big-M links used by the registered constraints
    fn big_m_links(&self) -> &[BigMLink] {
        &self.state().big_m_links
    }
}
