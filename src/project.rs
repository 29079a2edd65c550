//! The project: owns the solver model and everything formulated against it.
use crate::constraints::{
    BigMLink, Budget, BudgetConstraint, ConstraintSet, DemandConstraint, ProductConstraint,
    check_big_m,
};
use crate::error::{OffGridError, find_offgrid_error};
use crate::profile::{CapacityProfile, DemandProfile};
use crate::solver::{LinearExpr, ObjectiveSense, Solution, SolverModel};
use anyhow::{Context, Result};
use log::{debug, info};
use std::fmt;

mod formulation;
pub use formulation::{Formulation, ProjectInputs};
mod parameters;
pub use parameters::ProjectParameters;
pub mod report;
use report::{CostBreakdown, HourlyResult, Report, SelectedProduct};

/// How much `max_units` is raised by when checking whether it cuts off part of the solution space
const RELAXED_MAX_UNITS_FACTOR: u32 = 10;

/// Relative improvement in the objective which counts as `max_units` having cut off a solution
const RELAXED_OBJECTIVE_TOLERANCE: f64 = 1e-3;

/// Whether an error is the solver reporting an infeasible model
fn is_infeasible(err: &anyhow::Error) -> bool {
    matches!(
        find_offgrid_error(err),
        Some(OffGridError::InfeasibleModel(_))
    )
}

/// The lifecycle stage of a [`Project`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectStatus {
    /// All components and constraints are registered with the model
    Built,
    /// The model has been solved
    Optimized,
    /// A report has been generated from the solution
    Reported,
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Built => "built",
            Self::Optimized => "optimized",
            Self::Reported => "reported",
        };
        write!(f, "{name}")
    }
}

/// A project's stage, along with the solution once there is one
#[derive(Debug)]
enum State {
    Built,
    Optimized(Solution),
    Reported(Solution),
}

/// An off-grid installation sizing problem formulated against a solver model.
///
/// There is exactly one project per model.
pub struct Project<M: SolverModel> {
    model: M,
    formulation: Formulation,
    demand_constraint: DemandConstraint,
    product_constraint: ProductConstraint,
    budget_constraint: BudgetConstraint,
    state: State,
}

impl<M: SolverModel> Project<M> {
    /// Build a project against a fresh solver model.
    ///
    /// Inputs are validated before anything is added to the model.
    ///
    /// # Arguments
    ///
    /// * `model` - An empty solver model, which the project takes ownership of
    /// * `inputs` - The products, profiles, hours and budget to formulate
    pub fn build(mut model: M, inputs: ProjectInputs) -> Result<Self> {
        if model.num_variables() > 0 || !model.constraints().is_empty() {
            Err(OffGridError::InvalidState(
                "A project must be built against an empty model".into(),
            ))?;
        }

        let formulation = Formulation::new(&mut model, inputs)?;
        let mut project = Self {
            model,
            formulation,
            demand_constraint: DemandConstraint::default(),
            product_constraint: ProductConstraint::default(),
            budget_constraint: BudgetConstraint::default(),
            state: State::Built,
        };
        project.rebuild()?;

        Ok(project)
    }

    /// The current lifecycle stage
    pub fn status(&self) -> ProjectStatus {
        match self.state {
            State::Built => ProjectStatus::Built,
            State::Optimized(_) => ProjectStatus::Optimized,
            State::Reported(_) => ProjectStatus::Reported,
        }
    }

    /// The formulated inputs and variables
    pub fn formulation(&self) -> &Formulation {
        &self.formulation
    }

    /// The underlying solver model
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Rebuild every constraint family and the objective from the current inputs
    pub fn rebuild(&mut self) -> Result<()> {
        self.demand_constraint
            .rebuild(&mut self.model, &self.formulation)?;
        self.product_constraint
            .rebuild(&mut self.model, &self.formulation)?;
        self.budget_constraint
            .rebuild(&mut self.model, &self.formulation)?;
        self.reset_objective()
    }

    /// Set the objective from the current inputs and discard any solution
    fn reset_objective(&mut self) -> Result<()> {
        let objective = self.formulation.objective()?;
        self.model.set_objective(ObjectiveSense::Minimise, objective);
        self.state = State::Built;

        Ok(())
    }

    /// Replace the demand profile and rebuild the affected constraints
    pub fn set_demand_profile(&mut self, demand: DemandProfile) -> Result<()> {
        self.formulation.set_demand(demand);
        self.demand_constraint
            .rebuild(&mut self.model, &self.formulation)?;
        self.product_constraint
            .rebuild(&mut self.model, &self.formulation)?;
        self.reset_objective()
    }

    /// Replace the capacity factors and rebuild the affected constraints
    pub fn set_capacity_profile(&mut self, capacity: CapacityProfile) -> Result<()> {
        self.formulation.set_capacity(capacity)?;
        self.demand_constraint
            .rebuild(&mut self.model, &self.formulation)?;
        self.product_constraint
            .rebuild(&mut self.model, &self.formulation)?;
        self.reset_objective()
    }

    /// Replace the budget and rebuild the affected constraints
    pub fn set_budget(&mut self, budget: Budget) -> Result<()> {
        self.formulation.set_budget(budget)?;
        self.product_constraint
            .rebuild(&mut self.model, &self.formulation)?;
        self.budget_constraint
            .rebuild(&mut self.model, &self.formulation)?;
        self.reset_objective()
    }

    /// The number of constraints registered by the demand, product and budget families
    pub fn num_constraints(&self) -> (usize, usize, usize) {
        (
            self.demand_constraint.num_constraints(),
            self.product_constraint.num_constraints(),
            self.budget_constraint.num_constraints(),
        )
    }

    /// The big-M links used by the registered constraints
    pub fn big_m_links(&self) -> impl Iterator<Item = &BigMLink> {
        self.demand_constraint
            .big_m_links()
            .iter()
            .chain(self.product_constraint.big_m_links())
            .chain(self.budget_constraint.big_m_links())
    }

    /// Solve the model.
    ///
    /// If the model is infeasible or a big-M value turns out to be too small, the project stays
    /// in the [`ProjectStatus::Built`] stage and no results are available.
    ///
    /// When the number of units of some product is limited by `max_units` rather than by the
    /// budgets, the model is solved again with a larger `max_units`. If that finds a feasible or
    /// cheaper solution where the first solve didn't, `max_units` was cutting off part of the
    /// solution space and a numeric configuration error is returned.
    pub fn optimize(&mut self) -> Result<()> {
        self.state = State::Built;
        let solution = match self.model.optimise() {
            Ok(solution) => solution,
            Err(err) => return Err(self.diagnose_infeasibility(err)),
        };
        check_big_m(self.big_m_links(), &solution)
            .context("Solution is not trustworthy: a big-M value was too small")?;
        self.check_max_units(&solution)?;

        info!(
            "Found optimal solution with objective value {}",
            solution.objective_value()
        );
        self.state = State::Optimized(solution);

        Ok(())
    }

    /// The larger `max_units` to solve with, if some product is limited by `max_units`
    fn relaxed_max_units(&self) -> Option<u32> {
        let formulation = &self.formulation;
        if !formulation
            .products()
            .iter()
            .any(|product| formulation.is_limited_by_max_units(product))
        {
            return None;
        }

        let max_units = formulation.parameters().max_units;
        let relaxed = max_units.saturating_mul(RELAXED_MAX_UNITS_FACTOR);
        (relaxed > max_units).then_some(relaxed)
    }

    /// Check that a solution isn't improved on by raising `max_units`
    fn check_max_units(&mut self, solution: &Solution) -> Result<()> {
        let Some(relaxed) = self.relaxed_max_units() else {
            return Ok(());
        };
        let Some(relaxed_objective) = self.objective_with_max_units(relaxed)? else {
            return Ok(());
        };

        let objective = solution.objective_value();
        let tolerance = RELAXED_OBJECTIVE_TOLERANCE * objective.abs().max(1.0);
        if relaxed_objective < objective - tolerance {
            Err(OffGridError::NumericConfiguration(format!(
                "Solution is cut off by max_units = {}: with max_units = {relaxed} the objective \
                falls from {objective} to {relaxed_objective}. Increase max_units and solve again.",
                self.formulation.parameters().max_units
            )))?;
        }

        Ok(())
    }

    /// Work out whether an infeasible model is only infeasible because of `max_units`.
    ///
    /// If raising `max_units` makes the model feasible, a numeric configuration error is returned
    /// in place of `err`. Otherwise `err` is returned unchanged.
    fn diagnose_infeasibility(&mut self, err: anyhow::Error) -> anyhow::Error {
        if !is_infeasible(&err) {
            return err;
        }
        let Some(relaxed) = self.relaxed_max_units() else {
            return err;
        };

        match self.objective_with_max_units(relaxed) {
            Ok(Some(_)) => OffGridError::NumericConfiguration(format!(
                "Model is infeasible with max_units = {}, but feasible with max_units = \
                {relaxed}. Increase max_units and solve again.",
                self.formulation.parameters().max_units
            ))
            .into(),
            Ok(None) => err,
            Err(diagnosis_err) => {
                diagnosis_err.context("Could not check whether max_units made the model infeasible")
            }
        }
    }

    /// Solve the model with a different `max_units`, then restore the product constraints.
    ///
    /// Returns the objective value, or `None` if the model is infeasible.
    fn objective_with_max_units(&mut self, max_units: u32) -> Result<Option<f64>> {
        debug!("Solving again with max_units = {max_units}");
        let original = self.formulation.parameters().max_units;
        self.formulation.set_max_units(max_units);
        let result = self
            .product_constraint
            .rebuild(&mut self.model, &self.formulation)
            .and_then(|()| self.model.optimise());

        self.formulation.set_max_units(original);
        self.product_constraint
            .rebuild(&mut self.model, &self.formulation)?;

        match result {
            Ok(solution) => Ok(Some(solution.objective_value())),
            Err(err) if is_infeasible(&err) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// The solution, if the model has been solved
    pub fn solution(&self) -> Result<&Solution> {
        match &self.state {
            State::Optimized(solution) | State::Reported(solution) => Ok(solution),
            State::Built => Err(OffGridError::InvalidState(
                "Results are only available after a successful optimization".into(),
            )
            .into()),
        }
    }

    /// The concretized value of an expression
    pub fn value_of(&self, expr: &LinearExpr) -> Result<f64> {
        Ok(self.solution()?.evaluate(expr))
    }

    /// The products with at least one unit installed
    pub fn selected_products(&self) -> Result<Vec<SelectedProduct>> {
        Ok(report::selected_products(&self.formulation, self.solution()?))
    }

    /// The costs of the solution
    pub fn cost_breakdown(&self) -> Result<CostBreakdown> {
        report::cost_breakdown(&self.formulation, self.solution()?)
    }

    /// The state of the system in each modelled hour
    pub fn hourly_series(&self) -> Result<Vec<HourlyResult>> {
        report::hourly_series(&self.formulation, self.solution()?)
    }

    /// Gather all results, moving the project to the [`ProjectStatus::Reported`] stage
    pub fn report(&mut self) -> Result<Report> {
        let report = Report {
            selected_products: self.selected_products()?,
            grid: report::grid_summary(&self.formulation, self.solution()?),
            costs: self.cost_breakdown()?,
            hourly: self.hourly_series()?,
        };

        self.state = match std::mem::replace(&mut self.state, State::Built) {
            State::Optimized(solution) | State::Reported(solution) => State::Reported(solution),
            State::Built => State::Built,
        };

        Ok(report)
    }
}
