//! The capabilities required of a mixed-integer linear programming solver.
//!
//! The formulation code only talks to the [`SolverModel`] trait, so any MILP solver which can
//! create variables, add and remove linear constraints, set an objective and report the values of
//! variables after optimisation can be used. [`HighsModel`] provides an implementation on top of
//! the HiGHS solver.
use anyhow::Result;

mod expression;
pub use expression::{LinearConstraint, LinearExpr, Relation};
mod highs;
pub use highs::{HighsModel, SolverOptions, SolverSession};

/// A decision variable in the optimisation.
///
/// Note that this type does **not** include the value of the variable; it just refers to a
/// particular column of the problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variable(usize);

impl Variable {
    /// Create a reference to the variable with the given index
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// The index of the variable in its model
    pub fn index(self) -> usize {
        self.0
    }
}

/// The domain of a decision variable. All variables are non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    /// Any non-negative real value
    Continuous,
    /// Any non-negative integer value
    Integer,
    /// Either zero or one
    Binary,
}

/// A handle to a constraint registered with a [`SolverModel`].
///
/// Handles can't be copied: whoever adds a constraint owns it and is responsible for removing it.
///
/// A model may reuse the slot of a removed constraint, so a handle also records which generation
/// of its slot it refers to.
#[derive(Debug, PartialEq, Eq)]
pub struct ConstraintHandle {
    index: usize,
    generation: u32,
}

impl ConstraintHandle {
    /// Create a handle for the constraint in the given slot and generation
    pub fn new(index: usize, generation: u32) -> Self {
        Self { index, generation }
    }

    /// The index of the constraint's slot in its model
    pub fn index(&self) -> usize {
        self.index
    }

    /// How many times the slot had been reused when the constraint was added
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// Whether to minimise or maximise the objective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObjectiveSense {
    /// Minimise the objective
    #[default]
    Minimise,
    /// Maximise the objective
    Maximise,
}

/// The values of all variables in an optimal solution
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    values: Vec<f64>,
    objective_value: f64,
}

impl Solution {
    /// Create a new [`Solution`] from column values, in variable index order
    pub fn new(values: Vec<f64>, objective: &LinearExpr) -> Self {
        let mut solution = Self {
            values,
            objective_value: 0.0,
        };
        solution.objective_value = solution.evaluate(objective);
        solution
    }

    /// The concretized value of a variable
    pub fn value(&self, var: Variable) -> f64 {
        self.values[var.index()]
    }

    /// The concretized value of an expression
    pub fn evaluate(&self, expr: &LinearExpr) -> f64 {
        expr.terms()
            .map(|(var, coeff)| coeff * self.value(var))
            .sum::<f64>()
            + expr.constant_value()
    }

    /// The value of the objective at the solution
    pub fn objective_value(&self) -> f64 {
        self.objective_value
    }
}

/// A mixed-integer linear programming model
pub trait SolverModel {
    /// Add a new decision variable to the model
    fn add_variable(&mut self, kind: VariableKind) -> Variable;

    /// Register a constraint, returning a handle which can be used to remove it again
    fn add_constraint(&mut self, constraint: LinearConstraint) -> ConstraintHandle;

    /// Remove a previously registered constraint
    fn remove_constraint(&mut self, handle: ConstraintHandle) -> Result<()>;

    /// Set the objective of the model, replacing any previous objective
    fn set_objective(&mut self, sense: ObjectiveSense, objective: LinearExpr);

    /// Solve the model.
    ///
    /// Fails with [`crate::error::OffGridError::InfeasibleModel`] if the model is infeasible or
    /// unbounded.
    fn optimise(&mut self) -> Result<Solution>;

    /// The constraints currently registered with the model
    fn constraints(&self) -> Vec<&LinearConstraint>;

    /// The number of variables in the model
    fn num_variables(&self) -> usize;

    /// Add a new non-negative continuous variable
    fn add_continuous(&mut self) -> Variable {
        self.add_variable(VariableKind::Continuous)
    }

    /// Add a new non-negative integer variable
    fn add_integer(&mut self) -> Variable {
        self.add_variable(VariableKind::Integer)
    }

    /// Add a new binary variable
    fn add_binary(&mut self) -> Variable {
        self.add_variable(VariableKind::Binary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn test_solution_evaluate() {
        let x = Variable::new(0);
        let y = Variable::new(1);
        let objective = x * 2.0 + y;
        let solution = Solution::new(vec![3.0, 4.0], &objective);
        assert_approx_eq!(f64, solution.value(y), 4.0);
        assert_approx_eq!(f64, solution.objective_value(), 10.0);
        assert_approx_eq!(f64, solution.evaluate(&(objective - 5.0)), 5.0);
    }
}
