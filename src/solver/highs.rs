//! A [`SolverModel`] backed by the HiGHS solver.
use super::{
    ConstraintHandle, LinearConstraint, LinearExpr, ObjectiveSense, Relation, Solution,
    SolverModel, Variable, VariableKind,
};
use crate::error::OffGridError;
use crate::log::solver_output_enabled;
use anyhow::{Context, Result, anyhow};
use highs::{HighsModelStatus, RowProblem as Problem, Sense};
use log::debug;
use serde::Deserialize;
use std::cell::Cell;
use std::collections::BTreeSet;
use std::rc::Rc;

/// Options passed to HiGHS for every model created in a [`SolverSession`]
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
pub struct SolverOptions {
    /// Wall-clock limit for a single solve, in seconds
    pub time_limit: Option<f64>,
    /// Relative gap at which the branch-and-bound search stops
    pub mip_rel_gap: Option<f64>,
    /// Whether to show the solver's own output on the console
    #[serde(default)]
    pub log_to_console: bool,
}

/// A solver environment shared by all the models a caller creates.
///
/// The session is constructed once and passed to whoever needs a fresh model.
pub struct SolverSession {
    options: Rc<SolverOptions>,
    models_created: Cell<usize>,
}

impl SolverSession {
    /// Start a new session with the given options
    pub fn new(options: SolverOptions) -> Self {
        Self {
            options: Rc::new(options),
            models_created: Cell::new(0),
        }
    }

    /// Create a new, empty model which uses this session's options
    pub fn create_model(&self, name: &str) -> HighsModel {
        self.models_created.set(self.models_created.get() + 1);
        debug!(
            "Creating solver model '{name}' (model {} in session)",
            self.models_created.get()
        );

        HighsModel {
            name: name.to_string(),
            options: Rc::clone(&self.options),
            variables: Vec::new(),
            constraints: Vec::new(),
            free_slots: BTreeSet::new(),
            objective: LinearExpr::default(),
            sense: ObjectiveSense::Minimise,
        }
    }

    /// The number of models created so far
    pub fn models_created(&self) -> usize {
        self.models_created.get()
    }

    /// The options used for models in this session
    pub fn options(&self) -> &SolverOptions {
        &self.options
    }
}

/// A MILP model which is handed to HiGHS when optimised.
///
/// HiGHS row problems can't have rows removed, so the model keeps its own arena of constraints
/// and builds a fresh problem for every solve. Removed constraints leave an empty slot, so the
/// indices of other handles stay valid. Empty slots are filled again, lowest first, by the next
/// constraints to be added.
pub struct HighsModel {
    name: String,
    options: Rc<SolverOptions>,
    variables: Vec<VariableKind>,
    constraints: Vec<ConstraintSlot>,
    free_slots: BTreeSet<usize>,
    objective: LinearExpr,
    sense: ObjectiveSense,
}

/// A place in the constraint arena
#[derive(Debug, Default)]
struct ConstraintSlot {
    generation: u32,
    constraint: Option<LinearConstraint>,
}

impl HighsModel {
    /// The name of the model
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The number of slots in the constraint arena, including empty ones
    pub fn num_constraint_slots(&self) -> usize {
        self.constraints.len()
    }

    /// Build the HiGHS problem for the current state of the model
    fn build_problem(&self) -> Problem {
        let mut problem = Problem::default();

        let cols: Vec<highs::Col> = self
            .variables
            .iter()
            .enumerate()
            .map(|(index, kind)| {
                let coeff = self.objective.coefficient(Variable::new(index));
                match kind {
                    VariableKind::Continuous => problem.add_column(coeff, 0.0..),
                    VariableKind::Integer => problem.add_integer_column(coeff, 0.0..),
                    VariableKind::Binary => problem.add_integer_column(coeff, 0.0..=1.0),
                }
            })
            .collect();

        for constraint in self.constraints.iter().filter_map(|slot| slot.constraint.as_ref()) {
            let factors = constraint
                .expr()
                .terms()
                .map(|(var, coeff)| (cols[var.index()], coeff));
            let rhs = constraint.rhs();
            match constraint.relation() {
                Relation::LessOrEqual => problem.add_row(..=rhs, factors),
                Relation::GreaterOrEqual => problem.add_row(rhs.., factors),
                Relation::Equal => problem.add_row(rhs..=rhs, factors),
            }
        }

        problem
    }

    /// Apply the session's options to a HiGHS model
    fn apply_options(&self, model: &mut highs::Model) {
        model.set_option("output_flag", self.log_to_console());
        if let Some(time_limit) = self.options.time_limit {
            model.set_option("time_limit", time_limit);
        }
        if let Some(gap) = self.options.mip_rel_gap {
            model.set_option("mip_rel_gap", gap);
        }
    }

    /// Whether HiGHS should write its output to the console.
    ///
    /// This is skipped if program logging is disabled (e.g. when running tests).
    fn log_to_console(&self) -> bool {
        self.options.log_to_console && solver_output_enabled()
    }
}

impl SolverModel for HighsModel {
    fn add_variable(&mut self, kind: VariableKind) -> Variable {
        self.variables.push(kind);
        Variable::new(self.variables.len() - 1)
    }

    fn add_constraint(&mut self, constraint: LinearConstraint) -> ConstraintHandle {
        let index = self.free_slots.pop_first().unwrap_or_else(|| {
            self.constraints.push(ConstraintSlot::default());
            self.constraints.len() - 1
        });
        let slot = &mut self.constraints[index];
        slot.constraint = Some(constraint);

        ConstraintHandle::new(index, slot.generation)
    }

    fn remove_constraint(&mut self, handle: ConstraintHandle) -> Result<()> {
        let index = handle.index();
        let slot = self
            .constraints
            .get_mut(index)
            .filter(|slot| slot.generation == handle.generation())
            .filter(|slot| slot.constraint.is_some())
            .with_context(|| format!("No constraint with index {index} in model"))?;
        slot.constraint = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_slots.insert(index);

        Ok(())
    }

    fn set_objective(&mut self, sense: ObjectiveSense, objective: LinearExpr) {
        self.sense = sense;
        self.objective = objective;
    }

    fn optimise(&mut self) -> Result<Solution> {
        let problem = self.build_problem();
        let sense = match self.sense {
            ObjectiveSense::Minimise => Sense::Minimise,
            ObjectiveSense::Maximise => Sense::Maximise,
        };
        debug!(
            "Solving model '{}' with {} variables and {} constraints",
            self.name,
            self.variables.len(),
            self.constraints().len()
        );

        let mut model = problem.optimise(sense);
        self.apply_options(&mut model);

        let solved = model
            .try_solve()
            .map_err(|status| anyhow!("Could not solve model '{}': {status:?}", self.name))?;
        match solved.status() {
            HighsModelStatus::Optimal => Ok(Solution::new(
                solved.get_solution().columns().to_vec(),
                &self.objective,
            )),
            status @ (HighsModelStatus::Infeasible
            | HighsModelStatus::Unbounded
            | HighsModelStatus::UnboundedOrInfeasible) => Err(OffGridError::InfeasibleModel(
                format!("solver reported {status:?} for model '{}'", self.name),
            )
            .into()),
            status => Err(anyhow!(
                "Could not find optimal result for model '{}': {status:?}",
                self.name
            )),
        }
    }

    fn constraints(&self) -> Vec<&LinearConstraint> {
        self.constraints
            .iter()
            .filter_map(|slot| slot.constraint.as_ref())
            .collect()
    }

    fn num_variables(&self) -> usize {
        self.variables.len()
    }
}
