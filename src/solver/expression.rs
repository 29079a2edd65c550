//! Linear expressions and constraints over decision variables.
use super::Variable;
use float_cmp::approx_eq;
use indexmap::IndexMap;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// A linear combination of decision variables plus a constant.
///
/// Terms for the same variable are merged, so each variable appears at most once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    terms: IndexMap<Variable, f64>,
    constant: f64,
}

impl LinearExpr {
    /// An expression with no terms and the given constant
    pub fn constant(value: f64) -> Self {
        Self {
            terms: IndexMap::new(),
            constant: value,
        }
    }

    /// An expression consisting of a single term
    pub fn term(var: Variable, coeff: f64) -> Self {
        let mut expr = Self::default();
        expr.add_term(var, coeff);
        expr
    }

    /// Add `coeff * var` to the expression
    pub fn add_term(&mut self, var: Variable, coeff: f64) {
        let entry = self.terms.entry(var).or_insert(0.0);
        *entry += coeff;
        if approx_eq!(f64, *entry, 0.0) {
            self.terms.shift_remove(&var);
        }
    }

    /// Iterate over the variable terms and their coefficients
    pub fn terms(&self) -> impl Iterator<Item = (Variable, f64)> + '_ {
        self.terms.iter().map(|(var, coeff)| (*var, *coeff))
    }

    /// The coefficient for the given variable (zero if absent)
    pub fn coefficient(&self, var: Variable) -> f64 {
        self.terms.get(&var).copied().unwrap_or(0.0)
    }

    /// The constant part of the expression
    pub fn constant_value(&self) -> f64 {
        self.constant
    }

    /// The number of variable terms
    pub fn num_terms(&self) -> usize {
        self.terms.len()
    }

    /// Constrain this expression to be less than or equal to `rhs`
    pub fn leq(self, rhs: impl Into<LinearExpr>) -> LinearConstraint {
        LinearConstraint::new(self - rhs.into(), Relation::LessOrEqual)
    }

    /// Constrain this expression to be greater than or equal to `rhs`
    pub fn geq(self, rhs: impl Into<LinearExpr>) -> LinearConstraint {
        LinearConstraint::new(self - rhs.into(), Relation::GreaterOrEqual)
    }

    /// Constrain this expression to be equal to `rhs`
    pub fn eq(self, rhs: impl Into<LinearExpr>) -> LinearConstraint {
        LinearConstraint::new(self - rhs.into(), Relation::Equal)
    }
}

impl From<Variable> for LinearExpr {
    fn from(var: Variable) -> Self {
        Self::term(var, 1.0)
    }
}

impl From<f64> for LinearExpr {
    fn from(value: f64) -> Self {
        Self::constant(value)
    }
}

impl AddAssign<LinearExpr> for LinearExpr {
    fn add_assign(&mut self, rhs: LinearExpr) {
        for (var, coeff) in rhs.terms {
            self.add_term(var, coeff);
        }
        self.constant += rhs.constant;
    }
}

impl SubAssign<LinearExpr> for LinearExpr {
    fn sub_assign(&mut self, rhs: LinearExpr) {
        *self += -rhs;
    }
}

impl<T: Into<LinearExpr>> Add<T> for LinearExpr {
    type Output = LinearExpr;
    fn add(mut self, rhs: T) -> LinearExpr {
        self += rhs.into();
        self
    }
}

impl<T: Into<LinearExpr>> Sub<T> for LinearExpr {
    type Output = LinearExpr;
    fn sub(mut self, rhs: T) -> LinearExpr {
        self -= rhs.into();
        self
    }
}

impl Mul<f64> for LinearExpr {
    type Output = LinearExpr;
    fn mul(mut self, rhs: f64) -> LinearExpr {
        if approx_eq!(f64, rhs, 0.0) {
            return LinearExpr::default();
        }
        for coeff in self.terms.values_mut() {
            *coeff *= rhs;
        }
        self.constant *= rhs;
        self
    }
}

impl Neg for LinearExpr {
    type Output = LinearExpr;
    fn neg(self) -> LinearExpr {
        self * -1.0
    }
}

impl Mul<f64> for Variable {
    type Output = LinearExpr;
    fn mul(self, rhs: f64) -> LinearExpr {
        LinearExpr::term(self, rhs)
    }
}

impl Mul<Variable> for f64 {
    type Output = LinearExpr;
    fn mul(self, rhs: Variable) -> LinearExpr {
        LinearExpr::term(rhs, self)
    }
}

impl<T: Into<LinearExpr>> Sum<T> for LinearExpr {
    fn sum<I: Iterator<Item = T>>(iter: I) -> Self {
        let mut total = LinearExpr::default();
        for item in iter {
            total += item.into();
        }
        total
    }
}

/// The relation between the two sides of a constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// expression <= rhs
    LessOrEqual,
    /// expression >= rhs
    GreaterOrEqual,
    /// expression == rhs
    Equal,
}

/// A linear constraint in the normalised form `expr (<=|>=|==) rhs`.
///
/// The expression never carries a constant; it is moved to the right-hand side.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraint {
    expr: LinearExpr,
    relation: Relation,
    rhs: f64,
}

impl LinearConstraint {
    fn new(mut expr: LinearExpr, relation: Relation) -> Self {
        let rhs = -expr.constant;
        expr.constant = 0.0;
        Self {
            expr,
            relation,
            rhs,
        }
    }

    /// The left-hand side of the constraint (without a constant)
    pub fn expr(&self) -> &LinearExpr {
        &self.expr
    }

    /// The relation between the two sides
    pub fn relation(&self) -> Relation {
        self.relation
    }

    /// The right-hand side of the constraint
    pub fn rhs(&self) -> f64 {
        self.rhs
    }

    /// Whether the given left-hand side value satisfies the constraint, within `tolerance`
    pub fn is_satisfied_by(&self, lhs: f64, tolerance: f64) -> bool {
        match self.relation {
            Relation::LessOrEqual => lhs <= self.rhs + tolerance,
            Relation::GreaterOrEqual => lhs >= self.rhs - tolerance,
            Relation::Equal => (lhs - self.rhs).abs() <= tolerance,
        }
    }
}

impl fmt::Display for LinearConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (var, coeff) in self.expr.terms() {
            if first {
                write!(f, "{coeff} x{}", var.index())?;
                first = false;
            } else {
                write!(f, " + {coeff} x{}", var.index())?;
            }
        }
        if first {
            write!(f, "0")?;
        }
        let op = match self.relation {
            Relation::LessOrEqual => "<=",
            Relation::GreaterOrEqual => ">=",
            Relation::Equal => "==",
        };
        write!(f, " {op} {}", self.rhs)
    }
}
