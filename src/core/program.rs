//! Solver-agnostic linear program.
//!
//! A [`LinearProgram`] is a list of named variables, named linear
//! constraints with optional bounds on each side, and a linear objective that
//! is always minimized. It can also evaluate an assignment, which the worker
//! uses to report which constraints a partial solution violates.

use std::collections::HashMap;

/// Handle of a variable inside one [`LinearProgram`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(usize);

impl VarId {
    /// Position of the variable in [`LinearProgram::variables`].
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Variable domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    /// 0 or 1
    Binary,
    /// Any real number ≥ 0
    NonNegative,
}

/// A named decision variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    /// Human-readable name, unique within the program
    pub name: String,
    /// Domain
    pub domain: Domain,
}

/// `Σ coefficient·variable + constant`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    terms: Vec<(VarId, f64)>,
    constant: f64,
}

impl LinearExpr {
    /// The zero expression.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of the given variables with coefficient 1.
    pub fn sum(vars: impl IntoIterator<Item = VarId>) -> Self {
        vars.into_iter().map(|v| (v, 1.0)).collect()
    }

    /// Adds `coefficient·var`; zero coefficients are dropped.
    pub fn add_term(&mut self, var: VarId, coefficient: f64) -> &mut Self {
        if coefficient != 0.0 {
            self.terms.push((var, coefficient));
        }
        self
    }

    /// Adds a constant.
    pub fn add_constant(&mut self, value: f64) -> &mut Self {
        self.constant += value;
        self
    }

    /// Appends every term and the constant of `other`.
    pub fn extend(&mut self, other: &Self) -> &mut Self {
        self.terms.extend_from_slice(&other.terms);
        self.constant += other.constant;
        self
    }

    /// Terms in insertion order. A variable may appear more than once.
    #[must_use]
    pub fn terms(&self) -> &[(VarId, f64)] {
        &self.terms
    }

    /// Constant part.
    #[must_use]
    pub const fn constant(&self) -> f64 {
        self.constant
    }

    /// Evaluates the expression; variables outside `values` count as 0.
    #[must_use]
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(var, coefficient)| coefficient * values.get(var.index()).copied().unwrap_or(0.0))
            .sum::<f64>()
            + self.constant
    }
}

impl FromIterator<(VarId, f64)> for LinearExpr {
    fn from_iter<I: IntoIterator<Item = (VarId, f64)>>(iter: I) -> Self {
        let mut expr = Self::new();
        for (var, coefficient) in iter {
            expr.add_term(var, coefficient);
        }
        expr
    }
}

/// `lower ≤ expr ≤ upper`, either side optional.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    /// Name, unique within the program
    pub name: String,
    /// Constrained expression
    pub expr: LinearExpr,
    /// Floor, if any
    pub lower: Option<f64>,
    /// Ceiling, if any
    pub upper: Option<f64>,
}

/// A constraint not satisfied by an assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    /// Constraint name
    pub name: String,
    /// Value of the expression under the assignment
    pub activity: f64,
    /// Floor, if any
    pub lower: Option<f64>,
    /// Ceiling, if any
    pub upper: Option<f64>,
}

/// A minimization problem over linear constraints.
#[derive(Debug, Clone, Default)]
pub struct LinearProgram {
    variables: Vec<Variable>,
    names: HashMap<String, VarId>,
    constraints: Vec<Constraint>,
    objective: LinearExpr,
}

impl LinearProgram {
    /// An empty program.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a variable and returns its handle.
    ///
    /// Declaring the same name twice returns the existing handle.
    pub fn add_variable(&mut self, name: impl Into<String>, domain: Domain) -> VarId {
        let name = name.into();
        if let Some(&id) = self.names.get(&name) {
            return id;
        }
        let id = VarId(self.variables.len());
        self.names.insert(name.clone(), id);
        self.variables.push(Variable { name, domain });
        id
    }

    /// Adds `lower ≤ expr ≤ upper`.
    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        expr: LinearExpr,
        lower: Option<f64>,
        upper: Option<f64>,
    ) {
        self.constraints.push(Constraint {
            name: name.into(),
            expr,
            lower,
            upper,
        });
    }

    /// Adds `expr = value`.
    pub fn add_eq(&mut self, name: impl Into<String>, expr: LinearExpr, value: f64) {
        self.add_constraint(name, expr, Some(value), Some(value));
    }

    /// Adds `expr ≤ value`.
    pub fn add_le(&mut self, name: impl Into<String>, expr: LinearExpr, value: f64) {
        self.add_constraint(name, expr, None, Some(value));
    }

    /// Adds `expr ≥ value`.
    pub fn add_ge(&mut self, name: impl Into<String>, expr: LinearExpr, value: f64) {
        self.add_constraint(name, expr, Some(value), None);
    }

    /// Replaces the objective.
    pub fn set_objective(&mut self, objective: LinearExpr) {
        self.objective = objective;
    }

    /// Variables in declaration order.
    #[must_use]
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Constraints in insertion order.
    #[must_use]
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// The minimized objective.
    #[must_use]
    pub const fn objective(&self) -> &LinearExpr {
        &self.objective
    }

    /// Looks up a variable by name.
    #[must_use]
    pub fn find_variable(&self, name: &str) -> Option<VarId> {
        self.names.get(name).copied()
    }

    /// Looks up a constraint by name.
    #[must_use]
    pub fn find_constraint(&self, name: &str) -> Option<&Constraint> {
        self.constraints.iter().find(|c| c.name == name)
    }

    /// Objective value under an assignment.
    #[must_use]
    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.objective.evaluate(values)
    }

    /// Constraints violated by more than `tolerance`.
    #[must_use]
    pub fn violations(&self, values: &[f64], tolerance: f64) -> Vec<Violation> {
        self.constraints
            .iter()
            .filter_map(|c| {
                let activity = c.expr.evaluate(values);
                let below = c.lower.is_some_and(|lower| activity < lower - tolerance);
                let above = c.upper.is_some_and(|upper| activity > upper + tolerance);
                (below || above).then(|| Violation {
                    name: c.name.clone(),
                    activity,
                    lower: c.lower,
                    upper: c.upper,
                })
            })
            .collect()
    }
}
