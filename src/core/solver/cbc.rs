//! CBC backend.
//!
//! The program is written in CPLEX LP format to a temporary directory, the
//! `cbc` executable is run on it and the solution file it leaves behind is
//! parsed back into a [`Solution`]. Variables and rows are given positional
//! names (`v{index}`, `c{index}`) so that ingredient names never reach the
//! LP parser.

use super::{SolveOptions, Solution, Solver, TerminationCondition};
use crate::{
    config::settings::SolverConfig,
    core::program::{Domain, LinearExpr, LinearProgram},
    errors::{Error, Result},
};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Terms per line in the LP file.
const TERMS_PER_LINE: usize = 8;

/// Extra wall-clock time granted to the process beyond its own limit.
const PROCESS_GRACE: Duration = Duration::from_secs(30);

/// Runs the COIN-OR CBC command-line solver.
#[derive(Debug, Clone)]
pub struct CbcSolver {
    program: PathBuf,
}

impl CbcSolver {
    /// Solver invoking the given executable.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Solver invoking the configured executable.
    #[must_use]
    pub fn from_config(config: &SolverConfig) -> Self {
        Self::new(&config.cbc_path)
    }

    fn failure(&self, message: impl std::fmt::Display) -> Error {
        Error::Solver {
            message: format!("{}: {message}", self.program.display()),
        }
    }
}

impl Default for CbcSolver {
    fn default() -> Self {
        Self::new("cbc")
    }
}

impl Solver for CbcSolver {
    async fn solve(&self, program: &LinearProgram, options: &SolveOptions) -> Result<Solution> {
        let n_vars = program.variables().len();
        if n_vars == 0 {
            return Ok(Solution::new(
                TerminationCondition::Optimal,
                Some(program.objective().constant()),
                Vec::new(),
            ));
        }

        let workdir = tempfile::tempdir()?;
        let lp_path = workdir.path().join("model.lp");
        let solution_path = workdir.path().join("solution.txt");
        tokio::fs::write(&lp_path, write_lp(program)).await?;

        let mut command = Command::new(&self.program);
        command
            .arg(&lp_path)
            .arg("-sec")
            .arg(options.time_limit.as_secs().max(1).to_string())
            .arg("-ratioGap")
            .arg(options.relative_gap.to_string())
            .arg("-timeMode")
            .arg("elapsed")
            .arg("-printingOptions")
            .arg("all")
            .arg("-solve")
            .arg("-solu")
            .arg(&solution_path)
            .kill_on_drop(true);
        debug!("Running {:?}", command);

        let output = tokio::time::timeout(options.time_limit + PROCESS_GRACE, command.output())
            .await
            .map_err(|_| self.failure("process did not exit after its time limit"))?
            .map_err(|e| self.failure(e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
            return Err(self.failure(format!(
                "exited with status {:?}: {stderr}",
                output.status.code()
            )));
        }

        let text = tokio::fs::read_to_string(&solution_path)
            .await
            .map_err(|e| self.failure(format!("no solution file: {e}")))?;
        let mut solution = parse_solution(&text, n_vars)?;
        // CBC drops the objective constant
        solution.objective = solution
            .objective
            .map(|value| value + program.objective().constant());
        Ok(solution)
    }
}

/// Sums repeated variables and drops terms that cancel out.
#[allow(clippy::float_cmp)]
fn merged_terms(expr: &LinearExpr) -> BTreeMap<usize, f64> {
    let mut merged = BTreeMap::new();
    for &(var, coefficient) in expr.terms() {
        *merged.entry(var.index()).or_insert(0.0) += coefficient;
    }
    merged.retain(|_, coefficient| *coefficient != 0.0);
    merged
}

fn write_terms(out: &mut String, terms: &BTreeMap<usize, f64>) {
    for (n, (index, coefficient)) in terms.iter().enumerate() {
        if n > 0 && n % TERMS_PER_LINE == 0 {
            out.push_str("\n   ");
        }
        let sign = if *coefficient < 0.0 { '-' } else { '+' };
        let _ = write!(out, " {sign} {} v{index}", coefficient.abs());
    }
}

/// Renders a program in CPLEX LP format.
///
/// Ranged constraints become two rows (`_lo`, `_hi`); constraints without
/// variable terms are left out.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn write_lp(program: &LinearProgram) -> String {
    let mut out = String::from("Minimize\n obj:");
    let objective = merged_terms(program.objective());
    if objective.is_empty() {
        out.push_str(" 0 v0");
    } else {
        write_terms(&mut out, &objective);
    }
    out.push_str("\nSubject To\n");

    for (index, constraint) in program.constraints().iter().enumerate() {
        let terms = merged_terms(&constraint.expr);
        if terms.is_empty() {
            debug!("Constraint '{}' has no variable terms, skipped", constraint.name);
            continue;
        }
        let constant = constraint.expr.constant();
        let lower = constraint.lower.map(|v| v - constant);
        let upper = constraint.upper.map(|v| v - constant);

        let mut row = |suffix: &str, op: &str, rhs: f64| {
            let _ = write!(out, " c{index}{suffix}:");
            write_terms(&mut out, &terms);
            let _ = writeln!(out, " {op} {rhs}");
        };
        match (lower, upper) {
            (Some(lo), Some(hi)) if lo == hi => row("", "=", lo),
            (Some(lo), Some(hi)) => {
                row("_lo", ">=", lo);
                row("_hi", "<=", hi);
            }
            (Some(lo), None) => row("", ">=", lo),
            (None, Some(hi)) => row("", "<=", hi),
            (None, None) => {}
        }
    }

    let binaries: Vec<String> = program
        .variables()
        .iter()
        .enumerate()
        .filter(|(_, v)| v.domain == Domain::Binary)
        .map(|(index, _)| format!("v{index}"))
        .collect();

    out.push_str("Bounds\n");
    for (index, variable) in program.variables().iter().enumerate() {
        if variable.domain == Domain::NonNegative {
            let _ = writeln!(out, " v{index} >= 0");
        }
    }
    if !binaries.is_empty() {
        out.push_str("Binaries\n");
        for chunk in binaries.chunks(TERMS_PER_LINE * 2) {
            let _ = writeln!(out, " {}", chunk.join(" "));
        }
    }
    out.push_str("End\n");
    out
}

fn termination_from_status(status: &str) -> TerminationCondition {
    let lowered = status.to_lowercase();
    if lowered.starts_with("optimal") {
        TerminationCondition::Optimal
    } else if lowered.contains("infeasible") {
        TerminationCondition::Infeasible
    } else if lowered.starts_with("stopped on time") {
        TerminationCondition::TimeLimit
    } else if lowered.contains("unbounded") {
        TerminationCondition::Unbounded
    } else {
        TerminationCondition::Other
    }
}

/// Parses a CBC solution file.
///
/// The first line carries the status and, usually, `objective value X`. Every
/// further line is `[**] index name value reduced_cost`; the `**` marker flags
/// values that violate a bound and is ignored. Variables absent from the file
/// read as 0.
pub fn parse_solution(text: &str, n_vars: usize) -> Result<Solution> {
    let mut lines = text.lines();
    let status = lines.next().map(str::trim).unwrap_or_default();
    if status.is_empty() {
        return Err(Error::Solver {
            message: "empty solution file".to_string(),
        });
    }

    let termination = termination_from_status(status);
    let objective = status
        .split_once("objective value")
        .and_then(|(_, rest)| rest.split_whitespace().next())
        .and_then(|value| value.parse::<f64>().ok());

    let mut values = vec![0.0; n_vars];
    for line in lines {
        let mut fields = line.split_whitespace().peekable();
        if fields.peek() == Some(&"**") {
            fields.next();
        }
        let (Some(_), Some(name), Some(value)) = (fields.next(), fields.next(), fields.next())
        else {
            continue;
        };
        let Some(index) = name.strip_prefix('v').and_then(|i| i.parse::<usize>().ok()) else {
            warn!("Unexpected column '{}' in solution file", name);
            continue;
        };
        let value = value.parse::<f64>().map_err(|e| Error::Solver {
            message: format!("bad value '{value}' for {name}: {e}"),
        })?;
        if let Some(slot) = values.get_mut(index) {
            *slot = value;
        }
    }

    Ok(Solution::new(termination, objective, values))
}
