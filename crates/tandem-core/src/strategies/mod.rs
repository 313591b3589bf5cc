//! The four ways of minimizing a model.

mod branch_and_cut;
mod cp;
mod decomposition;
mod mip;

use crate::model::ModelError;
use crate::problem_data::{MipBackend, ProblemData};
use crate::solution::Solution;
use tandem_cp::{CpEngine, CpStatus, SearchRequest};
use tandem_mip::MipOutcome;
use tandem_solver::{CpuBudget, Method, SolveStatus, SolverConfig};

/// Borrowed model state a strategy runs on.
pub(crate) struct Workspace<'a> {
    pub(crate) mip: &'a mut MipBackend,
    pub(crate) cp: &'a mut CpEngine,
    pub(crate) data: &'a ProblemData,
    pub(crate) config: &'a SolverConfig,
    pub(crate) budget: &'a CpuBudget,
}

/// Result written back to the model.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StrategyOutcome {
    pub(crate) status: SolveStatus,
    pub(crate) objective: f64,
    pub(crate) bound: f64,
    pub(crate) solution: Solution,
}

impl StrategyOutcome {
    fn infeasible() -> Self {
        Self {
            status: SolveStatus::Infeasible,
            objective: f64::INFINITY,
            bound: f64::INFINITY,
            solution: Solution::default(),
        }
    }
}

pub(crate) fn run(method: Method, workspace: Workspace<'_>) -> Result<StrategyOutcome, ModelError> {
    match method {
        Method::BranchAndCut => branch_and_cut::solve(workspace),
        Method::Decomposition => decomposition::solve(workspace),
        Method::Mip => mip::solve(workspace),
        Method::Cp => cp::solve(workspace),
    }
}

/// Solution and bounds of a MIP outcome, read through the transformed tables.
fn mip_outcome(outcome: &MipOutcome, transformed: &ProblemData) -> StrategyOutcome {
    let status = tandem_mip::mip_to_solve_status(outcome);
    let solution = outcome
        .solution
        .as_ref()
        .map(|solution| Solution::from_mip(transformed, solution))
        .unwrap_or_default();
    let objective = outcome.objective.unwrap_or(f64::INFINITY);
    let bound = if status.is_optimal() {
        objective
    } else {
        outcome.bound
    };
    StrategyOutcome {
        status,
        objective,
        bound,
        solution,
    }
}

/// Fix every variable the MIP solution assigns and let the CP engine find
/// values for the CP-only integers.
///
/// Leaves `solution` untouched when nothing is missing or no completion
/// exists within the budget.
fn complete_cp_only(
    cp: &mut CpEngine,
    data: &ProblemData,
    solution: &mut Solution,
    budget: &CpuBudget,
) -> Result<(), ModelError> {
    if solution.is_empty() || solution.ints().iter().all(Option::is_some) {
        return Ok(());
    }
    let mut request = SearchRequest::satisfy();
    for index in 0..data.num_bools() {
        if !data.index_is_positive(index) {
            continue;
        }
        if let Some(value) = solution.bools()[index] {
            request = request.with_literal(data.cp_bool_vars[index], value);
        }
    }
    for (index, value) in solution.ints().iter().enumerate() {
        if let Some(value) = value {
            request = request.with_assumption(data.cp_int_vars[index], *value, *value);
        }
    }
    let outcome = cp.solve(&request, budget)?;
    if let (CpStatus::Satisfied | CpStatus::Optimal, Some(assignment)) =
        (outcome.status, outcome.assignment.as_ref())
    {
        solution.complete_from(&Solution::from_cp(data, assignment));
    }
    Ok(())
}
