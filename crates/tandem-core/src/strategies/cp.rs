//! Pure CP: search minimizing the objective's CP variable.

use super::{StrategyOutcome, Workspace};
use crate::model::ModelError;
use crate::solution::Solution;
use tandem_cp::{CpStatus, SearchRequest};
use tandem_solver::SolveStatus;
use tracing::debug;

pub(super) fn solve(workspace: Workspace<'_>) -> Result<StrategyOutcome, ModelError> {
    let Workspace {
        cp,
        data,
        config,
        budget,
        ..
    } = workspace;
    let objective = data.cp_int_var(data.objective_var())?;
    let request = SearchRequest::minimize(objective).with_node_limit(config.node_limit);
    let outcome = cp.solve(&request, budget)?;

    let status = match outcome.status {
        CpStatus::Optimal => SolveStatus::Optimal,
        CpStatus::Satisfied => SolveStatus::Feasible,
        CpStatus::Infeasible => SolveStatus::Infeasible,
        CpStatus::Unknown if budget.is_exhausted() => SolveStatus::TimeLimit,
        CpStatus::Unknown => SolveStatus::Unknown,
    };
    let objective_value = outcome.objective.map_or(f64::INFINITY, |value| value as f64);
    let bound = match status {
        SolveStatus::Optimal => objective_value,
        SolveStatus::Infeasible => f64::INFINITY,
        _ => outcome.bound.map_or(f64::NEG_INFINITY, |value| value as f64),
    };
    let solution = outcome
        .assignment
        .as_ref()
        .map(|assignment| Solution::from_cp(data, assignment))
        .unwrap_or_default();

    debug!(
        component = "strategy",
        operation = "cp",
        status = status.as_str(),
        objective = objective_value,
        bound,
        nodes = outcome.nodes,
        "CP strategy finished"
    );
    Ok(StrategyOutcome {
        status,
        objective: objective_value,
        bound,
        solution,
    })
}
