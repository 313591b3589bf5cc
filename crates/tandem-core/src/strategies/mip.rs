//! Pure MIP: branch-and-bound on the transformed problem, no CP involvement.

use super::{mip_outcome, StrategyOutcome, Workspace};
use crate::model::ModelError;
use crate::problem_data::{MipBackend, ProblemData};
use tandem_mip::{ConstraintHandler, MipError};
use tandem_solver::CpuBudget;
use tracing::debug;

pub(super) fn solve(workspace: Workspace<'_>) -> Result<StrategyOutcome, ModelError> {
    let Workspace {
        mip, data, budget, ..
    } = workspace;
    let outcome = solve_transformed(mip, data, budget, None)?;
    debug!(
        component = "strategy",
        operation = "mip",
        status = outcome.status.as_str(),
        objective = outcome.objective,
        bound = outcome.bound,
        "MIP strategy finished"
    );
    Ok(outcome)
}

/// Transform, solve, read the solution through the transformed tables and
/// free the working copy. The working copy is freed on every path.
pub(super) fn solve_transformed(
    mip: &mut MipBackend,
    data: &ProblemData,
    budget: &CpuBudget,
    handler: Option<&mut dyn ConstraintHandler<ProblemData>>,
) -> Result<StrategyOutcome, ModelError> {
    mip.transform_problem(data)?;
    let solved = run_transformed(mip, budget, handler);
    let freed = mip.free_transform();
    let outcome = solved?;
    freed?;
    Ok(outcome)
}

fn run_transformed(
    mip: &MipBackend,
    budget: &CpuBudget,
    handler: Option<&mut dyn ConstraintHandler<ProblemData>>,
) -> Result<StrategyOutcome, ModelError> {
    let outcome = mip.solve(handler, budget)?;
    let transformed = mip
        .transformed_data()
        .ok_or(MipError::MissingPayloadHook)?;
    Ok(mip_outcome(&outcome, transformed))
}
