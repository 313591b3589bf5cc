//! Branch-and-cut: MIP branch-and-bound with the CP model attached as a
//! propagation constraint.

use super::mip::solve_transformed;
use super::{complete_cp_only, StrategyOutcome, Workspace};
use crate::bridge::CpPropagator;
use crate::model::ModelError;
use crate::problem_data::ProblemData;
use tandem_mip::ConstraintHandler;
use tracing::debug;

pub(super) fn solve(workspace: Workspace<'_>) -> Result<StrategyOutcome, ModelError> {
    let Workspace {
        mip,
        cp,
        data,
        budget,
        ..
    } = workspace;

    let mut propagator = CpPropagator::new(&mut *cp, budget);
    let handler: &mut dyn ConstraintHandler<ProblemData> = &mut propagator;
    let result = solve_transformed(mip, data, budget, Some(handler));
    let (checks, rejected) = (propagator.checks(), propagator.rejected());
    let mut outcome = result?;
    complete_cp_only(cp, data, &mut outcome.solution, budget)?;

    debug!(
        component = "strategy",
        operation = "branch_and_cut",
        status = outcome.status.as_str(),
        objective = outcome.objective,
        bound = outcome.bound,
        checks,
        rejected,
        "Branch-and-cut finished"
    );
    Ok(outcome)
}
