//! Conversion from engine outcomes to the shared solve status.

use crate::search::{MipOutcome, MipStatus};
use tandem_solver::SolveStatus;

/// Map an engine outcome onto [`SolveStatus`].
///
/// A limit reached with an incumbent is `Feasible`. Without one, a time limit
/// is `TimeLimit` and a node limit is `Unknown`.
pub fn mip_to_solve_status(outcome: &MipOutcome) -> SolveStatus {
    match outcome.status {
        MipStatus::Optimal => SolveStatus::Optimal,
        MipStatus::Infeasible => SolveStatus::Infeasible,
        MipStatus::TimeLimit | MipStatus::NodeLimit if outcome.has_solution() => {
            SolveStatus::Feasible
        }
        MipStatus::TimeLimit => SolveStatus::TimeLimit,
        MipStatus::NodeLimit => SolveStatus::Unknown,
    }
}
