//! Logic-based Benders decomposition.
//!
//! The MIP master sees every boolean and every column but none of the
//! CP-only constraints. Each round solves the master, fixes its booleans in
//! a CP subproblem that minimizes the objective, and feeds the answer back to
//! the master as a cut:
//!
//! - infeasible subproblem: a no-good excluding the boolean assignment
//! - subproblem optimum `v`: `obj + Σ M·[b differs] >= v` with
//!   `M = v - lb(obj)`
//! - subproblem stopped by a limit with root bound `r`: the same row with
//!   `r` in place of `v`
//!
//! Every cut holds for every solution of the full model, so the master bound
//! stays a lower bound whatever limits the subproblems hit. Cuts are added to
//! the original problem between the previous working copy being freed and
//! the next one being built. No-goods and optimality cuts stay in the problem
//! after the solve; bound cuts from limited subproblems are deleted before
//! returning.

use super::mip::solve_transformed;
use super::{StrategyOutcome, Workspace};
use crate::model::ModelError;
use crate::problem_data::{MipBackend, ProblemData};
use crate::solution::Solution;
use std::collections::BTreeSet;
use tandem_cp::{CpEngine, CpStatus, SearchRequest};
use tandem_expr::{BoolVar, ExprError};
use tandem_mip::{ConsHandle, VarHandle};
use tandem_solver::{CpuBudget, SolveStatus, SolverConfig};
use tracing::{debug, trace, warn};

pub(super) fn solve(workspace: Workspace<'_>) -> Result<StrategyOutcome, ModelError> {
    let Workspace {
        mip,
        cp,
        data,
        config,
        budget,
    } = workspace;
    let mut state = Decomposition::new(data)?;

    let stopped = run_rounds(mip, cp, config, budget, &mut state);
    let released = delete_bound_cuts(mip, std::mem::take(&mut state.bound_cuts));
    let stop = stopped?;
    released?;

    let rounds = state.rounds;
    let outcome = state.finish(stop);
    let log_status = outcome.status.as_str();
    if stop.is_final() {
        debug!(
            component = "strategy",
            operation = "lbbd",
            status = log_status,
            rounds,
            objective = outcome.objective,
            bound = outcome.bound,
            "Decomposition finished"
        );
    } else {
        warn!(
            component = "strategy",
            operation = "lbbd",
            status = log_status,
            stop = stop.as_str(),
            rounds,
            objective = outcome.objective,
            bound = outcome.bound,
            "Decomposition stopped before convergence"
        );
    }
    Ok(outcome)
}

fn run_rounds(
    mip: &mut MipBackend,
    cp: &mut CpEngine,
    config: &SolverConfig,
    budget: &CpuBudget,
    state: &mut Decomposition<'_>,
) -> Result<Stop, ModelError> {
    let data = state.data;
    loop {
        if budget.is_exhausted() {
            return Ok(Stop::TimeLimit);
        }
        if config
            .max_decomposition_iterations
            .is_some_and(|cap| state.rounds >= cap)
        {
            return Ok(Stop::IterationCap);
        }
        state.rounds += 1;

        let master = solve_transformed(mip, data, budget, None)?;
        trace!(
            component = "strategy",
            operation = "lbbd_master",
            status = master.status.as_str(),
            round = state.rounds,
            objective = master.objective,
            bound = master.bound,
            "Solved master problem"
        );
        match master.status {
            SolveStatus::Infeasible => return Ok(Stop::MasterInfeasible),
            SolveStatus::TimeLimit => return Ok(Stop::TimeLimit),
            SolveStatus::Unknown => return Ok(Stop::MasterLimit),
            SolveStatus::Optimal | SolveStatus::Feasible => {}
        }
        state.raise_bound(master.bound);
        if state.is_closed() {
            return Ok(Stop::Converged);
        }

        let assignment = state.master_assignment(&master.solution)?;
        if !state.evaluated.insert(assignment.clone()) {
            // the cut from the last visit did not move the master away
            return Ok(if master.status == SolveStatus::Optimal {
                Stop::SubproblemLimit
            } else {
                Stop::MasterLimit
            });
        }
        let round = state.rounds;
        match solve_subproblem(cp, data, config, budget, &assignment)? {
            Subproblem::Infeasible => {
                add_no_good(mip, data, &assignment, round)?;
            }
            Subproblem::Solved {
                value,
                proven: true,
                solution,
                ..
            } => {
                state.offer(value, solution);
                if value <= state.objective_lb {
                    // the subproblem reached the global lower bound
                    state.raise_bound(value as f64);
                    return Ok(Stop::Converged);
                }
                let cut = Cut::new("optcut", round, value);
                add_objective_cut(mip, data, &assignment, cut, state.objective_lb)?;
            }
            Subproblem::Solved {
                value,
                proven: false,
                bound,
                solution,
            } => {
                state.offer(value, solution);
                if let Some(bound) = bound.filter(|&bound| bound > state.objective_lb) {
                    let cut = Cut::new("boundcut", round, bound);
                    let lb = state.objective_lb;
                    let handle = add_objective_cut(mip, data, &assignment, cut, lb)?;
                    state.bound_cuts.push(handle);
                }
            }
            Subproblem::Limit => {
                return Ok(if budget.is_exhausted() {
                    Stop::TimeLimit
                } else {
                    Stop::SubproblemLimit
                });
            }
        }
        if state.is_closed() {
            return Ok(Stop::Converged);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    Converged,
    MasterInfeasible,
    MasterLimit,
    SubproblemLimit,
    IterationCap,
    TimeLimit,
}

impl Stop {
    fn as_str(self) -> &'static str {
        match self {
            Stop::Converged => "converged",
            Stop::MasterInfeasible => "master_infeasible",
            Stop::MasterLimit => "master_limit",
            Stop::SubproblemLimit => "subproblem_limit",
            Stop::IterationCap => "iteration_cap",
            Stop::TimeLimit => "time_limit",
        }
    }

    /// The master bound met the incumbent or no assignment is left.
    fn is_final(self) -> bool {
        matches!(self, Stop::Converged | Stop::MasterInfeasible)
    }
}

/// Incumbent and bounds carried across rounds.
struct Decomposition<'a> {
    data: &'a ProblemData,
    objective_lb: i64,
    incumbent: Option<(i64, Solution)>,
    bound: f64,
    /// Boolean assignments already handed to a subproblem.
    evaluated: BTreeSet<Vec<(usize, bool)>>,
    bound_cuts: Vec<ConsHandle>,
    rounds: u32,
}

impl<'a> Decomposition<'a> {
    fn new(data: &'a ProblemData) -> Result<Self, ModelError> {
        let objective = data.objective_var();
        if data.mip_int_var(objective)?.is_none() {
            return Err(ModelError::UnboundIntVar(objective));
        }
        let (objective_lb, _) = data.int_bounds(objective)?;
        Ok(Self {
            data,
            objective_lb,
            incumbent: None,
            bound: f64::NEG_INFINITY,
            evaluated: BTreeSet::new(),
            bound_cuts: Vec::new(),
            rounds: 0,
        })
    }

    fn raise_bound(&mut self, bound: f64) {
        if bound > self.bound {
            self.bound = bound;
        }
    }

    /// Incumbent value reached by the proven lower bound.
    fn is_closed(&self) -> bool {
        self.incumbent
            .as_ref()
            .is_some_and(|(value, _)| self.bound >= *value as f64)
    }

    fn offer(&mut self, value: i64, solution: Solution) {
        let improves = self
            .incumbent
            .as_ref()
            .is_none_or(|(best, _)| value < *best);
        if improves {
            trace!(
                component = "strategy",
                operation = "lbbd_incumbent",
                status = "success",
                round = self.rounds,
                objective = value,
                "New incumbent"
            );
            self.incumbent = Some((value, solution));
        }
    }

    /// Master values of the positive non-constant booleans.
    fn master_assignment(&self, master: &Solution) -> Result<Vec<(usize, bool)>, ModelError> {
        let mut assignment = Vec::new();
        for index in 2..self.data.num_bools() {
            if !self.data.index_is_positive(index) {
                continue;
            }
            let var = BoolVar::new(index as u32);
            let value = master.bool_value(var).ok_or(ModelError::InvalidBoolVar(var))?;
            assignment.push((index, value));
        }
        Ok(assignment)
    }

    fn finish(self, stop: Stop) -> StrategyOutcome {
        match self.incumbent {
            Some((value, solution)) => {
                let optimal = stop.is_final();
                let objective = value as f64;
                StrategyOutcome {
                    status: if optimal {
                        SolveStatus::Optimal
                    } else {
                        SolveStatus::Feasible
                    },
                    objective,
                    bound: if optimal { objective } else { self.bound.min(objective) },
                    solution,
                }
            }
            None => match stop {
                Stop::MasterInfeasible => StrategyOutcome::infeasible(),
                Stop::TimeLimit => StrategyOutcome {
                    status: SolveStatus::TimeLimit,
                    objective: f64::INFINITY,
                    bound: self.bound,
                    solution: Solution::default(),
                },
                _ => StrategyOutcome {
                    status: SolveStatus::Unknown,
                    objective: f64::INFINITY,
                    bound: self.bound,
                    solution: Solution::default(),
                },
            },
        }
    }
}

enum Subproblem {
    Infeasible,
    Solved {
        value: i64,
        proven: bool,
        /// Root bound of the subproblem search.
        bound: Option<i64>,
        solution: Solution,
    },
    Limit,
}

/// Minimize the objective in the CP engine with the master's booleans fixed.
fn solve_subproblem(
    cp: &mut CpEngine,
    data: &ProblemData,
    config: &SolverConfig,
    budget: &CpuBudget,
    assignment: &[(usize, bool)],
) -> Result<Subproblem, ModelError> {
    let objective = data.cp_int_var(data.objective_var())?;
    let mut request = SearchRequest::minimize(objective).with_node_limit(config.node_limit);
    for &(index, value) in assignment {
        request = request.with_literal(data.cp_bool_vars[index], value);
    }
    let outcome = cp.solve(&request, budget)?;
    trace!(
        component = "strategy",
        operation = "lbbd_subproblem",
        status = outcome.status.as_str(),
        objective = ?outcome.objective,
        nodes = outcome.nodes,
        "Solved subproblem"
    );
    let bound = outcome.bound;
    Ok(match (outcome.status, outcome.objective, outcome.assignment) {
        (CpStatus::Infeasible, _, _) => Subproblem::Infeasible,
        (status @ (CpStatus::Optimal | CpStatus::Satisfied), Some(value), Some(assignment)) => {
            Subproblem::Solved {
                value,
                proven: status == CpStatus::Optimal,
                bound,
                solution: Solution::from_cp(data, &assignment),
            }
        }
        _ => Subproblem::Limit,
    })
}

/// `Σ_{b=0} b + Σ_{b=1} (1 - b) >= 1`
fn add_no_good(
    mip: &mut MipBackend,
    data: &ProblemData,
    assignment: &[(usize, bool)],
    round: u32,
) -> Result<ConsHandle, ModelError> {
    let ones = assignment.iter().filter(|(_, value)| *value).count() as i64;
    let terms = difference_terms(data, assignment, 1);
    add_cut(mip, &format!("nogood{round}"), &terms, 1 - ones)
}

/// Objective row added for one boolean assignment.
struct Cut {
    name: String,
    /// Objective value forced while the booleans keep the assignment.
    value: i64,
}

impl Cut {
    fn new(prefix: &str, round: u32, value: i64) -> Self {
        Self {
            name: format!("{prefix}{round}"),
            value,
        }
    }
}

/// `obj + Σ M·[b differs] >= value` with `M = value - objective_lb`.
fn add_objective_cut(
    mip: &mut MipBackend,
    data: &ProblemData,
    assignment: &[(usize, bool)],
    cut: Cut,
    objective_lb: i64,
) -> Result<ConsHandle, ModelError> {
    let big_m = cut
        .value
        .checked_sub(objective_lb)
        .ok_or(cut_overflow())?;
    let ones = assignment.iter().filter(|(_, value)| *value).count() as i64;
    let objective = data.objective_var();
    let objective_column = data
        .mip_int_var(objective)?
        .ok_or(ModelError::UnboundIntVar(objective))?;
    let mut terms = difference_terms(data, assignment, big_m);
    terms.push((objective_column, 1));
    let shift = big_m.checked_mul(ones).ok_or(cut_overflow())?;
    let lhs = cut.value.checked_sub(shift).ok_or(cut_overflow())?;
    add_cut(mip, &cut.name, &terms, lhs)
}

/// Terms of `Σ coeff·[b differs]` without the constant: `+coeff·b` for a
/// boolean at 0, `-coeff·b` for a boolean at 1.
fn difference_terms(
    data: &ProblemData,
    assignment: &[(usize, bool)],
    coeff: i64,
) -> Vec<(VarHandle, i64)> {
    assignment
        .iter()
        .map(|&(index, value)| {
            let column = data.mip_bool_vars[index];
            (column, if value { -coeff } else { coeff })
        })
        .collect()
}

/// Add a row to the original problem, which then holds its only reference.
fn add_cut(
    mip: &mut MipBackend,
    name: &str,
    terms: &[(VarHandle, i64)],
    lhs: i64,
) -> Result<ConsHandle, ModelError> {
    let cons = mip.create_cons_linear(name, terms, Some(lhs), None)?;
    let added = mip.add_cons(cons);
    mip.release_cons(cons)?;
    added?;
    trace!(
        component = "strategy",
        operation = "lbbd_cut",
        status = "success",
        name,
        terms = terms.len(),
        lhs,
        "Added master cut"
    );
    Ok(cons)
}

/// Take bound cuts back out of the problem. Every cut is attempted; the
/// first failure is returned.
fn delete_bound_cuts(mip: &mut MipBackend, cuts: Vec<ConsHandle>) -> Result<(), ModelError> {
    let count = cuts.len();
    let mut first_error = None;
    for cut in cuts {
        if let Err(err) = mip.del_cons(cut) {
            first_error.get_or_insert(err);
        }
    }
    if let Some(err) = first_error {
        return Err(err.into());
    }
    if count > 0 {
        debug!(
            component = "strategy",
            operation = "lbbd_cut",
            status = "deleted",
            count,
            "Deleted bound cuts"
        );
    }
    Ok(())
}

fn cut_overflow() -> ModelError {
    ModelError::Expr(ExprError::Overflow {
        operation: "building a decomposition cut",
    })
}
