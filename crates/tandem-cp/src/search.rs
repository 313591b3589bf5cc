//! Depth-first search with objective branch-and-bound.

use crate::engine::CpEngine;
use crate::error::CpError;
use crate::var::{CpIntVar, Literal};
use std::time::Instant;
use tandem_solver::CpuBudget;
use tracing::{debug, trace};

/// What to search for and under which assumptions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchRequest {
    objective: Option<CpIntVar>,
    assumptions: Vec<(CpIntVar, i64, i64)>,
    node_limit: Option<u64>,
}

impl SearchRequest {
    /// Stop at the first solution.
    pub fn satisfy() -> Self {
        Self::default()
    }

    /// Minimize `objective`.
    pub fn minimize(objective: CpIntVar) -> Self {
        Self {
            objective: Some(objective),
            ..Self::default()
        }
    }

    /// Restrict `var` to `[lb, ub]` for this search only.
    pub fn with_assumption(mut self, var: CpIntVar, lb: i64, ub: i64) -> Self {
        self.assumptions.push((var, lb, ub));
        self
    }

    pub fn with_literal(self, lit: Literal, value: bool) -> Self {
        let target = if value {
            lit.true_value()
        } else {
            1 - lit.true_value()
        };
        self.with_assumption(lit.var(), target, target)
    }

    pub fn with_node_limit(mut self, limit: Option<u64>) -> Self {
        self.node_limit = limit;
        self
    }

    pub fn objective(&self) -> Option<CpIntVar> {
        self.objective
    }

    pub fn assumptions(&self) -> &[(CpIntVar, i64, i64)] {
        &self.assumptions
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpStatus {
    /// Objective proven minimal.
    Optimal,
    /// A solution exists; optimality not proven or not requested.
    Satisfied,
    Infeasible,
    /// Limit reached without a solution.
    Unknown,
}

impl CpStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CpStatus::Optimal => "optimal",
            CpStatus::Satisfied => "satisfied",
            CpStatus::Infeasible => "infeasible",
            CpStatus::Unknown => "unknown",
        }
    }
}

/// Value of every variable in a solution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpAssignment {
    values: Vec<i64>,
}

impl CpAssignment {
    pub fn value(&self, var: CpIntVar) -> Option<i64> {
        self.values.get(var.index()).copied()
    }

    pub fn literal(&self, lit: Literal) -> Option<bool> {
        self.value(lit.var()).map(|value| lit.holds_for(value))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CpOutcome {
    pub status: CpStatus,
    pub assignment: Option<CpAssignment>,
    pub objective: Option<i64>,
    /// Lower bound on the objective.
    pub bound: Option<i64>,
    pub nodes: u64,
}

enum Stop {
    Exhausted,
    FirstSolution,
    Limit,
}

impl CpEngine {
    /// Search from the current level. Domains are back at that level when
    /// this returns, whatever the outcome.
    pub fn solve(&mut self, request: &SearchRequest, budget: &CpuBudget) -> Result<CpOutcome, CpError> {
        if let Some(objective) = request.objective {
            self.bounds(objective)?;
        }
        for &(var, _, _) in &request.assumptions {
            self.bounds(var)?;
        }
        debug!(
            component = "cp",
            operation = "solve",
            status = "start",
            vars = self.num_vars(),
            propagators = self.num_propagators(),
            assumptions = request.assumptions.len(),
            minimize = request.objective.is_some(),
            "Starting CP search"
        );

        let started = Instant::now();
        let root = self.level();
        let result = self.search(request, budget);
        self.backtrack_to(root)?;
        let outcome = result?;
        debug!(
            component = "cp",
            operation = "solve",
            status = outcome.status.as_str(),
            nodes = outcome.nodes,
            objective = ?outcome.objective,
            bound = ?outcome.bound,
            solve_ms = started.elapsed().as_secs_f64() * 1000.0,
            "CP search finished"
        );
        Ok(outcome)
    }

    fn search(&mut self, request: &SearchRequest, budget: &CpuBudget) -> Result<CpOutcome, CpError> {
        self.push_level();
        let mut nodes: u64 = 0;
        if !self.enter_root(request)? {
            return Ok(CpOutcome {
                status: CpStatus::Infeasible,
                assignment: None,
                objective: None,
                bound: None,
                nodes,
            });
        }
        let root_bound = match request.objective {
            Some(objective) => Some(self.bounds(objective)?.0),
            None => None,
        };

        // one entry per level above the root: the untried right branch, if any
        let mut frames: Vec<Option<(CpIntVar, i64, i64)>> = Vec::new();
        let mut best: Option<(Option<i64>, CpAssignment)> = None;
        let stop = 'search: loop {
            if budget.is_exhausted() || request.node_limit.is_some_and(|limit| nodes >= limit) {
                break 'search Stop::Limit;
            }
            nodes += 1;

            match self.select_var(request.objective) {
                Some((var, lb, ub)) => {
                    frames.push(Some((var, lb + 1, ub)));
                    self.push_level();
                    if self.descend(var, lb, lb, request.objective, incumbent(&best))? {
                        continue 'search;
                    }
                }
                None => {
                    let assignment = CpAssignment {
                        values: self.domains().iter().map(|&(lb, _)| lb).collect(),
                    };
                    let value = request.objective.and_then(|obj| assignment.value(obj));
                    trace!(
                        component = "cp",
                        operation = "solution",
                        status = "success",
                        objective = ?value,
                        node = nodes,
                        depth = frames.len(),
                        "Found solution"
                    );
                    best = Some((value, assignment));
                    if request.objective.is_none() {
                        break 'search Stop::FirstSolution;
                    }
                }
            }

            loop {
                let Some(frame) = frames.pop() else {
                    break 'search Stop::Exhausted;
                };
                self.pop_level()?;
                if let Some((var, lb, ub)) = frame {
                    frames.push(None);
                    self.push_level();
                    if self.descend(var, lb, ub, request.objective, incumbent(&best))? {
                        continue 'search;
                    }
                }
            }
        };

        let objective = incumbent(&best);
        let (status, bound) = match (stop, &best) {
            (Stop::FirstSolution, _) => (CpStatus::Satisfied, root_bound),
            (Stop::Exhausted, Some(_)) if request.objective.is_some() => {
                (CpStatus::Optimal, objective)
            }
            (Stop::Exhausted, Some(_)) => (CpStatus::Satisfied, root_bound),
            (Stop::Exhausted, None) => (CpStatus::Infeasible, None),
            (Stop::Limit, Some(_)) => (CpStatus::Satisfied, root_bound),
            (Stop::Limit, None) => (CpStatus::Unknown, root_bound),
        };
        Ok(CpOutcome {
            status,
            assignment: best.map(|(_, assignment)| assignment),
            objective,
            bound,
            nodes,
        })
    }

    /// Apply assumptions and propagate everything. False on conflict.
    fn enter_root(&mut self, request: &SearchRequest) -> Result<bool, CpError> {
        for &(var, lb, ub) in &request.assumptions {
            if !consistent(self.restrict(var, lb, ub))? {
                return Ok(false);
            }
        }
        self.enqueue_all();
        consistent(self.propagate())
    }

    /// Restrict `var`, apply the objective cutoff and propagate.
    fn descend(
        &mut self,
        var: CpIntVar,
        lb: i64,
        ub: i64,
        objective: Option<CpIntVar>,
        incumbent: Option<i64>,
    ) -> Result<bool, CpError> {
        if !consistent(self.restrict(var, lb, ub))? {
            return Ok(false);
        }
        if let (Some(objective), Some(value)) = (objective, incumbent) {
            if !consistent(self.set_ub(objective, value.saturating_sub(1)))? {
                return Ok(false);
            }
        }
        consistent(self.propagate())
    }

    /// Unfixed variable with the narrowest domain. The objective goes last.
    fn select_var(&self, objective: Option<CpIntVar>) -> Option<(CpIntVar, i64, i64)> {
        let domains = self.domains();
        let candidate = |skip_objective: bool| {
            domains
                .iter()
                .enumerate()
                .skip(1)
                .filter(|&(index, &(lb, ub))| {
                    lb < ub && !(skip_objective && objective.is_some_and(|o| o.inner() as usize == index))
                })
                .min_by_key(|&(index, &(lb, ub))| (ub.abs_diff(lb), index))
                .map(|(index, &(lb, ub))| (CpIntVar::new(index as u32), lb, ub))
        };
        candidate(true).or_else(|| candidate(false))
    }
}

fn incumbent(best: &Option<(Option<i64>, CpAssignment)>) -> Option<i64> {
    best.as_ref().and_then(|(value, _)| *value)
}

/// Conflicts become `false`; other errors propagate.
fn consistent<T>(result: Result<T, CpError>) -> Result<bool, CpError> {
    match result {
        Ok(_) => Ok(true),
        Err(CpError::Conflict) => Ok(false),
        Err(err) => Err(err),
    }
}
