//! Depth-first branch-and-bound over the transformed problem.

use crate::cons::ConsKind;
use crate::engine::{MipEngine, WorkingProblem};
use crate::error::MipError;
use crate::handle::VarHandle;
use crate::handler::{ColumnMap, ConstraintHandler, NodeDomains, Propagation};
use crate::transform::ProblemStage;
use crate::var::{Side, VarKind};
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;
use tandem_solver::CpuBudget;
use tracing::{debug, trace, warn};

const OBJ_EPS: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MipStatus {
    Optimal,
    Infeasible,
    TimeLimit,
    NodeLimit,
}

impl MipStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MipStatus::Optimal => "optimal",
            MipStatus::Infeasible => "infeasible",
            MipStatus::TimeLimit => "time_limit",
            MipStatus::NodeLimit => "node_limit",
        }
    }

    /// Search stopped before the tree was exhausted.
    pub fn is_limit(self) -> bool {
        matches!(self, MipStatus::TimeLimit | MipStatus::NodeLimit)
    }
}

/// Values of every transformed column and negation view in the best solution.
#[derive(Debug, Clone, PartialEq)]
pub struct MipSolution {
    values: HashMap<VarHandle, i64>,
    objective: f64,
}

impl MipSolution {
    pub fn value(&self, var: VarHandle) -> Option<i64> {
        self.values.get(&var).copied()
    }

    pub fn objective(&self) -> f64 {
        self.objective
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MipOutcome {
    pub status: MipStatus,
    /// Objective of the best solution found.
    pub objective: Option<f64>,
    /// Global lower bound on the optimum. `+inf` when infeasible.
    pub bound: f64,
    pub solution: Option<MipSolution>,
    pub nodes: u64,
}

impl MipOutcome {
    pub fn has_solution(&self) -> bool {
        self.solution.is_some()
    }
}

/// Rows and columns of the transformed problem in dense form.
struct Relaxation {
    columns: ColumnMap,
    lower: Vec<i64>,
    upper: Vec<i64>,
    objective: Vec<f64>,
    rows: Vec<Row>,
    integral: bool,
}

/// `lhs <= Σ coeff * x[index] <= rhs` with negations folded into the sides.
struct Row {
    terms: Vec<(usize, i128)>,
    lhs: Option<i128>,
    rhs: Option<i128>,
}

struct Node {
    domains: Vec<(i64, i64)>,
    /// Objective bound inherited from the parent.
    bound: f64,
    depth: u32,
}

struct Incumbent {
    objective: f64,
    values: Vec<i64>,
}

impl<P> MipEngine<P> {
    /// Minimize the transformed problem.
    ///
    /// `handler` must be supplied when the problem holds custom constraints
    /// and its name must match their registered handler type.
    pub fn solve(
        &self,
        mut handler: Option<&mut dyn ConstraintHandler<P>>,
        budget: &CpuBudget,
    ) -> Result<MipOutcome, MipError> {
        if self.stage != ProblemStage::Transformed {
            return Err(MipError::WrongStage {
                operation: "solve",
                stage: self.stage,
            });
        }
        let working = self.working.as_ref().ok_or(MipError::WrongStage {
            operation: "solve",
            stage: self.stage,
        })?;
        self.check_handler(working, handler.as_deref())?;
        let relaxation = self.relaxation(working)?;

        debug!(
            component = "mip",
            operation = "solve",
            status = "start",
            columns = relaxation.lower.len(),
            rows = relaxation.rows.len(),
            handler = handler.as_deref().map(|h| h.name()),
            node_limit = ?self.params.node_limit,
            time_limit = budget.limit(),
            "Starting branch-and-bound"
        );
        let started = Instant::now();
        let outcome = branch_and_bound(
            &relaxation,
            working.payload.as_ref(),
            &mut handler,
            budget,
            self.params.node_limit,
        )?;
        let fields_status = outcome.status.as_str();
        if outcome.status.is_limit() {
            warn!(
                component = "mip",
                operation = "solve",
                status = fields_status,
                nodes = outcome.nodes,
                objective = ?outcome.objective,
                bound = outcome.bound,
                "Search stopped at a limit"
            );
        } else {
            debug!(
                component = "mip",
                operation = "solve",
                status = fields_status,
                nodes = outcome.nodes,
                objective = ?outcome.objective,
                bound = outcome.bound,
                solve_ms = started.elapsed().as_secs_f64() * 1000.0,
                "Branch-and-bound finished"
            );
        }
        Ok(outcome)
    }

    fn check_handler(
        &self,
        working: &WorkingProblem<P>,
        handler: Option<&dyn ConstraintHandler<P>>,
    ) -> Result<(), MipError> {
        for &cons in &working.conss {
            let ConsKind::Custom { handler: id } = self.cons_record(cons)?.kind else {
                continue;
            };
            let expected = self.conshdlr_name(id)?;
            match handler {
                Some(h) if h.name() == expected => {}
                _ => return Err(MipError::MissingConshdlr(expected.to_string())),
            }
        }
        Ok(())
    }

    fn relaxation(&self, working: &WorkingProblem<P>) -> Result<Relaxation, MipError> {
        let mut columns = ColumnMap::default();
        let mut lower = Vec::new();
        let mut upper = Vec::new();
        let mut objective = Vec::new();
        for (slot, generation, record) in self.vars.iter() {
            let VarKind::Column(column) = &record.kind else {
                continue;
            };
            if record.side != Side::Transformed {
                continue;
            }
            let index = lower.len();
            columns.insert(VarHandle::from_parts(slot, generation), index, false);
            if let Some(view) = column.negation {
                columns.insert(view, index, true);
            }
            lower.push(column.lb);
            upper.push(column.ub);
            objective.push(column.obj);
        }

        let mut rows = Vec::new();
        for &cons in &working.conss {
            let ConsKind::Linear(row) = &self.cons_record(cons)?.kind else {
                continue;
            };
            let mut merged: BTreeMap<usize, i128> = BTreeMap::new();
            let mut constant: i128 = 0;
            for &(var, coeff) in &row.terms {
                let (index, negated) = columns.get(var).ok_or(MipError::InvalidVar(var))?;
                let coeff = i128::from(coeff);
                if negated {
                    constant += coeff;
                    *merged.entry(index).or_insert(0) -= coeff;
                } else {
                    *merged.entry(index).or_insert(0) += coeff;
                }
            }
            rows.push(Row {
                terms: merged.into_iter().filter(|&(_, c)| c != 0).collect(),
                lhs: row.lhs.map(|lhs| i128::from(lhs) - constant),
                rhs: row.rhs.map(|rhs| i128::from(rhs) - constant),
            });
        }

        Ok(Relaxation {
            columns,
            lower,
            upper,
            objective,
            rows,
            integral: self.is_objective_integral(),
        })
    }
}

fn branch_and_bound<P>(
    relaxation: &Relaxation,
    payload: Option<&P>,
    handler: &mut Option<&mut dyn ConstraintHandler<P>>,
    budget: &CpuBudget,
    node_limit: Option<u64>,
) -> Result<MipOutcome, MipError> {
    let root = Node {
        domains: relaxation
            .lower
            .iter()
            .zip(&relaxation.upper)
            .map(|(&lb, &ub)| (lb, ub))
            .collect(),
        bound: f64::NEG_INFINITY,
        depth: 0,
    };
    let mut stack = vec![root];
    let mut incumbent: Option<Incumbent> = None;
    let mut nodes: u64 = 0;
    let mut stopped = None;

    while let Some(mut node) = stack.pop() {
        if budget.is_exhausted() {
            stack.push(node);
            stopped = Some(MipStatus::TimeLimit);
            break;
        }
        if node_limit.is_some_and(|limit| nodes >= limit) {
            stack.push(node);
            stopped = Some(MipStatus::NodeLimit);
            break;
        }
        nodes += 1;

        let propagation =
            propagate_node(relaxation, &mut node.domains, payload, handler, node.depth)?;
        if propagation == Propagation::Infeasible {
            continue;
        }
        let bound = objective_bound(relaxation, &node.domains);
        if let Some(best) = &incumbent {
            if !improves(bound, best.objective, relaxation.integral) {
                continue;
            }
        }

        let Some(branch) = select_branch_column(relaxation, &node.domains) else {
            let accepted = match handler.as_deref_mut() {
                Some(h) => {
                    let view = NodeDomains::new(
                        payload,
                        &relaxation.columns,
                        &mut node.domains,
                        node.depth,
                    );
                    h.check(&view)?
                }
                None => true,
            };
            if accepted {
                trace!(
                    component = "mip",
                    operation = "incumbent",
                    status = "success",
                    objective = bound,
                    node = nodes,
                    depth = node.depth,
                    "New incumbent"
                );
                incumbent = Some(Incumbent {
                    objective: bound,
                    values: node.domains.iter().map(|&(lb, _)| lb).collect(),
                });
            }
            continue;
        };

        let (lb, ub) = node.domains[branch];
        let (first, second) = if relaxation.objective[branch] >= 0.0 {
            ((lb, lb), (lb + 1, ub))
        } else {
            ((ub, ub), (lb, ub - 1))
        };
        let mut second_child = node.domains.clone();
        second_child[branch] = second;
        let mut first_child = node.domains;
        first_child[branch] = first;
        stack.push(Node {
            domains: second_child,
            bound,
            depth: node.depth + 1,
        });
        stack.push(Node {
            domains: first_child,
            bound,
            depth: node.depth + 1,
        });
    }

    let solution = incumbent.as_ref().map(|best| solution_values(relaxation, best));
    let objective = incumbent.as_ref().map(|best| best.objective);
    let (status, bound) = match stopped {
        None => match objective {
            Some(value) => (MipStatus::Optimal, value),
            None => (MipStatus::Infeasible, f64::INFINITY),
        },
        Some(limit) => {
            let open = stack
                .iter()
                .map(|node| node.bound)
                .fold(f64::INFINITY, f64::min);
            let bound = objective.map_or(open, |value| open.min(value));
            (limit, bound)
        }
    };
    Ok(MipOutcome {
        status,
        objective,
        bound,
        solution,
        nodes,
    })
}

/// Rows to fixpoint, then the handler; repeat while the handler tightens.
fn propagate_node<P>(
    relaxation: &Relaxation,
    domains: &mut [(i64, i64)],
    payload: Option<&P>,
    handler: &mut Option<&mut dyn ConstraintHandler<P>>,
    depth: u32,
) -> Result<Propagation, MipError> {
    let mut result = Propagation::Unchanged;
    loop {
        loop {
            let mut round = Propagation::Unchanged;
            for row in &relaxation.rows {
                round = round.merge(propagate_row(row, domains));
                if round == Propagation::Infeasible {
                    return Ok(Propagation::Infeasible);
                }
            }
            if round == Propagation::Unchanged {
                break;
            }
            result = Propagation::Reduced;
        }

        let Some(h) = handler.as_deref_mut() else {
            return Ok(result);
        };
        let before = domains.to_vec();
        let mut view = NodeDomains::new(payload, &relaxation.columns, domains, depth);
        if h.propagate(&mut view)? == Propagation::Infeasible {
            return Ok(Propagation::Infeasible);
        }
        if before.as_slice() == &*domains {
            return Ok(result);
        }
        result = Propagation::Reduced;
    }
}

/// Activity-based bound tightening for one row.
fn propagate_row(row: &Row, domains: &mut [(i64, i64)]) -> Propagation {
    let mut min_activity: i128 = 0;
    let mut max_activity: i128 = 0;
    for &(index, coeff) in &row.terms {
        let (lo, hi) = term_range(coeff, domains[index]);
        min_activity += lo;
        max_activity += hi;
    }
    if row.rhs.is_some_and(|rhs| min_activity > rhs)
        || row.lhs.is_some_and(|lhs| max_activity < lhs)
    {
        return Propagation::Infeasible;
    }

    let mut result = Propagation::Unchanged;
    for &(index, coeff) in &row.terms {
        let (lb, ub) = domains[index];
        let (lo, hi) = term_range(coeff, (lb, ub));
        let mut new_lb = i128::from(lb);
        let mut new_ub = i128::from(ub);
        if let Some(rhs) = row.rhs {
            let slack = rhs - (min_activity - lo);
            if coeff > 0 {
                new_ub = new_ub.min(floor_div(slack, coeff));
            } else {
                new_lb = new_lb.max(ceil_div(slack, coeff));
            }
        }
        if let Some(lhs) = row.lhs {
            let need = lhs - (max_activity - hi);
            if coeff > 0 {
                new_lb = new_lb.max(ceil_div(need, coeff));
            } else {
                new_ub = new_ub.min(floor_div(need, coeff));
            }
        }
        if new_lb > new_ub {
            return Propagation::Infeasible;
        }
        // both ends stay inside the old i64 bounds
        let tightened = (new_lb as i64, new_ub as i64);
        if tightened != (lb, ub) {
            domains[index] = tightened;
            result = Propagation::Reduced;
        }
    }
    result
}

fn term_range(coeff: i128, (lb, ub): (i64, i64)) -> (i128, i128) {
    let (lb, ub) = (i128::from(lb), i128::from(ub));
    if coeff > 0 {
        (coeff * lb, coeff * ub)
    } else {
        (coeff * ub, coeff * lb)
    }
}

fn floor_div(a: i128, b: i128) -> i128 {
    let q = a / b;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        q - 1
    } else {
        q
    }
}

fn ceil_div(a: i128, b: i128) -> i128 {
    let q = a / b;
    if a % b != 0 && ((a < 0) == (b < 0)) {
        q + 1
    } else {
        q
    }
}

fn objective_bound(relaxation: &Relaxation, domains: &[(i64, i64)]) -> f64 {
    let bound: f64 = relaxation
        .objective
        .iter()
        .zip(domains)
        .map(|(&c, &(lb, ub))| {
            if c > 0.0 {
                c * lb as f64
            } else if c < 0.0 {
                c * ub as f64
            } else {
                0.0
            }
        })
        .sum();
    if relaxation.integral {
        (bound - OBJ_EPS).ceil()
    } else {
        bound
    }
}

/// Whether a subtree with objective bound `bound` can beat `best`.
fn improves(bound: f64, best: f64, integral: bool) -> bool {
    if integral {
        bound <= best - 1.0 + OBJ_EPS
    } else {
        bound < best - OBJ_EPS
    }
}

/// Unfixed column with the largest objective weight, then the narrowest domain.
fn select_branch_column(relaxation: &Relaxation, domains: &[(i64, i64)]) -> Option<usize> {
    domains
        .iter()
        .enumerate()
        .filter(|(_, (lb, ub))| lb < ub)
        .min_by(|(i, (lb_i, ub_i)), (j, (lb_j, ub_j))| {
            let weight_i = relaxation.objective[*i].abs();
            let weight_j = relaxation.objective[*j].abs();
            weight_j
                .total_cmp(&weight_i)
                .then(ub_i.abs_diff(*lb_i).cmp(&ub_j.abs_diff(*lb_j)))
                .then(i.cmp(j))
        })
        .map(|(index, _)| index)
}

fn solution_values(relaxation: &Relaxation, best: &Incumbent) -> MipSolution {
    let values = relaxation
        .columns
        .iter()
        .map(|(var, index, negated)| {
            let value = best.values[index];
            (var, if negated { 1 - value } else { value })
        })
        .collect();
    MipSolution {
        values,
        objective: best.objective,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding_division() {
        assert_eq!(floor_div(7, 2), 3);
        assert_eq!(floor_div(-7, 2), -4);
        assert_eq!(floor_div(7, -2), -4);
        assert_eq!(ceil_div(7, 2), 4);
        assert_eq!(ceil_div(-7, 2), -3);
        assert_eq!(ceil_div(-7, -2), 4);
        assert_eq!(ceil_div(6, 3), 2);
    }

    #[test]
    fn row_propagation_tightens_both_sides() {
        // 3 <= x + 2y <= 4, x in [0,10], y in [0,10]
        let row = Row {
            terms: vec![(0, 1), (1, 2)],
            lhs: Some(3),
            rhs: Some(4),
        };
        let mut domains = vec![(0, 10), (0, 10)];
        assert_eq!(propagate_row(&row, &mut domains), Propagation::Reduced);
        assert_eq!(domains, vec![(0, 4), (0, 2)]);
    }

    #[test]
    fn row_propagation_negative_coefficient() {
        // x - y >= 2, x in [0,3], y in [0,5] -> y <= 1, x >= 2
        let row = Row {
            terms: vec![(0, 1), (1, -1)],
            lhs: Some(2),
            rhs: None,
        };
        let mut domains = vec![(0, 3), (0, 5)];
        propagate_row(&row, &mut domains);
        assert_eq!(domains, vec![(2, 3), (0, 1)]);
    }

    #[test]
    fn row_propagation_detects_wipe_out() {
        let row = Row {
            terms: vec![(0, 1)],
            lhs: Some(5),
            rhs: None,
        };
        let mut domains = vec![(0, 3)];
        assert_eq!(propagate_row(&row, &mut domains), Propagation::Infeasible);
    }

    #[test]
    fn empty_row_checks_its_sides() {
        let row = Row {
            terms: Vec::new(),
            lhs: Some(1),
            rhs: None,
        };
        assert_eq!(propagate_row(&row, &mut []), Propagation::Infeasible);
    }

    #[test]
    fn improvement_test_respects_integrality() {
        assert!(improves(3.0, 4.0, true));
        assert!(!improves(3.5, 4.0, true));
        assert!(improves(3.5, 4.0, false));
        assert!(!improves(4.0, 4.0, false));
    }
}
