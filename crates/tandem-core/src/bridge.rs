//! CP propagation inside MIP branch-and-bound.
//!
//! [`CpPropagator`] owns the custom constraint type registered in
//! branch-and-cut mode. At every node it mirrors the MIP domains into the CP
//! engine, lets the CP propagators run and hands the tightened bounds back.
//! At a full assignment it fixes the mapped variables and searches for values
//! of the CP-only integers. It produces no cuts and no explanations.

use crate::problem_data::ProblemData;
use tandem_cp::{CpEngine, CpError, CpIntVar, CpStatus, Literal, SearchRequest};
use tandem_mip::{ConstraintHandler, MipError, NodeDomains, Propagation, VarHandle};
use tandem_solver::CpuBudget;
use tracing::trace;

/// Name of the custom constraint type carrying the CP model.
pub(crate) const CP_CONSHDLR_NAME: &str = "cp_propagation";

pub(crate) struct CpPropagator<'a> {
    cp: &'a mut CpEngine,
    budget: &'a CpuBudget,
    checks: u64,
    rejected: u64,
}

impl<'a> CpPropagator<'a> {
    pub(crate) fn new(cp: &'a mut CpEngine, budget: &'a CpuBudget) -> Self {
        Self {
            cp,
            budget,
            checks: 0,
            rejected: 0,
        }
    }

    pub(crate) fn checks(&self) -> u64 {
        self.checks
    }

    pub(crate) fn rejected(&self) -> u64 {
        self.rejected
    }

    /// Load the node domains into the current CP level and propagate.
    ///
    /// Returns the MIP bounds implied by the CP domains afterwards, or `None`
    /// when the CP model has no solution under the node domains.
    fn propagate_level(
        &mut self,
        links: &[Link],
        node: &NodeDomains<'_, ProblemData>,
    ) -> Result<Option<Vec<(VarHandle, i64, i64)>>, MipError> {
        for link in links {
            let Some((lb, ub)) = node.bounds(link.mip) else {
                continue;
            };
            let (lb, ub) = link.to_cp(lb, ub);
            match self.cp.restrict(link.cp, lb, ub) {
                Ok(_) => {}
                Err(CpError::Conflict) => return Ok(None),
                Err(err) => return Err(payload_error(err)),
            }
        }
        match self.cp.propagate_all() {
            Ok(()) => {}
            Err(CpError::Conflict) => return Ok(None),
            Err(err) => return Err(payload_error(err)),
        }

        let mut bounds = Vec::with_capacity(links.len());
        for link in links {
            let (lb, ub) = self.cp.bounds(link.cp).map_err(payload_error)?;
            let (lb, ub) = link.to_mip(lb, ub);
            bounds.push((link.mip, lb, ub));
        }
        Ok(Some(bounds))
    }
}

impl ConstraintHandler<ProblemData> for CpPropagator<'_> {
    fn name(&self) -> &str {
        CP_CONSHDLR_NAME
    }

    fn propagate(
        &mut self,
        node: &mut NodeDomains<'_, ProblemData>,
    ) -> Result<Propagation, MipError> {
        let Some(data) = node.payload() else {
            return Ok(Propagation::Unchanged);
        };
        let links = links(data);

        self.cp.push_level();
        let result = self.propagate_level(&links, node);
        self.cp.pop_level().map_err(payload_error)?;
        let Some(bounds) = result? else {
            trace!(
                component = "cp_bridge",
                operation = "propagate",
                status = "infeasible",
                depth = node.depth(),
                "CP propagation wiped out a domain"
            );
            return Ok(Propagation::Infeasible);
        };

        let mut outcome = Propagation::Unchanged;
        for (var, lb, ub) in bounds {
            outcome = outcome.merge(node.tighten(var, lb, ub)?);
            if outcome == Propagation::Infeasible {
                break;
            }
        }
        Ok(outcome)
    }

    fn check(&mut self, node: &NodeDomains<'_, ProblemData>) -> Result<bool, MipError> {
        let Some(data) = node.payload() else {
            return Ok(true);
        };
        self.checks += 1;
        let mut request = SearchRequest::satisfy();
        for link in links(data) {
            let Some(value) = node.value(link.mip) else {
                continue;
            };
            let (lb, ub) = link.to_cp(value, value);
            request = request.with_assumption(link.cp, lb, ub);
        }
        let outcome = self.cp.solve(&request, self.budget).map_err(payload_error)?;
        let accepted = matches!(outcome.status, CpStatus::Satisfied | CpStatus::Optimal);
        if !accepted {
            self.rejected += 1;
        }
        trace!(
            component = "cp_bridge",
            operation = "check",
            status = outcome.status.as_str(),
            accepted,
            nodes = outcome.nodes,
            "Checked MIP assignment against the CP model"
        );
        Ok(accepted)
    }
}

/// One MIP column and the CP variable it mirrors.
struct Link {
    mip: VarHandle,
    cp: CpIntVar,
    // literal is `var == 0`: MIP value v is CP value 1 - v
    flipped: bool,
}

impl Link {
    fn to_cp(&self, lb: i64, ub: i64) -> (i64, i64) {
        if self.flipped {
            (1 - ub, 1 - lb)
        } else {
            (lb, ub)
        }
    }

    fn to_mip(&self, lb: i64, ub: i64) -> (i64, i64) {
        self.to_cp(lb, ub)
    }
}

/// Links for every positive boolean and every integer with a column.
///
/// Negated booleans share their positive entry's column and CP variable.
fn links(data: &ProblemData) -> Vec<Link> {
    let mut links = Vec::with_capacity(data.num_bools() + data.num_ints());
    for index in 0..data.num_bools() {
        if !data.index_is_positive(index) {
            continue;
        }
        let literal: Literal = data.cp_bool_vars[index];
        links.push(Link {
            mip: data.mip_bool_vars[index],
            cp: literal.var(),
            flipped: !literal.is_positive(),
        });
    }
    for (index, mip) in data.mip_int_vars.iter().enumerate() {
        if let Some(mip) = mip {
            links.push(Link {
                mip: *mip,
                cp: data.cp_int_vars[index],
                flipped: false,
            });
        }
    }
    links
}

fn payload_error(err: CpError) -> MipError {
    MipError::Payload(err.to_string())
}

