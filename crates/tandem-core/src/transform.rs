//! Payload hooks installed on the MIP engine.
//!
//! When the engine builds its working copy, [`transform_problem_data`] clones
//! the tables and swaps every MIP handle for its transformed counterpart.
//! [`free_transformed_problem_data`] releases what the clone acquired.

use crate::problem_data::{MipBackend, ProblemData};
use tandem_mip::{ConsHandle, MipError, TransformScope, VarHandle};
use tracing::{debug, warn};

pub(crate) fn install_hooks(mip: &mut MipBackend) {
    mip.set_prob_trans(transform_problem_data);
    mip.set_prob_deltrans(free_transformed_problem_data);
}

/// Duplicate `source` for the working copy.
///
/// Negated booleans are not transformed on their own: they are re-derived as
/// the complement of the already transformed positive entry. On failure
/// everything acquired so far is released before the error is returned.
pub(crate) fn transform_problem_data(
    source: &ProblemData,
    scope: &mut TransformScope<'_, ProblemData>,
) -> Result<ProblemData, MipError> {
    let mut target = source.clone();
    target.cp_constraint = None;
    let mut acquired = Acquired::default();
    match transform_handles(source, &mut target, &mut acquired, scope) {
        Ok(()) => {
            debug!(
                component = "problem_data",
                operation = "transform",
                status = "success",
                bools = target.num_bools(),
                ints = target.num_ints(),
                has_cp_constraint = target.cp_constraint.is_some(),
                "Transformed problem data"
            );
            Ok(target)
        }
        Err(err) => {
            acquired.release(scope);
            warn!(
                component = "problem_data",
                operation = "transform",
                status = "error",
                error = %err,
                "Problem data transform failed"
            );
            Err(err)
        }
    }
}

/// Release the transformed propagation constraint, each transformed positive
/// boolean and each transformed integer, then drop the copy.
pub(crate) fn free_transformed_problem_data(
    data: ProblemData,
    scope: &mut TransformScope<'_, ProblemData>,
) -> Result<(), MipError> {
    data.release_mip_handles(scope)?;
    debug!(
        component = "problem_data",
        operation = "free_transform",
        status = "success",
        bools = data.num_bools(),
        ints = data.num_ints(),
        "Released transformed problem data"
    );
    Ok(())
}

fn transform_handles(
    source: &ProblemData,
    target: &mut ProblemData,
    acquired: &mut Acquired,
    scope: &mut TransformScope<'_, ProblemData>,
) -> Result<(), MipError> {
    if let Some(cons) = source.cp_constraint {
        let transformed = scope.transform_cons(cons)?;
        acquired.conss.push(transformed);
        target.cp_constraint = Some(transformed);
    }

    // positives always precede their negation
    for index in 0..source.num_bools() {
        if source.index_is_positive(index) {
            let transformed = scope.transform_var(source.mip_bool_vars[index])?;
            acquired.vars.push(transformed);
            target.mip_bool_vars[index] = transformed;
        } else {
            let positive = target.mip_bool_vars[source.neg_idx[index]];
            target.mip_bool_vars[index] = scope.negated_var(positive)?;
        }
    }

    for (index, var) in source.mip_int_vars.iter().enumerate() {
        if let Some(var) = var {
            let transformed = scope.transform_var(*var)?;
            acquired.vars.push(transformed);
            target.mip_int_vars[index] = Some(transformed);
        }
    }
    Ok(())
}

/// Handles captured by a transform that has not completed yet.
#[derive(Default)]
struct Acquired {
    conss: Vec<ConsHandle>,
    vars: Vec<VarHandle>,
}

impl Acquired {
    fn release(self, scope: &mut TransformScope<'_, ProblemData>) {
        for cons in self.conss {
            if let Err(err) = scope.release_cons(cons) {
                warn!(
                    component = "problem_data",
                    operation = "transform_rollback",
                    status = "error",
                    cons = %cons,
                    error = %err,
                    "Failed to release transformed constraint"
                );
            }
        }
        for var in self.vars.into_iter().rev() {
            if let Err(err) = scope.release_var(var) {
                warn!(
                    component = "problem_data",
                    operation = "transform_rollback",
                    status = "error",
                    var = %var,
                    error = %err,
                    "Failed to release transformed variable"
                );
            }
        }
    }
}
