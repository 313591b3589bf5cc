//! Original/transformed problem lifecycle.
//!
//! `transform_problem` builds a working copy: every problem variable and
//! constraint gets a transformed counterpart captured by the working problem,
//! and the payload trans hook produces the working copy of the caller's
//! payload. `free_transform` runs the deltrans hook, drops the working
//! problem's captures and verifies that no transformed entity survived.

use crate::cons::{ConsKind, ConsRecord, LinearRow};
use crate::engine::{MipEngine, WorkingProblem};
use crate::error::MipError;
use crate::handle::{ConsHandle, HandleCensus, VarHandle};
use crate::var::{Column, Side, VarKind, VarRecord};
use tracing::{debug, trace, warn};

/// Builds the working copy of the payload from the original one.
pub type ProbTransFn<P> = fn(&P, &mut TransformScope<'_, P>) -> Result<P, MipError>;

/// Tears down the working copy of the payload, releasing what it captured.
pub type ProbDelTransFn<P> = fn(P, &mut TransformScope<'_, P>) -> Result<(), MipError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProblemStage {
    /// Only the original problem exists.
    Original,
    /// The working copy is being built.
    Transforming,
    /// The working copy exists and can be solved.
    Transformed,
    /// A working copy existed and has been discarded.
    Released,
}

impl ProblemStage {
    pub fn as_str(self) -> &'static str {
        match self {
            ProblemStage::Original => "original",
            ProblemStage::Transforming => "transforming",
            ProblemStage::Transformed => "transformed",
            ProblemStage::Released => "released",
        }
    }

    /// The original problem may be modified in this stage.
    pub fn is_original_side(self) -> bool {
        matches!(self, ProblemStage::Original | ProblemStage::Released)
    }
}

/// Engine access handed to payload hooks.
pub struct TransformScope<'a, P> {
    engine: &'a mut MipEngine<P>,
}

impl<P> TransformScope<'_, P> {
    pub fn stage(&self) -> ProblemStage {
        self.engine.stage
    }

    /// Transformed counterpart of an original column, captured for the caller.
    pub fn transform_var(&mut self, var: VarHandle) -> Result<VarHandle, MipError> {
        let record = self.engine.var_record(var)?;
        if record.side != Side::Original {
            return Err(MipError::WrongSide(var));
        }
        let counterpart = self.engine.ensure_transformed_var(var)?;
        self.engine.capture_var(counterpart)?;
        Ok(counterpart)
    }

    /// Transformed counterpart of an original constraint, captured for the caller.
    pub fn transform_cons(&mut self, cons: ConsHandle) -> Result<ConsHandle, MipError> {
        if self.engine.cons_record(cons)?.side != Side::Original {
            return Err(MipError::InvalidCons(cons));
        }
        let counterpart = self.engine.ensure_transformed_cons(cons)?;
        self.engine.capture_cons(counterpart)?;
        Ok(counterpart)
    }

    /// Complement view of a binary column. Not captured.
    pub fn negated_var(&mut self, var: VarHandle) -> Result<VarHandle, MipError> {
        self.engine.get_negated_var(var)
    }

    pub fn release_var(&mut self, var: VarHandle) -> Result<(), MipError> {
        self.engine.release_var(var)
    }

    pub fn release_cons(&mut self, cons: ConsHandle) -> Result<(), MipError> {
        self.engine.release_cons(cons)
    }
}

impl<P> MipEngine<P> {
    pub fn set_prob_trans(&mut self, hook: ProbTransFn<P>) {
        self.prob_trans = Some(hook);
    }

    pub fn set_prob_deltrans(&mut self, hook: ProbDelTransFn<P>) {
        self.prob_deltrans = Some(hook);
    }

    /// Build the working copy of the problem and of `original`.
    ///
    /// On failure everything created on the transformed side is discarded
    /// and the stage is restored.
    pub fn transform_problem(&mut self, original: &P) -> Result<(), MipError> {
        self.require_original_stage("transform_problem")?;
        if self.prob_trans.is_some() != self.prob_deltrans.is_some() {
            return Err(MipError::MissingPayloadHook);
        }
        let previous = self.stage;
        self.stage = ProblemStage::Transforming;
        match self.build_working_problem(original) {
            Ok(()) => {
                self.stage = ProblemStage::Transformed;
                let census = self.census();
                debug!(
                    component = "mip",
                    operation = "transform",
                    status = "success",
                    transformed_vars = census.transformed_vars,
                    transformed_conss = census.transformed_conss,
                    has_payload = self.transformed_data().is_some(),
                    "Built transformed problem"
                );
                Ok(())
            }
            Err(err) => {
                self.purge_transformed();
                self.stage = previous;
                warn!(
                    component = "mip",
                    operation = "transform",
                    status = "error",
                    error = %err,
                    "Transform failed, working copy discarded"
                );
                Err(err)
            }
        }
    }

    /// Discard the working copy.
    ///
    /// Fails with [`MipError::LeakedHandles`] when the deltrans hook did not
    /// release everything the trans hook captured. The working copy is gone
    /// either way and the stage moves to [`ProblemStage::Released`].
    pub fn free_transform(&mut self) -> Result<(), MipError> {
        if self.stage != ProblemStage::Transformed {
            return Err(MipError::WrongStage {
                operation: "free_transform",
                stage: self.stage,
            });
        }
        let mut first_error = None;
        if let Some(working) = self.working.take() {
            let WorkingProblem {
                vars,
                conss,
                payload,
            } = working;
            if let (Some(payload), Some(hook)) = (payload, self.prob_deltrans) {
                if let Err(err) = hook(payload, &mut TransformScope { engine: self }) {
                    first_error.get_or_insert(err);
                }
            }
            for cons in conss.into_iter().rev() {
                if let Err(err) = self.release_cons(cons) {
                    first_error.get_or_insert(err);
                }
            }
            for var in vars.into_iter().rev() {
                if let Err(err) = self.release_var(var) {
                    first_error.get_or_insert(err);
                }
            }
        }

        let census = self.census();
        self.purge_transformed();
        self.stage = ProblemStage::Released;
        if !census.transformed_is_empty() {
            first_error.get_or_insert(MipError::LeakedHandles(HandleCensus {
                original_vars: 0,
                original_conss: 0,
                ..census
            }));
        }
        match first_error {
            Some(err) => {
                warn!(
                    component = "mip",
                    operation = "free_transform",
                    status = "error",
                    error = %err,
                    "Transformed problem freed with errors"
                );
                Err(err)
            }
            None => {
                debug!(
                    component = "mip",
                    operation = "free_transform",
                    status = "success",
                    "Freed transformed problem"
                );
                Ok(())
            }
        }
    }

    /// Working copy of the payload while the problem is transformed.
    pub fn transformed_data(&self) -> Option<&P> {
        self.working
            .as_ref()
            .and_then(|working| working.payload.as_ref())
    }

    fn build_working_problem(&mut self, original: &P) -> Result<(), MipError> {
        let (vars, conss) = match &self.problem {
            Some(header) => (header.vars.clone(), header.conss.clone()),
            None => return Err(MipError::NoProblem),
        };

        let mut working_vars = Vec::with_capacity(vars.len());
        for var in vars {
            let counterpart = self.ensure_transformed_var(var)?;
            self.capture_var(counterpart)?;
            working_vars.push(counterpart);
        }
        let mut working_conss = Vec::with_capacity(conss.len());
        for cons in conss {
            let counterpart = self.ensure_transformed_cons(cons)?;
            self.capture_cons(counterpart)?;
            working_conss.push(counterpart);
        }
        self.working = Some(WorkingProblem {
            vars: working_vars,
            conss: working_conss,
            payload: None,
        });

        if let Some(hook) = self.prob_trans {
            let payload = hook(original, &mut TransformScope { engine: self })?;
            if let Some(working) = self.working.as_mut() {
                working.payload = Some(payload);
            }
        }
        Ok(())
    }

    /// Transformed column for an original column, created with no references
    /// on first request.
    pub(crate) fn ensure_transformed_var(&mut self, var: VarHandle) -> Result<VarHandle, MipError> {
        if let Some(existing) = self.transformed_var(var)? {
            return Ok(existing);
        }
        let record = self.var_record(var)?;
        let column = self.column(var)?;
        let copy = VarRecord {
            name: format!("t_{}", record.name),
            var_type: record.var_type,
            side: Side::Transformed,
            kind: VarKind::Column(Column {
                lb: column.lb,
                ub: column.ub,
                obj: column.obj,
                refs: 0,
                in_problem: false,
                negation: None,
                transformed: None,
            }),
        };
        let counterpart = self.alloc_var(copy)?;
        self.column_mut(var)?.transformed = Some(counterpart);
        trace!(
            component = "mip",
            operation = "transform_var",
            status = "success",
            var = %var,
            transformed = %counterpart,
            "Created transformed variable"
        );
        Ok(counterpart)
    }

    /// Transformed constraint for an original constraint, created with no
    /// references on first request. Linear terms are mapped onto transformed
    /// columns, negation views onto the complement of the transformed column.
    pub(crate) fn ensure_transformed_cons(
        &mut self,
        cons: ConsHandle,
    ) -> Result<ConsHandle, MipError> {
        let record = self.cons_record(cons)?;
        if let Some(existing) = record.transformed {
            if self.cons_record(existing).is_ok() {
                return Ok(existing);
            }
        }
        let name = format!("t_{}", record.name);
        let counterpart = match record.kind.clone() {
            ConsKind::Custom { handler } => self.alloc_cons(ConsRecord {
                name,
                side: Side::Transformed,
                kind: ConsKind::Custom { handler },
                refs: 0,
                in_problem: false,
                transformed: None,
            })?,
            ConsKind::Linear(row) => {
                let mut terms = Vec::with_capacity(row.terms.len());
                for (var, coeff) in row.terms {
                    let (column, negated) = self.resolve_var(var)?;
                    let mut mapped = self.ensure_transformed_var(column)?;
                    if negated {
                        mapped = self.get_negated_var(mapped)?;
                    }
                    terms.push((mapped, coeff));
                }
                let row = LinearRow {
                    terms,
                    lhs: row.lhs,
                    rhs: row.rhs,
                };
                self.alloc_linear(&name, Side::Transformed, row)?
            }
        };
        self.cons_record_mut(cons)?.transformed = Some(counterpart);
        Ok(counterpart)
    }

    /// Drop every transformed record and the working copy, and clear the
    /// links from original entities.
    pub(crate) fn purge_transformed(&mut self) {
        self.vars.retain(|record| record.side != Side::Transformed);
        self.conss.retain(|record| record.side != Side::Transformed);
        for record in self.vars.values_mut() {
            if let VarKind::Column(column) = &mut record.kind {
                column.transformed = None;
            }
        }
        for record in self.conss.values_mut() {
            record.transformed = None;
        }
        self.working = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::var::VarType;

    #[test]
    fn stage_sides() {
        assert!(ProblemStage::Original.is_original_side());
        assert!(ProblemStage::Released.is_original_side());
        assert!(!ProblemStage::Transforming.is_original_side());
        assert!(!ProblemStage::Transformed.is_original_side());
    }

    #[test]
    fn transform_round_trip_without_payload() {
        let mut engine: MipEngine<()> = MipEngine::new();
        engine.create_problem("p").unwrap();
        let b = engine.create_var("b", 0, 1, 0.0, VarType::Binary).unwrap();
        engine.add_var(b).unwrap();
        let nb = engine.get_negated_var(b).unwrap();
        let row = engine
            .create_cons_linear("row", &[(nb, 1)], Some(1), None)
            .unwrap();
        engine.add_cons(row).unwrap();
        engine.release_cons(row).unwrap();

        engine.transform_problem(&()).unwrap();
        assert_eq!(engine.stage(), ProblemStage::Transformed);
        let census = engine.census();
        assert_eq!(census.transformed_vars, 1);
        assert_eq!(census.transformed_conss, 1);
        let tb = engine.transformed_var(b).unwrap().unwrap();
        assert!(engine.is_transformed_var(tb).unwrap());

        engine.free_transform().unwrap();
        assert_eq!(engine.stage(), ProblemStage::Released);
        assert!(engine.census().transformed_is_empty());
        assert_eq!(engine.transformed_var(b).unwrap(), None);

        engine.release_var(b).unwrap();
        engine.free().unwrap();
    }

    #[test]
    fn repeated_transforms_reuse_slots() {
        let mut engine: MipEngine<()> = MipEngine::new();
        engine.create_problem("p").unwrap();
        let b = engine.create_var("b", 0, 1, 0.0, VarType::Binary).unwrap();
        engine.add_var(b).unwrap();
        let nb = engine.get_negated_var(b).unwrap();
        let row = engine
            .create_cons_linear("row", &[(b, 1), (nb, 1)], Some(1), None)
            .unwrap();
        engine.add_cons(row).unwrap();

        engine.transform_problem(&()).unwrap();
        let first = engine.transformed_var(b).unwrap().unwrap();
        engine.free_transform().unwrap();
        let (var_slots, cons_slots) = (engine.vars.slots(), engine.conss.slots());

        for _ in 0..5 {
            engine.transform_problem(&()).unwrap();
            engine.free_transform().unwrap();
        }
        assert_eq!(engine.vars.slots(), var_slots);
        assert_eq!(engine.conss.slots(), cons_slots);
        assert_eq!(engine.var_name(first), Err(MipError::InvalidVar(first)));

        engine.release_cons(row).unwrap();
        engine.release_var(b).unwrap();
        engine.free().unwrap();
    }

    #[test]
    fn original_is_frozen_while_transformed() {
        let mut engine: MipEngine<()> = MipEngine::new();
        engine.create_problem("p").unwrap();
        engine.transform_problem(&()).unwrap();
        assert!(matches!(
            engine.create_var("x", 0, 1, 0.0, VarType::Integer),
            Err(MipError::WrongStage { .. })
        ));
        assert!(matches!(
            engine.transform_problem(&()),
            Err(MipError::WrongStage { .. })
        ));
        engine.free_transform().unwrap();
        assert!(engine.create_var("x", 0, 1, 0.0, VarType::Integer).is_ok());
        assert!(matches!(
            engine.free_transform(),
            Err(MipError::WrongStage { .. })
        ));
    }

    #[test]
    fn hooks_must_be_installed_together() {
        fn trans(data: &u8, _: &mut TransformScope<'_, u8>) -> Result<u8, MipError> {
            Ok(*data)
        }
        let mut engine: MipEngine<u8> = MipEngine::new();
        engine.create_problem("p").unwrap();
        engine.set_prob_trans(trans);
        assert_eq!(
            engine.transform_problem(&1),
            Err(MipError::MissingPayloadHook)
        );
    }
}
