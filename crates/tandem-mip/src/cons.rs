//! Constraint records, constraint handler registry and constraint operations.

use crate::engine::MipEngine;
use crate::error::MipError;
use crate::handle::{ConsHandle, ConshdlrId, VarHandle};
use crate::var::Side;
use tracing::{debug, trace};

/// `lhs <= Σ coeff * var <= rhs`. Terms may refer to negation views.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LinearRow {
    pub(crate) terms: Vec<(VarHandle, i64)>,
    pub(crate) lhs: Option<i64>,
    pub(crate) rhs: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ConsKind {
    Linear(LinearRow),
    /// Opaque constraint enforced by a [`crate::ConstraintHandler`].
    Custom { handler: ConshdlrId },
}

#[derive(Debug, Clone)]
pub(crate) struct ConsRecord {
    pub(crate) name: String,
    pub(crate) side: Side,
    pub(crate) kind: ConsKind,
    pub(crate) refs: u32,
    pub(crate) in_problem: bool,
    pub(crate) transformed: Option<ConsHandle>,
}

impl<P> MipEngine<P> {
    // ── Handler registry ────────────────────────────────────

    /// Register a custom constraint type by name.
    pub fn include_conshdlr(&mut self, name: &str) -> Result<ConshdlrId, MipError> {
        if self.find_conshdlr(name).is_some() {
            return Err(MipError::DuplicateConshdlr(name.to_string()));
        }
        let id = ConshdlrId::new(self.conshdlrs.len() as u32);
        self.conshdlrs.push(name.to_string());
        debug!(
            component = "mip",
            operation = "include_conshdlr",
            status = "success",
            conshdlr = %id,
            name,
            "Registered constraint handler"
        );
        Ok(id)
    }

    pub fn find_conshdlr(&self, name: &str) -> Option<ConshdlrId> {
        self.conshdlrs
            .iter()
            .position(|registered| registered == name)
            .map(|index| ConshdlrId::new(index as u32))
    }

    pub fn conshdlr_name(&self, id: ConshdlrId) -> Result<&str, MipError> {
        self.conshdlrs
            .get(id.slot())
            .map(String::as_str)
            .ok_or(MipError::InvalidConshdlr(id))
    }

    // ── Creation ────────────────────────────────────────────

    /// Create an original linear constraint holding one reference for the
    /// caller. The constraint captures every column it mentions.
    pub fn create_cons_linear(
        &mut self,
        name: &str,
        terms: &[(VarHandle, i64)],
        lhs: Option<i64>,
        rhs: Option<i64>,
    ) -> Result<ConsHandle, MipError> {
        self.require_original_stage("create_cons_linear")?;
        if let (Some(lo), Some(hi)) = (lhs, rhs) {
            if lo > hi {
                return Err(MipError::InvalidBounds { lb: lo, ub: hi });
            }
        }
        let mut kept = Vec::with_capacity(terms.len());
        for &(var, coeff) in terms {
            if self.var_record(var)?.side != Side::Original {
                return Err(MipError::WrongSide(var));
            }
            if coeff != 0 {
                kept.push((var, coeff));
            }
        }
        let row = LinearRow {
            terms: kept,
            lhs,
            rhs,
        };
        let handle = self.alloc_linear(name, Side::Original, row)?;
        trace!(
            component = "mip",
            operation = "create_cons_linear",
            status = "success",
            cons = %handle,
            name,
            lhs = ?lhs,
            rhs = ?rhs,
            "Created linear constraint"
        );
        Ok(handle)
    }

    /// Create an original constraint owned by a registered handler type.
    pub fn create_cons_custom(
        &mut self,
        handler: ConshdlrId,
        name: &str,
    ) -> Result<ConsHandle, MipError> {
        self.require_original_stage("create_cons_custom")?;
        self.conshdlr_name(handler)?;
        let handle = self.alloc_cons(ConsRecord {
            name: name.to_string(),
            side: Side::Original,
            kind: ConsKind::Custom { handler },
            refs: 1,
            in_problem: false,
            transformed: None,
        })?;
        trace!(
            component = "mip",
            operation = "create_cons_custom",
            status = "success",
            cons = %handle,
            conshdlr = %handler,
            name,
            "Created custom constraint"
        );
        Ok(handle)
    }

    /// Add an original constraint to the problem. The problem captures it.
    pub fn add_cons(&mut self, cons: ConsHandle) -> Result<(), MipError> {
        self.require_original_stage("add_cons")?;
        let record = self.cons_record_mut(cons)?;
        if record.side != Side::Original {
            return Err(MipError::InvalidCons(cons));
        }
        if record.in_problem {
            return Err(MipError::ConsAlreadyAdded(cons));
        }
        record.in_problem = true;
        record.refs += 1;
        self.header_mut()?.conss.push(cons);
        Ok(())
    }

    /// Take a constraint out of the problem and drop the problem's capture.
    pub fn del_cons(&mut self, cons: ConsHandle) -> Result<(), MipError> {
        self.require_original_stage("del_cons")?;
        let record = self.cons_record_mut(cons)?;
        if record.side != Side::Original {
            return Err(MipError::InvalidCons(cons));
        }
        if !record.in_problem {
            return Err(MipError::ConsNotAdded(cons));
        }
        record.in_problem = false;
        self.header_mut()?.conss.retain(|&kept| kept != cons);
        self.release_cons(cons)?;
        debug!(
            component = "mip",
            operation = "del_cons",
            status = "success",
            cons = %cons,
            "Removed constraint from problem"
        );
        Ok(())
    }

    pub fn capture_cons(&mut self, cons: ConsHandle) -> Result<(), MipError> {
        self.cons_record_mut(cons)?.refs += 1;
        Ok(())
    }

    /// Drop one reference. At zero the constraint is freed and releases the
    /// columns it captured.
    pub fn release_cons(&mut self, cons: ConsHandle) -> Result<(), MipError> {
        let record = self.cons_record_mut(cons)?;
        record.refs = record.refs.saturating_sub(1);
        if record.refs > 0 {
            return Ok(());
        }
        let removed = self.conss.remove(cons.slot(), cons.generation());
        let captured = match removed.map(|record| record.kind) {
            Some(ConsKind::Linear(row)) => row.terms,
            _ => Vec::new(),
        };
        for (var, _) in captured {
            let (column, _) = self.resolve_var(var)?;
            self.release_var(column)?;
        }
        trace!(
            component = "mip",
            operation = "release_cons",
            status = "freed",
            cons = %cons,
            "Freed constraint"
        );
        Ok(())
    }

    // ── Accessors ───────────────────────────────────────────

    pub fn cons_name(&self, cons: ConsHandle) -> Result<&str, MipError> {
        Ok(self.cons_record(cons)?.name.as_str())
    }

    pub fn cons_refs(&self, cons: ConsHandle) -> Result<u32, MipError> {
        Ok(self.cons_record(cons)?.refs)
    }

    /// Handler type of a custom constraint, `None` for linear constraints.
    pub fn cons_conshdlr(&self, cons: ConsHandle) -> Result<Option<ConshdlrId>, MipError> {
        Ok(match self.cons_record(cons)?.kind {
            ConsKind::Custom { handler } => Some(handler),
            ConsKind::Linear(_) => None,
        })
    }

    pub fn is_transformed_cons(&self, cons: ConsHandle) -> Result<bool, MipError> {
        Ok(self.cons_record(cons)?.side == Side::Transformed)
    }

    // ── Internal ────────────────────────────────────────────

    /// Allocate a linear constraint with zero references and capture the
    /// columns behind its terms.
    pub(crate) fn alloc_linear(
        &mut self,
        name: &str,
        side: Side,
        row: LinearRow,
    ) -> Result<ConsHandle, MipError> {
        for &(var, _) in &row.terms {
            let (column, _) = self.resolve_var(var)?;
            self.capture_var(column)?;
        }
        let refs = u32::from(side == Side::Original);
        self.alloc_cons(ConsRecord {
            name: name.to_string(),
            side,
            kind: ConsKind::Linear(row),
            refs,
            in_problem: false,
            transformed: None,
        })
    }

    pub(crate) fn alloc_cons(&mut self, record: ConsRecord) -> Result<ConsHandle, MipError> {
        let (slot, generation) = self.conss.insert(record).ok_or(MipError::InvalidParam {
            name: "conss",
            reason: "constraint handle space exhausted".to_string(),
        })?;
        Ok(ConsHandle::from_parts(slot, generation))
    }

    pub(crate) fn cons_record(&self, cons: ConsHandle) -> Result<&ConsRecord, MipError> {
        self.conss
            .get(cons.slot(), cons.generation())
            .ok_or(MipError::InvalidCons(cons))
    }

    pub(crate) fn cons_record_mut(&mut self, cons: ConsHandle) -> Result<&mut ConsRecord, MipError> {
        self.conss
            .get_mut(cons.slot(), cons.generation())
            .ok_or(MipError::InvalidCons(cons))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::var::VarType;

    fn engine() -> MipEngine<()> {
        let mut engine = MipEngine::new();
        engine.create_problem("conss").unwrap();
        engine
    }

    #[test]
    fn conshdlr_names_are_unique() {
        let mut engine = engine();
        let id = engine.include_conshdlr("cp").unwrap();
        assert_eq!(engine.find_conshdlr("cp"), Some(id));
        assert_eq!(engine.conshdlr_name(id).unwrap(), "cp");
        assert_eq!(
            engine.include_conshdlr("cp"),
            Err(MipError::DuplicateConshdlr("cp".to_string()))
        );
    }

    #[test]
    fn linear_cons_captures_its_columns() {
        let mut engine = engine();
        let b = engine.create_var("b", 0, 1, 0.0, VarType::Binary).unwrap();
        let nb = engine.get_negated_var(b).unwrap();
        let cons = engine
            .create_cons_linear("row", &[(nb, 2), (b, 0)], Some(1), None)
            .unwrap();
        assert_eq!(engine.var_refs(b).unwrap(), 2);

        // the column outlives its creation reference while the row holds it
        engine.release_var(b).unwrap();
        assert!(engine.var_name(b).is_ok());
        engine.release_cons(cons).unwrap();
        assert!(engine.var_name(b).is_err());
        assert!(engine.census().is_empty());
    }

    #[test]
    fn linear_cons_rejects_inverted_sides() {
        let mut engine = engine();
        assert_eq!(
            engine.create_cons_linear("row", &[], Some(2), Some(1)),
            Err(MipError::InvalidBounds { lb: 2, ub: 1 })
        );
    }

    #[test]
    fn custom_cons_needs_registered_handler() {
        let mut engine = engine();
        assert!(engine.create_cons_custom(ConshdlrId::new(0), "c").is_err());
        let id = engine.include_conshdlr("cp").unwrap();
        let cons = engine.create_cons_custom(id, "c").unwrap();
        engine.add_cons(cons).unwrap();
        assert_eq!(engine.cons_refs(cons).unwrap(), 2);
        assert_eq!(engine.cons_conshdlr(cons).unwrap(), Some(id));
        assert_eq!(engine.add_cons(cons), Err(MipError::ConsAlreadyAdded(cons)));
    }

    #[test]
    fn del_cons_drops_the_problem_capture() {
        let mut engine = engine();
        let x = engine.create_var("x", 0, 3, 0.0, VarType::Integer).unwrap();
        engine.add_var(x).unwrap();
        let keep = engine
            .create_cons_linear("keep", &[(x, 1)], Some(1), None)
            .unwrap();
        let cut = engine
            .create_cons_linear("cut", &[(x, 1)], Some(2), None)
            .unwrap();
        engine.add_cons(keep).unwrap();
        engine.add_cons(cut).unwrap();
        engine.release_cons(cut).unwrap();
        assert_eq!(engine.var_refs(x).unwrap(), 4);

        engine.del_cons(cut).unwrap();
        assert_eq!(engine.problem_conss(), &[keep]);
        assert_eq!(engine.cons_name(cut), Err(MipError::InvalidCons(cut)));
        assert_eq!(engine.var_refs(x).unwrap(), 3);
        assert_eq!(engine.del_cons(cut), Err(MipError::InvalidCons(cut)));

        engine.release_cons(keep).unwrap();
        engine.del_cons(keep).unwrap();
        assert_eq!(engine.problem_conss(), &[] as &[ConsHandle]);
        engine.release_var(x).unwrap();
        engine.free().unwrap();
    }

    #[test]
    fn del_cons_needs_added_constraint() {
        let mut engine = engine();
        let cons = engine.create_cons_linear("row", &[], Some(0), None).unwrap();
        assert_eq!(engine.del_cons(cons), Err(MipError::ConsNotAdded(cons)));
        engine.release_cons(cons).unwrap();
    }
}
