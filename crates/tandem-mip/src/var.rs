//! Variable records and reference-counted variable operations.

use crate::engine::MipEngine;
use crate::error::MipError;
use crate::handle::VarHandle;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarType {
    Binary,
    Integer,
}

impl VarType {
    pub fn as_str(self) -> &'static str {
        match self {
            VarType::Binary => "binary",
            VarType::Integer => "integer",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    Original,
    Transformed,
}

#[derive(Debug, Clone)]
pub(crate) struct Column {
    pub(crate) lb: i64,
    pub(crate) ub: i64,
    pub(crate) obj: f64,
    pub(crate) refs: u32,
    pub(crate) in_problem: bool,
    /// Cached complement view, created on first request.
    pub(crate) negation: Option<VarHandle>,
    /// Working-copy counterpart of an original column.
    pub(crate) transformed: Option<VarHandle>,
}

#[derive(Debug, Clone)]
pub(crate) enum VarKind {
    Column(Column),
    Negation { of: VarHandle },
}

#[derive(Debug, Clone)]
pub(crate) struct VarRecord {
    pub(crate) name: String,
    pub(crate) var_type: VarType,
    pub(crate) side: Side,
    pub(crate) kind: VarKind,
}

impl<P> MipEngine<P> {
    // ── Creation ────────────────────────────────────────────

    /// Create an original variable holding one reference for the caller.
    pub fn create_var(
        &mut self,
        name: &str,
        lb: i64,
        ub: i64,
        obj: f64,
        var_type: VarType,
    ) -> Result<VarHandle, MipError> {
        self.require_original_stage("create_var")?;
        validate_domain(lb, ub, var_type)?;
        if !obj.is_finite() {
            return Err(MipError::InvalidObjective(obj));
        }
        let handle = self.alloc_var(VarRecord {
            name: name.to_string(),
            var_type,
            side: Side::Original,
            kind: VarKind::Column(Column {
                lb,
                ub,
                obj,
                refs: 1,
                in_problem: false,
                negation: None,
                transformed: None,
            }),
        })?;
        trace!(
            component = "mip",
            operation = "create_var",
            status = "success",
            var = %handle,
            name,
            lb,
            ub,
            var_type = var_type.as_str(),
            "Created variable"
        );
        Ok(handle)
    }

    /// Add an original column to the problem. The problem captures it.
    pub fn add_var(&mut self, var: VarHandle) -> Result<(), MipError> {
        self.require_original_stage("add_var")?;
        let record = self.var_record_mut(var)?;
        if record.side != Side::Original {
            return Err(MipError::WrongSide(var));
        }
        let VarKind::Column(column) = &mut record.kind else {
            return Err(MipError::NegationView(var));
        };
        if column.in_problem {
            return Err(MipError::VarAlreadyAdded(var));
        }
        column.in_problem = true;
        column.refs += 1;
        self.header_mut()?.vars.push(var);
        Ok(())
    }

    pub fn capture_var(&mut self, var: VarHandle) -> Result<(), MipError> {
        let column = self.column_mut(var)?;
        column.refs += 1;
        Ok(())
    }

    /// Drop one reference. The column and its negation view are freed when
    /// the count reaches zero.
    pub fn release_var(&mut self, var: VarHandle) -> Result<(), MipError> {
        let column = self.column_mut(var)?;
        column.refs = column.refs.saturating_sub(1);
        if column.refs > 0 {
            return Ok(());
        }
        let negation = column.negation;
        self.vars.remove(var.slot(), var.generation());
        if let Some(view) = negation {
            self.vars.remove(view.slot(), view.generation());
        }
        trace!(
            component = "mip",
            operation = "release_var",
            status = "freed",
            var = %var,
            "Freed variable"
        );
        Ok(())
    }

    /// Complement `1 - x` of a binary variable.
    ///
    /// The view is cached on the column and shares its lifetime; it is never
    /// captured or released on its own. Asking for the complement of a view
    /// returns the column.
    pub fn get_negated_var(&mut self, var: VarHandle) -> Result<VarHandle, MipError> {
        let record = self.var_record(var)?;
        let column = match &record.kind {
            VarKind::Negation { of } => return Ok(*of),
            VarKind::Column(column) => column,
        };
        if record.var_type != VarType::Binary {
            return Err(MipError::NotBinary(var));
        }
        if let Some(view) = column.negation {
            return Ok(view);
        }
        let view_record = VarRecord {
            name: format!("~{}", record.name),
            var_type: VarType::Binary,
            side: record.side,
            kind: VarKind::Negation { of: var },
        };
        let view = self.alloc_var(view_record)?;
        self.column_mut(var)?.negation = Some(view);
        trace!(
            component = "mip",
            operation = "get_negated_var",
            status = "success",
            var = %var,
            negation = %view,
            "Created negation view"
        );
        Ok(view)
    }

    pub fn set_var_obj(&mut self, var: VarHandle, obj: f64) -> Result<(), MipError> {
        self.require_original_stage("set_var_obj")?;
        if !obj.is_finite() {
            return Err(MipError::InvalidObjective(obj));
        }
        if self.var_record(var)?.side != Side::Original {
            return Err(MipError::WrongSide(var));
        }
        self.column_mut(var)?.obj = obj;
        Ok(())
    }

    // ── Accessors ───────────────────────────────────────────

    pub fn var_name(&self, var: VarHandle) -> Result<&str, MipError> {
        Ok(self.var_record(var)?.name.as_str())
    }

    pub fn var_type(&self, var: VarHandle) -> Result<VarType, MipError> {
        Ok(self.var_record(var)?.var_type)
    }

    /// Global bounds. A negation view reports `[1 - ub, 1 - lb]` of its column.
    pub fn var_bounds(&self, var: VarHandle) -> Result<(i64, i64), MipError> {
        let (column, negated) = self.resolve_var(var)?;
        let column = self.column(column)?;
        Ok(if negated {
            (1 - column.ub, 1 - column.lb)
        } else {
            (column.lb, column.ub)
        })
    }

    pub fn var_obj(&self, var: VarHandle) -> Result<f64, MipError> {
        Ok(self.column(var)?.obj)
    }

    /// Reference count of the column behind `var`.
    pub fn var_refs(&self, var: VarHandle) -> Result<u32, MipError> {
        let (column, _) = self.resolve_var(var)?;
        Ok(self.column(column)?.refs)
    }

    pub fn is_negation(&self, var: VarHandle) -> Result<bool, MipError> {
        Ok(matches!(
            self.var_record(var)?.kind,
            VarKind::Negation { .. }
        ))
    }

    pub fn is_transformed_var(&self, var: VarHandle) -> Result<bool, MipError> {
        Ok(self.var_record(var)?.side == Side::Transformed)
    }

    /// Working-copy counterpart of an original column, if one is alive.
    pub fn transformed_var(&self, var: VarHandle) -> Result<Option<VarHandle>, MipError> {
        let counterpart = self.column(var)?.transformed;
        Ok(counterpart.filter(|t| self.var_record(*t).is_ok()))
    }

    // ── Internal ────────────────────────────────────────────

    pub(crate) fn alloc_var(&mut self, record: VarRecord) -> Result<VarHandle, MipError> {
        let (slot, generation) = self.vars.insert(record).ok_or(MipError::InvalidParam {
            name: "vars",
            reason: "variable handle space exhausted".to_string(),
        })?;
        Ok(VarHandle::from_parts(slot, generation))
    }

    pub(crate) fn var_record(&self, var: VarHandle) -> Result<&VarRecord, MipError> {
        self.vars
            .get(var.slot(), var.generation())
            .ok_or(MipError::InvalidVar(var))
    }

    pub(crate) fn var_record_mut(&mut self, var: VarHandle) -> Result<&mut VarRecord, MipError> {
        self.vars
            .get_mut(var.slot(), var.generation())
            .ok_or(MipError::InvalidVar(var))
    }

    pub(crate) fn column(&self, var: VarHandle) -> Result<&Column, MipError> {
        match &self.var_record(var)?.kind {
            VarKind::Column(column) => Ok(column),
            VarKind::Negation { .. } => Err(MipError::NegationView(var)),
        }
    }

    pub(crate) fn column_mut(&mut self, var: VarHandle) -> Result<&mut Column, MipError> {
        match &mut self.var_record_mut(var)?.kind {
            VarKind::Column(column) => Ok(column),
            VarKind::Negation { .. } => Err(MipError::NegationView(var)),
        }
    }

    /// Column behind a handle and whether the handle is its complement.
    pub(crate) fn resolve_var(&self, var: VarHandle) -> Result<(VarHandle, bool), MipError> {
        match self.var_record(var)?.kind {
            VarKind::Column(_) => Ok((var, false)),
            VarKind::Negation { of } => Ok((of, true)),
        }
    }
}

fn validate_domain(lb: i64, ub: i64, var_type: VarType) -> Result<(), MipError> {
    let binary_ok = var_type != VarType::Binary || (lb >= 0 && ub <= 1);
    if lb > ub || !binary_ok {
        return Err(MipError::InvalidBounds { lb, ub });
    }
    Ok(())
}
