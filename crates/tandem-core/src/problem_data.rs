//! Variable tables shared by the two backends.
//!
//! Every boolean exists as a MIP binary column and a CP literal; every
//! integer as a CP variable and, unless it was created CP-only, a MIP integer
//! column. Negated booleans are aliases: they reuse the column through the
//! engine's complement view and the literal through its negation, so no
//! variable is ever created twice.
//!
//! Pairing uses `neg_idx`:
//!
//! - a positive entry `i` without a negation has `neg_idx[i] == i`
//! - a positive entry whose negation lives at `n` has `neg_idx[i] == n > i`
//! - the negative entry `n` has `neg_idx[n] == i < n`
//!
//! so `is_positive(i)` is `neg_idx[i] >= i`. Entries 0 and 1 are the
//! constants false and true, paired with each other.

use crate::model::ModelError;
use crate::solution::Solution;
use std::collections::BTreeMap;
use tandem_cp::{CpEngine, CpIntVar, Literal};
use tandem_expr::{BoolVar, IntVar};
use tandem_mip::{ConsHandle, MipEngine, MipError, TransformScope, VarHandle, VarType};
use tracing::{debug, trace};

/// The MIP engine type carrying [`ProblemData`] as its payload.
pub type MipBackend = MipEngine<ProblemData>;

/// The per-model mapping between model variables and backend handles.
///
/// Cloned by value when the MIP engine builds its working copy; the clone's
/// MIP handles are then swapped for their transformed counterparts.
#[derive(Debug, Clone)]
pub struct ProblemData {
    pub(crate) mip_bool_vars: Vec<VarHandle>,
    pub(crate) cp_bool_vars: Vec<Literal>,
    pub(crate) neg_idx: Vec<usize>,
    pub(crate) bool_names: Vec<String>,
    pub(crate) mip_int_vars: Vec<Option<VarHandle>>,
    pub(crate) cp_int_vars: Vec<CpIntVar>,
    pub(crate) int_lb: Vec<i64>,
    pub(crate) int_ub: Vec<i64>,
    pub(crate) int_names: Vec<String>,
    // Written by callers that encode integers with indicator booleans;
    // nothing in this crate reads it.
    pub(crate) indicator_idx: Vec<BTreeMap<i64, BoolVar>>,
    pub(crate) cp_constraint: Option<ConsHandle>,
    pub(crate) obj_var_idx: IntVar,
    pub(crate) solution: Solution,
}

impl Default for ProblemData {
    fn default() -> Self {
        Self {
            mip_bool_vars: Vec::new(),
            cp_bool_vars: Vec::new(),
            neg_idx: Vec::new(),
            bool_names: Vec::new(),
            mip_int_vars: Vec::new(),
            cp_int_vars: Vec::new(),
            int_lb: Vec::new(),
            int_ub: Vec::new(),
            int_names: Vec::new(),
            indicator_idx: Vec::new(),
            cp_constraint: None,
            obj_var_idx: IntVar::ZERO,
            solution: Solution::default(),
        }
    }
}

impl ProblemData {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Construction ────────────────────────────────────────

    /// Create the constants: boolean false (0), true (1) and the integer
    /// zero (0), which becomes the objective.
    pub(crate) fn install_sentinels(
        &mut self,
        mip: &mut MipBackend,
        cp: &mut CpEngine,
    ) -> Result<(), ModelError> {
        if !self.mip_bool_vars.is_empty() || !self.cp_int_vars.is_empty() {
            return Err(ModelError::Mip(MipError::ProblemExists));
        }

        let false_var = add_column(mip, "false", 0, 0, VarType::Binary)?;
        self.push_bool(false_var, Literal::FALSE, 1, "false");

        let true_var = mip.get_negated_var(false_var)?;
        self.push_bool(true_var, Literal::TRUE, 0, "true");

        let zero = add_column(mip, "zero", 0, 0, VarType::Integer)?;
        let cp_zero = cp.new_int(0, 0)?;
        self.push_int(Some(zero), cp_zero, 0, 0, "0");
        self.obj_var_idx = IntVar::ZERO;

        debug!(
            component = "problem_data",
            operation = "install_sentinels",
            status = "success",
            false_var = %false_var,
            true_var = %true_var,
            zero = %zero,
            "Created constant variables"
        );
        Ok(())
    }

    /// New boolean variable in both backends. Never returns the constants.
    pub fn create_boolean_variable(
        &mut self,
        mip: &mut MipBackend,
        cp: &mut CpEngine,
        name: &str,
    ) -> Result<BoolVar, ModelError> {
        self.require_sentinels()?;
        let mip_var = add_column(mip, name, 0, 1, VarType::Binary)?;
        let literal = cp.new_bool();
        let index = self.mip_bool_vars.len();
        self.push_bool(mip_var, literal, index, name);
        let var = bool_id(index);
        trace!(
            component = "problem_data",
            operation = "create_boolean_variable",
            status = "success",
            var = %var,
            mip = %mip_var,
            cp = %literal,
            name,
            "Created boolean variable"
        );
        Ok(var)
    }

    /// The negation of a positive boolean, created on first request.
    ///
    /// The negation shares the column and the CP variable of `var`.
    pub fn negate(&mut self, mip: &mut MipBackend, var: BoolVar) -> Result<BoolVar, ModelError> {
        let index = self.check_bool(var)?;
        if !self.index_is_positive(index) {
            return Err(ModelError::NegationOfNegation(var));
        }
        if self.neg_idx[index] != index {
            return Ok(bool_id(self.neg_idx[index]));
        }

        let mip_var = mip.get_negated_var(self.mip_bool_vars[index])?;
        let literal = self.cp_bool_vars[index].negated();
        let name = format!("~{}", self.bool_names[index]);
        let negation = self.mip_bool_vars.len();
        self.push_bool(mip_var, literal, index, &name);
        self.neg_idx[index] = negation;
        trace!(
            component = "problem_data",
            operation = "negate",
            status = "success",
            var = %var,
            negation = negation,
            "Created negated boolean"
        );
        Ok(bool_id(negation))
    }

    /// New integer variable with identical bounds in both backends.
    pub fn create_integer_variable(
        &mut self,
        mip: &mut MipBackend,
        cp: &mut CpEngine,
        name: &str,
        lb: i64,
        ub: i64,
    ) -> Result<IntVar, ModelError> {
        self.require_sentinels()?;
        if lb > ub {
            return Err(ModelError::InvalidBounds { lb, ub });
        }
        let mip_var = add_column(mip, name, lb, ub, VarType::Integer)?;
        let cp_var = match cp.new_int(lb, ub) {
            Ok(cp_var) => cp_var,
            Err(err) => {
                mip.release_var(mip_var)?;
                return Err(err.into());
            }
        };
        let var = self.push_int(Some(mip_var), cp_var, lb, ub, name);
        trace!(
            component = "problem_data",
            operation = "create_integer_variable",
            status = "success",
            var = %var,
            mip = %mip_var,
            cp = %cp_var,
            lb,
            ub,
            "Created integer variable"
        );
        Ok(var)
    }

    /// New integer variable that only the CP engine knows about.
    pub fn create_cp_integer_variable(
        &mut self,
        cp: &mut CpEngine,
        name: &str,
        lb: i64,
        ub: i64,
    ) -> Result<IntVar, ModelError> {
        self.require_sentinels()?;
        if lb > ub {
            return Err(ModelError::InvalidBounds { lb, ub });
        }
        let cp_var = cp.new_int(lb, ub)?;
        let var = self.push_int(None, cp_var, lb, ub, name);
        trace!(
            component = "problem_data",
            operation = "create_cp_integer_variable",
            status = "success",
            var = %var,
            cp = %cp_var,
            lb,
            ub,
            "Created CP-only integer variable"
        );
        Ok(var)
    }

    // ── Aliasing ────────────────────────────────────────────

    pub fn is_positive(&self, var: BoolVar) -> Result<bool, ModelError> {
        let index = self.check_bool(var)?;
        Ok(self.index_is_positive(index))
    }

    /// The paired entry of `var`, or `None` for a positive boolean whose
    /// negation was never requested.
    pub fn negation_of(&self, var: BoolVar) -> Result<Option<BoolVar>, ModelError> {
        let index = self.check_bool(var)?;
        let paired = self.neg_idx[index];
        Ok((paired != index).then(|| bool_id(paired)))
    }

    /// Check the pairing invariants over the whole boolean table.
    pub fn aliasing_is_consistent(&self) -> bool {
        let len = self.neg_idx.len();
        if self.mip_bool_vars.len() != len
            || self.cp_bool_vars.len() != len
            || self.bool_names.len() != len
        {
            return false;
        }
        self.neg_idx.iter().enumerate().all(|(index, &paired)| {
            paired < len && (paired == index || self.neg_idx[paired] == index)
        })
    }

    // ── Accessors ───────────────────────────────────────────

    pub fn num_bools(&self) -> usize {
        self.mip_bool_vars.len()
    }

    pub fn num_ints(&self) -> usize {
        self.cp_int_vars.len()
    }

    pub fn mip_bool_var(&self, var: BoolVar) -> Result<VarHandle, ModelError> {
        Ok(self.mip_bool_vars[self.check_bool(var)?])
    }

    pub fn cp_bool_var(&self, var: BoolVar) -> Result<Literal, ModelError> {
        Ok(self.cp_bool_vars[self.check_bool(var)?])
    }

    pub fn bool_name(&self, var: BoolVar) -> Result<&str, ModelError> {
        Ok(self.bool_names[self.check_bool(var)?].as_str())
    }

    /// MIP column of an integer, `None` for a CP-only integer.
    pub fn mip_int_var(&self, var: IntVar) -> Result<Option<VarHandle>, ModelError> {
        Ok(self.mip_int_vars[self.check_int(var)?])
    }

    pub fn cp_int_var(&self, var: IntVar) -> Result<CpIntVar, ModelError> {
        Ok(self.cp_int_vars[self.check_int(var)?])
    }

    pub fn int_bounds(&self, var: IntVar) -> Result<(i64, i64), ModelError> {
        let index = self.check_int(var)?;
        Ok((self.int_lb[index], self.int_ub[index]))
    }

    pub fn int_name(&self, var: IntVar) -> Result<&str, ModelError> {
        Ok(self.int_names[self.check_int(var)?].as_str())
    }

    pub fn objective_var(&self) -> IntVar {
        self.obj_var_idx
    }

    pub(crate) fn set_objective_var(&mut self, var: IntVar) -> Result<(), ModelError> {
        self.check_int(var)?;
        self.obj_var_idx = var;
        Ok(())
    }

    /// Propagation constraint registered with the MIP engine, if any.
    pub fn cp_constraint(&self) -> Option<ConsHandle> {
        self.cp_constraint
    }

    pub fn solution(&self) -> &Solution {
        &self.solution
    }

    // ── Indicators ──────────────────────────────────────────

    /// Record that `indicator` stands for `var == value`.
    pub fn set_indicator(
        &mut self,
        var: IntVar,
        value: i64,
        indicator: BoolVar,
    ) -> Result<Option<BoolVar>, ModelError> {
        let index = self.check_int(var)?;
        self.check_bool(indicator)?;
        Ok(self.indicator_idx[index].insert(value, indicator))
    }

    pub fn indicator(&self, var: IntVar, value: i64) -> Result<Option<BoolVar>, ModelError> {
        let index = self.check_int(var)?;
        Ok(self.indicator_idx[index].get(&value).copied())
    }

    // ── Release ─────────────────────────────────────────────

    /// Release every MIP reference the tables hold: the propagation
    /// constraint, then positive booleans, then integers.
    ///
    /// Negated booleans are complement views and hold no reference. All
    /// releases are attempted; the first failure is returned.
    pub(crate) fn release_mip_handles<R: ReleaseHandles>(&self, engine: &mut R) -> Result<(), MipError> {
        let mut first_error = None;
        if let Some(cons) = self.cp_constraint {
            if let Err(err) = engine.release_cons(cons) {
                first_error.get_or_insert(err);
            }
        }
        for (index, &var) in self.mip_bool_vars.iter().enumerate() {
            if !self.index_is_positive(index) {
                continue;
            }
            if let Err(err) = engine.release_var(var) {
                first_error.get_or_insert(err);
            }
        }
        for &var in self.mip_int_vars.iter().flatten() {
            if let Err(err) = engine.release_var(var) {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    // ── Internals ───────────────────────────────────────────

    pub(crate) fn index_is_positive(&self, index: usize) -> bool {
        self.neg_idx[index] >= index
    }

    pub(crate) fn check_bool(&self, var: BoolVar) -> Result<usize, ModelError> {
        let index = var.index();
        if index < self.neg_idx.len() {
            Ok(index)
        } else {
            Err(ModelError::InvalidBoolVar(var))
        }
    }

    pub(crate) fn check_int(&self, var: IntVar) -> Result<usize, ModelError> {
        let index = var.index();
        if index < self.cp_int_vars.len() {
            Ok(index)
        } else {
            Err(ModelError::InvalidIntVar(var))
        }
    }

    fn require_sentinels(&self) -> Result<(), ModelError> {
        if self.num_bools() < 2 || self.num_ints() < 1 {
            return Err(ModelError::MissingSentinels);
        }
        Ok(())
    }

    fn push_bool(&mut self, mip_var: VarHandle, literal: Literal, paired: usize, name: &str) {
        self.mip_bool_vars.push(mip_var);
        self.cp_bool_vars.push(literal);
        self.neg_idx.push(paired);
        self.bool_names.push(name.to_string());
    }

    fn push_int(
        &mut self,
        mip_var: Option<VarHandle>,
        cp_var: CpIntVar,
        lb: i64,
        ub: i64,
        name: &str,
    ) -> IntVar {
        let var = IntVar::new(self.cp_int_vars.len() as u32);
        self.mip_int_vars.push(mip_var);
        self.cp_int_vars.push(cp_var);
        self.int_lb.push(lb);
        self.int_ub.push(ub);
        self.int_names.push(name.to_string());
        self.indicator_idx.push(BTreeMap::new());
        var
    }
}

/// Engines that can drop a reference to a MIP handle.
pub(crate) trait ReleaseHandles {
    fn release_var(&mut self, var: VarHandle) -> Result<(), MipError>;
    fn release_cons(&mut self, cons: ConsHandle) -> Result<(), MipError>;
}

impl<P> ReleaseHandles for MipEngine<P> {
    fn release_var(&mut self, var: VarHandle) -> Result<(), MipError> {
        MipEngine::release_var(self, var)
    }

    fn release_cons(&mut self, cons: ConsHandle) -> Result<(), MipError> {
        MipEngine::release_cons(self, cons)
    }
}

impl<P> ReleaseHandles for TransformScope<'_, P> {
    fn release_var(&mut self, var: VarHandle) -> Result<(), MipError> {
        TransformScope::release_var(self, var)
    }

    fn release_cons(&mut self, cons: ConsHandle) -> Result<(), MipError> {
        TransformScope::release_cons(self, cons)
    }
}

fn bool_id(index: usize) -> BoolVar {
    BoolVar::new(index as u32)
}

/// Create a column and add it to the problem. The caller keeps the creation
/// reference.
fn add_column(
    mip: &mut MipBackend,
    name: &str,
    lb: i64,
    ub: i64,
    var_type: VarType,
) -> Result<VarHandle, MipError> {
    let var = mip.create_var(name, lb, ub, 0.0, var_type)?;
    if let Err(err) = mip.add_var(var) {
        mip.release_var(var)?;
        return Err(err);
    }
    Ok(var)
}
