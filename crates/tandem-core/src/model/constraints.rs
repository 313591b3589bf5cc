//! Constraint construction.
//!
//! Linear constraints and clauses go to both backends. Constraints that only
//! the CP engine understands are enforced by every method except pure MIP,
//! which rejects them.
//!
//! A MIP row is created, added to the problem and released right away, so
//! the problem holds its only reference.

use super::{Model, ModelError};
use tandem_cp::{CpIntVar, Literal};
use tandem_expr::{BoolVar, ExprError, IntVar, LinearConstraint};
use tandem_mip::VarHandle;
use tracing::trace;

impl Model {
    /// Add `expr (<=|>=|==) rhs` to both backends.
    ///
    /// Every integer in the expression must have a MIP column.
    pub fn add_linear(&mut self, constraint: LinearConstraint) -> Result<(), ModelError> {
        self.ensure_open()?;
        let (lhs, rhs) = constraint.row_bounds()?;
        let (expr, _, _) = constraint.into_parts();
        let expr = expr.normalized()?;

        let mut mip_terms = Vec::with_capacity(expr.int_terms().len() + expr.bool_terms().len());
        for &(var, coeff) in expr.int_terms() {
            let handle = self
                .data
                .mip_int_var(var)?
                .ok_or(ModelError::UnboundIntVar(var))?;
            mip_terms.push((handle, coeff));
        }
        for &(var, coeff) in expr.bool_terms() {
            mip_terms.push((self.data.mip_bool_var(var)?, coeff));
        }
        let cp_row = self.cp_row(expr.int_terms(), expr.bool_terms())?;

        let name = format!("c{}", self.mip.problem_conss().len());
        self.add_mip_row(&name, &mip_terms, lhs, rhs)?;
        self.post_cp_row(&cp_row, lhs, rhs)?;
        trace!(
            component = "model",
            operation = "add_linear",
            status = "success",
            name = name.as_str(),
            terms = mip_terms.len(),
            lhs = ?lhs,
            rhs = ?rhs,
            "Added linear constraint"
        );
        Ok(())
    }

    /// At least one of `literals` is true. Negated booleans are allowed.
    pub fn add_clause(&mut self, literals: &[BoolVar]) -> Result<(), ModelError> {
        self.ensure_open()?;
        let mut mip_terms: Vec<(VarHandle, i64)> = Vec::with_capacity(literals.len());
        let mut cp_literals: Vec<Literal> = Vec::with_capacity(literals.len());
        for &var in literals {
            mip_terms.push((self.data.mip_bool_var(var)?, 1));
            cp_literals.push(self.data.cp_bool_var(var)?);
        }
        let name = format!("clause{}", self.mip.problem_conss().len());
        self.add_mip_row(&name, &mip_terms, Some(1), None)?;
        self.cp.post_clause(&cp_literals)?;
        trace!(
            component = "model",
            operation = "add_clause",
            status = "success",
            name = name.as_str(),
            literals = literals.len(),
            "Added clause"
        );
        Ok(())
    }

    /// Linear constraint posted to the CP engine only.
    ///
    /// CP-only integers are allowed. Rejected in pure MIP mode.
    pub fn add_cp_linear(&mut self, constraint: LinearConstraint) -> Result<(), ModelError> {
        self.ensure_open()?;
        self.require_cp_constraints("cp_linear")?;
        let (lhs, rhs) = constraint.row_bounds()?;
        let (expr, _, _) = constraint.into_parts();
        let expr = expr.normalized()?;
        let cp_row = self.cp_row(expr.int_terms(), expr.bool_terms())?;
        self.post_cp_row(&cp_row, lhs, rhs)?;
        trace!(
            component = "model",
            operation = "add_cp_linear",
            status = "success",
            terms = cp_row.terms.len(),
            "Added CP linear constraint"
        );
        Ok(())
    }

    /// Pairwise distinct integers, enforced by the CP engine. Rejected in
    /// pure MIP mode.
    pub fn add_all_different(&mut self, vars: &[IntVar]) -> Result<(), ModelError> {
        self.ensure_open()?;
        self.require_cp_constraints("all_different")?;
        let cp_vars = vars
            .iter()
            .map(|&var| self.data.cp_int_var(var))
            .collect::<Result<Vec<_>, _>>()?;
        self.cp.post_all_different(&cp_vars)?;
        trace!(
            component = "model",
            operation = "add_all_different",
            status = "success",
            vars = vars.len(),
            "Added all-different constraint"
        );
        Ok(())
    }

    /// Record that `indicator` stands for `var == value`. Returns the
    /// previous indicator for that value, if any.
    pub fn set_indicator(
        &mut self,
        var: IntVar,
        value: i64,
        indicator: BoolVar,
    ) -> Result<Option<BoolVar>, ModelError> {
        self.ensure_open()?;
        self.data.set_indicator(var, value, indicator)
    }

    pub fn indicator(&self, var: IntVar, value: i64) -> Result<Option<BoolVar>, ModelError> {
        self.data.indicator(var, value)
    }

    // ── Internals ───────────────────────────────────────────

    fn require_cp_constraints(&self, constraint: &'static str) -> Result<(), ModelError> {
        let method = self.method();
        if method.supports_cp_only_constraints() {
            Ok(())
        } else {
            Err(ModelError::UnsupportedConstraint { method, constraint })
        }
    }

    /// Create, add and release one MIP row.
    pub(crate) fn add_mip_row(
        &mut self,
        name: &str,
        terms: &[(VarHandle, i64)],
        lhs: Option<i64>,
        rhs: Option<i64>,
    ) -> Result<(), ModelError> {
        let cons = self.mip.create_cons_linear(name, terms, lhs, rhs)?;
        let added = self.mip.add_cons(cons);
        self.mip.release_cons(cons)?;
        added?;
        Ok(())
    }

    /// CP terms for an expression. A negative literal `!v` reads `1 - v`, so
    /// its coefficient flips and moves `coeff` into the offset.
    fn cp_row(&self, ints: &[(IntVar, i64)], bools: &[(BoolVar, i64)]) -> Result<CpRow, ModelError> {
        let mut terms = Vec::with_capacity(ints.len() + bools.len());
        let mut offset: i64 = 0;
        for &(var, coeff) in ints {
            terms.push((self.data.cp_int_var(var)?, coeff));
        }
        for &(var, coeff) in bools {
            let literal = self.data.cp_bool_var(var)?;
            if literal.is_positive() {
                terms.push((literal.var(), coeff));
            } else {
                let flipped = coeff.checked_neg().ok_or(overflow())?;
                terms.push((literal.var(), flipped));
                offset = offset.checked_add(coeff).ok_or(overflow())?;
            }
        }
        Ok(CpRow { terms, offset })
    }

    /// Post `lhs <= terms + offset <= rhs` to the CP engine.
    fn post_cp_row(&mut self, row: &CpRow, lhs: Option<i64>, rhs: Option<i64>) -> Result<(), ModelError> {
        let shift = |bound: i64| bound.checked_sub(row.offset).ok_or(overflow());
        match (lhs, rhs) {
            (Some(lo), Some(hi)) if lo == hi => {
                self.cp.post_linear_eq(&row.terms, shift(lo)?)?;
            }
            (lo, hi) => {
                if let Some(hi) = hi {
                    self.cp.post_linear_le(&row.terms, shift(hi)?)?;
                }
                if let Some(lo) = lo {
                    let negated = row
                        .terms
                        .iter()
                        .map(|&(var, coeff)| coeff.checked_neg().map(|c| (var, c)))
                        .collect::<Option<Vec<_>>>()
                        .ok_or(overflow())?;
                    let bound = shift(lo)?.checked_neg().ok_or(overflow())?;
                    self.cp.post_linear_le(&negated, bound)?;
                }
            }
        }
        Ok(())
    }
}

struct CpRow {
    terms: Vec<(CpIntVar, i64)>,
    offset: i64,
}

fn overflow() -> ModelError {
    ModelError::Expr(ExprError::Overflow {
        operation: "building a CP row",
    })
}
