//! Integer linear expressions over boolean and integer model variables.
//!
//! Booleans contribute their 0/1 value. Coefficients and the constant are
//! integers; every combining operation is checked and reports
//! [`ExprError::Overflow`] instead of wrapping.

use crate::error::ExprError;
use crate::ids::{BoolVar, IntVar};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinearExpr {
    constant: i64,
    int_terms: Vec<(IntVar, i64)>,
    bool_terms: Vec<(BoolVar, i64)>,
}

impl LinearExpr {
    // ── Constructors ────────────────────────────────────────

    /// Empty expression (the constant 0).
    pub fn new() -> Self {
        Self::default()
    }

    /// Just a constant, no variable terms.
    pub fn from_constant(constant: i64) -> Self {
        Self {
            constant,
            ..Default::default()
        }
    }

    /// Single integer variable with coefficient 1.
    pub fn int(var: IntVar) -> Self {
        Self::int_term(var, 1)
    }

    /// Single boolean variable with coefficient 1.
    pub fn boolean(var: BoolVar) -> Self {
        Self::bool_term(var, 1)
    }

    /// Single integer term: coeff * var.
    pub fn int_term(var: IntVar, coeff: i64) -> Self {
        Self::new().plus_int(var, coeff)
    }

    /// Single boolean term: coeff * var.
    pub fn bool_term(var: BoolVar, coeff: i64) -> Self {
        Self::new().plus_bool(var, coeff)
    }

    /// Sum of boolean variables, each with coefficient 1.
    pub fn sum_bools(vars: &[BoolVar]) -> Self {
        Self {
            bool_terms: vars.iter().map(|&var| (var, 1)).collect(),
            ..Default::default()
        }
    }

    // ── Builders ────────────────────────────────────────────

    /// Append an integer term. Zero coefficients are dropped.
    pub fn plus_int(mut self, var: IntVar, coeff: i64) -> Self {
        if coeff != 0 {
            self.int_terms.push((var, coeff));
        }
        self
    }

    /// Append a boolean term. Zero coefficients are dropped.
    pub fn plus_bool(mut self, var: BoolVar, coeff: i64) -> Self {
        if coeff != 0 {
            self.bool_terms.push((var, coeff));
        }
        self
    }

    /// Add to the constant.
    pub fn plus_constant(mut self, value: i64) -> Result<Self, ExprError> {
        self.constant = self
            .constant
            .checked_add(value)
            .ok_or(ExprError::Overflow {
                operation: "adding a constant",
            })?;
        Ok(self)
    }

    /// Add another expression term by term.
    pub fn plus(mut self, other: LinearExpr) -> Result<Self, ExprError> {
        self.int_terms.extend(other.int_terms);
        self.bool_terms.extend(other.bool_terms);
        self.plus_constant(other.constant)
    }

    // ── Accessors ───────────────────────────────────────────

    pub fn constant(&self) -> i64 {
        self.constant
    }

    pub fn int_terms(&self) -> &[(IntVar, i64)] {
        &self.int_terms
    }

    pub fn bool_terms(&self) -> &[(BoolVar, i64)] {
        &self.bool_terms
    }

    /// True when the expression has no variable terms.
    pub fn is_constant(&self) -> bool {
        self.int_terms.is_empty() && self.bool_terms.is_empty()
    }

    /// Consume and return (integer terms, boolean terms, constant).
    #[allow(clippy::type_complexity)]
    pub fn into_parts(self) -> (Vec<(IntVar, i64)>, Vec<(BoolVar, i64)>, i64) {
        (self.int_terms, self.bool_terms, self.constant)
    }

    // ── Operations ──────────────────────────────────────────

    /// Multiply every coefficient and the constant by `by`.
    pub fn scale(&self, by: i64) -> Result<Self, ExprError> {
        let overflow = ExprError::Overflow {
            operation: "scaling",
        };
        let int_terms = self
            .int_terms
            .iter()
            .map(|&(var, coeff)| coeff.checked_mul(by).map(|c| (var, c)))
            .collect::<Option<Vec<_>>>()
            .ok_or(overflow.clone())?;
        let bool_terms = self
            .bool_terms
            .iter()
            .map(|&(var, coeff)| coeff.checked_mul(by).map(|c| (var, c)))
            .collect::<Option<Vec<_>>>()
            .ok_or(overflow.clone())?;
        let constant = self.constant.checked_mul(by).ok_or(overflow)?;
        Ok(Self {
            constant,
            int_terms: int_terms.into_iter().filter(|(_, c)| *c != 0).collect(),
            bool_terms: bool_terms.into_iter().filter(|(_, c)| *c != 0).collect(),
        })
    }

    /// Merge repeated variables and drop zero coefficients.
    ///
    /// Terms come out ordered by variable index.
    pub fn normalized(self) -> Result<Self, ExprError> {
        Ok(Self {
            constant: self.constant,
            int_terms: merge_terms(self.int_terms)?,
            bool_terms: merge_terms(self.bool_terms)?,
        })
    }
}

fn merge_terms<V: Ord + Copy>(terms: Vec<(V, i64)>) -> Result<Vec<(V, i64)>, ExprError> {
    let mut merged: BTreeMap<V, i64> = BTreeMap::new();
    for (var, coeff) in terms {
        let slot = merged.entry(var).or_insert(0);
        *slot = slot.checked_add(coeff).ok_or(ExprError::Overflow {
            operation: "merging terms",
        })?;
    }
    Ok(merged.into_iter().filter(|(_, coeff)| *coeff != 0).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_drop_zero_coefficients() {
        let x = IntVar::new(1);
        let b = BoolVar::new(2);
        let expr = LinearExpr::new().plus_int(x, 0).plus_bool(b, 3);
        assert!(expr.int_terms().is_empty());
        assert_eq!(expr.bool_terms(), &[(b, 3)]);
        assert!(!expr.is_constant());
    }

    #[test]
    fn normalized_merges_and_orders_terms() {
        let x = IntVar::new(3);
        let y = IntVar::new(1);
        let expr = LinearExpr::int_term(x, 2)
            .plus_int(y, 5)
            .plus_int(x, -2)
            .plus_int(y, 1)
            .normalized()
            .unwrap();
        assert_eq!(expr.int_terms(), &[(y, 6)]);
    }

    #[test]
    fn plus_combines_constants() {
        let x = IntVar::new(1);
        let lhs = LinearExpr::int(x).plus_constant(4).unwrap();
        let rhs = LinearExpr::from_constant(-1);
        let sum = lhs.plus(rhs).unwrap();
        assert_eq!(sum.constant(), 3);
        assert_eq!(sum.int_terms(), &[(x, 1)]);
    }

    #[test]
    fn scale_multiplies_everything() {
        let b = BoolVar::new(4);
        let expr = LinearExpr::bool_term(b, 3)
            .plus_constant(2)
            .unwrap()
            .scale(-2)
            .unwrap();
        assert_eq!(expr.bool_terms(), &[(b, -6)]);
        assert_eq!(expr.constant(), -4);
    }

    #[test]
    fn scale_reports_overflow() {
        let expr = LinearExpr::int_term(IntVar::new(0), i64::MAX);
        assert_eq!(
            expr.scale(2),
            Err(ExprError::Overflow {
                operation: "scaling"
            })
        );
    }

    #[test]
    fn merge_reports_overflow() {
        let x = IntVar::new(0);
        let result = LinearExpr::int_term(x, i64::MAX)
            .plus_int(x, 1)
            .normalized();
        assert!(matches!(result, Err(ExprError::Overflow { .. })));
    }

    #[test]
    fn sum_bools_uses_unit_coefficients() {
        let vars = [BoolVar::new(2), BoolVar::new(3)];
        let expr = LinearExpr::sum_bools(&vars);
        assert_eq!(expr.bool_terms(), &[(vars[0], 1), (vars[1], 1)]);
    }
}
