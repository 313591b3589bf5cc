//! Constraint expressions: linear expression with comparison sense and RHS.

use crate::error::ExprError;
use crate::linear::LinearExpr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonSense {
    LessEqual,
    GreaterEqual,
    Equal,
}

impl ComparisonSense {
    pub fn as_str(self) -> &'static str {
        match self {
            ComparisonSense::LessEqual => "le",
            ComparisonSense::GreaterEqual => "ge",
            ComparisonSense::Equal => "eq",
        }
    }

    /// Parse the short form produced by [`ComparisonSense::as_str`] or the
    /// usual operator spellings.
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "le" | "<=" => Some(ComparisonSense::LessEqual),
            "ge" | ">=" => Some(ComparisonSense::GreaterEqual),
            "eq" | "=" | "==" => Some(ComparisonSense::Equal),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearConstraint {
    expr: LinearExpr,
    sense: ComparisonSense,
    rhs: i64,
}

impl LinearConstraint {
    pub fn new(expr: LinearExpr, sense: ComparisonSense, rhs: i64) -> Self {
        Self { expr, sense, rhs }
    }

    /// `expr <= rhs`
    pub fn le(expr: LinearExpr, rhs: i64) -> Self {
        Self::new(expr, ComparisonSense::LessEqual, rhs)
    }

    /// `expr >= rhs`
    pub fn ge(expr: LinearExpr, rhs: i64) -> Self {
        Self::new(expr, ComparisonSense::GreaterEqual, rhs)
    }

    /// `expr == rhs`
    pub fn eq(expr: LinearExpr, rhs: i64) -> Self {
        Self::new(expr, ComparisonSense::Equal, rhs)
    }

    pub fn expr(&self) -> &LinearExpr {
        &self.expr
    }

    pub fn sense(&self) -> ComparisonSense {
        self.sense
    }

    pub fn rhs(&self) -> i64 {
        self.rhs
    }

    pub fn into_parts(self) -> (LinearExpr, ComparisonSense, i64) {
        (self.expr, self.sense, self.rhs)
    }

    /// Row form `lhs <= terms <= rhs` with the expression constant moved to
    /// the bounds. `None` means unbounded on that side.
    pub fn row_bounds(&self) -> Result<(Option<i64>, Option<i64>), ExprError> {
        let shifted = self
            .rhs
            .checked_sub(self.expr.constant())
            .ok_or(ExprError::Overflow {
                operation: "moving the constant to the right-hand side",
            })?;
        Ok(match self.sense {
            ComparisonSense::LessEqual => (None, Some(shifted)),
            ComparisonSense::GreaterEqual => (Some(shifted), None),
            ComparisonSense::Equal => (Some(shifted), Some(shifted)),
        })
    }
}
