//! Model error types.

use tandem_cp::CpError;
use tandem_expr::{BoolVar, ExprError, IntVar};
use tandem_mip::MipError;
use tandem_solver::{Method, SolverError};

/// Errors raised while building, solving or tearing down a model.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Boolean variable index out of range
    InvalidBoolVar(BoolVar),
    /// Integer variable index out of range
    InvalidIntVar(IntVar),
    /// Negation requested for a variable that is itself a negation
    NegationOfNegation(BoolVar),
    /// Lower bound above upper bound
    InvalidBounds { lb: i64, ub: i64 },
    /// Integer variable has no MIP counterpart
    UnboundIntVar(IntVar),
    /// Constraint kind not available under the configured method
    UnsupportedConstraint {
        method: Method,
        constraint: &'static str,
    },
    /// Sentinel variables have not been created
    MissingSentinels,
    /// Model was already closed
    Closed,
    Expr(ExprError),
    Solver(SolverError),
    Mip(MipError),
    Cp(CpError),
}

impl ModelError {
    /// Returns a semantic error code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            ModelError::InvalidBoolVar(_) => "MODEL_INVALID_BOOL_VAR",
            ModelError::InvalidIntVar(_) => "MODEL_INVALID_INT_VAR",
            ModelError::NegationOfNegation(_) => "MODEL_NEGATION_OF_NEGATION",
            ModelError::InvalidBounds { .. } => "MODEL_INVALID_BOUNDS",
            ModelError::UnboundIntVar(_) => "MODEL_UNBOUND_INT_VAR",
            ModelError::UnsupportedConstraint { .. } => "MODEL_UNSUPPORTED_CONSTRAINT",
            ModelError::MissingSentinels => "MODEL_MISSING_SENTINELS",
            ModelError::Closed => "MODEL_CLOSED",
            ModelError::Expr(err) => err.code(),
            ModelError::Solver(err) => err.code(),
            ModelError::Mip(err) => err.code(),
            ModelError::Cp(err) => err.code(),
        }
    }
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelError::InvalidBoolVar(var) => {
                write!(f, "[{}] Boolean variable {} does not exist", self.code(), var)
            }
            ModelError::InvalidIntVar(var) => {
                write!(f, "[{}] Integer variable {} does not exist", self.code(), var)
            }
            ModelError::NegationOfNegation(var) => write!(
                f,
                "[{}] Variable {} is already a negation and cannot be negated",
                self.code(),
                var
            ),
            ModelError::InvalidBounds { lb, ub } => write!(
                f,
                "[{}] Bounds invalid: lower ({}) > upper ({})",
                self.code(),
                lb,
                ub
            ),
            ModelError::UnboundIntVar(var) => write!(
                f,
                "[{}] Integer variable {} exists only in the CP engine",
                self.code(),
                var
            ),
            ModelError::UnsupportedConstraint { method, constraint } => write!(
                f,
                "[{}] {} constraints are not available with method '{}'",
                self.code(),
                constraint,
                method
            ),
            ModelError::MissingSentinels => write!(
                f,
                "[{}] Constant variables must be created before any other",
                self.code()
            ),
            ModelError::Closed => write!(f, "[{}] Model has been closed", self.code()),
            // wrapped errors already carry their own code
            ModelError::Expr(err) => write!(f, "{err}"),
            ModelError::Solver(err) => write!(f, "{err}"),
            ModelError::Mip(err) => write!(f, "{err}"),
            ModelError::Cp(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ModelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ModelError::Expr(err) => Some(err),
            ModelError::Solver(err) => Some(err),
            ModelError::Mip(err) => Some(err),
            ModelError::Cp(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ExprError> for ModelError {
    fn from(err: ExprError) -> Self {
        ModelError::Expr(err)
    }
}

impl From<SolverError> for ModelError {
    fn from(err: SolverError) -> Self {
        ModelError::Solver(err)
    }
}

impl From<MipError> for ModelError {
    fn from(err: MipError) -> Self {
        ModelError::Mip(err)
    }
}

impl From<CpError> for ModelError {
    fn from(err: CpError) -> Self {
        ModelError::Cp(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_own_codes() {
        let err = ModelError::NegationOfNegation(BoolVar::new(3));
        assert_eq!(err.code(), "MODEL_NEGATION_OF_NEGATION");
        assert!(err.to_string().contains("BoolVar(3)"));
    }

    #[test]
    fn test_wrapped_errors_keep_their_code() {
        let err = ModelError::from(SolverError::InvalidTimeLimit(0.0));
        assert_eq!(err.code(), "SOLVER_INVALID_TIME_LIMIT");
        assert!(err.to_string().starts_with("[SOLVER_INVALID_TIME_LIMIT]"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_unsupported_constraint_names_method() {
        let err = ModelError::UnsupportedConstraint {
            method: Method::Mip,
            constraint: "all-different",
        };
        assert!(err.to_string().contains("'mip'"));
    }
}
