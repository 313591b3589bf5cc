//! CP engine error types.

use crate::var::CpIntVar;

#[derive(Debug, Clone, PartialEq)]
pub enum CpError {
    InvalidVar(CpIntVar),
    InvalidBounds { lb: i64, ub: i64 },
    /// A domain was wiped out.
    Conflict,
    /// `pop_level` without a matching `push_level`.
    NoLevel,
    /// Only 0/1 variables can be read as literals.
    NotBoolean(CpIntVar),
}

impl CpError {
    /// Returns a semantic error code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            CpError::InvalidVar(_) => "CP_INVALID_VAR",
            CpError::InvalidBounds { .. } => "CP_INVALID_BOUNDS",
            CpError::Conflict => "CP_CONFLICT",
            CpError::NoLevel => "CP_NO_LEVEL",
            CpError::NotBoolean(_) => "CP_NOT_BOOLEAN",
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, CpError::Conflict)
    }
}

impl std::fmt::Display for CpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code = self.code();
        match self {
            CpError::InvalidVar(var) => write!(f, "[{code}] Unknown variable {var}"),
            CpError::InvalidBounds { lb, ub } => {
                write!(f, "[{code}] Invalid domain [{lb}, {ub}]")
            }
            CpError::Conflict => write!(f, "[{code}] Domain wipe-out"),
            CpError::NoLevel => write!(f, "[{code}] No decision level to pop"),
            CpError::NotBoolean(var) => write!(f, "[{code}] Variable {var} is not 0/1"),
        }
    }
}

impl std::error::Error for CpError {}
