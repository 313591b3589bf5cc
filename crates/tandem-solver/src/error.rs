//! Solver error types.

/// Contract violations in strategy selection and timing.
#[derive(Debug, Clone, PartialEq)]
pub enum SolverError {
    /// Method selector does not name a strategy.
    InvalidMethod(String),
    /// Time limit must be positive.
    InvalidTimeLimit(f64),
    /// The process CPU clock could not be read.
    CpuClockUnavailable(String),
}

impl SolverError {
    /// Returns a semantic error code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            SolverError::InvalidMethod(_) => "SOLVER_INVALID_METHOD",
            SolverError::InvalidTimeLimit(_) => "SOLVER_INVALID_TIME_LIMIT",
            SolverError::CpuClockUnavailable(_) => "SOLVER_CPU_CLOCK",
        }
    }
}

impl std::fmt::Display for SolverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolverError::InvalidMethod(name) => write!(
                f,
                "[{}] Invalid method '{}' (expected bc, lbbd, mip or cp)",
                self.code(),
                name
            ),
            SolverError::InvalidTimeLimit(limit) => {
                write!(f, "[{}] Time limit {} is invalid", self.code(), limit)
            }
            SolverError::CpuClockUnavailable(msg) => {
                write!(f, "[{}] CPU clock unavailable: {}", self.code(), msg)
            }
        }
    }
}

impl std::error::Error for SolverError {}
