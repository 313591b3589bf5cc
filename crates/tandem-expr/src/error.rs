//! Expression construction errors.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprError {
    /// Integer arithmetic on coefficients or constants overflowed.
    Overflow { operation: &'static str },
}

impl ExprError {
    /// Returns a semantic error code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            ExprError::Overflow { .. } => "EXPR_OVERFLOW",
        }
    }
}

impl std::fmt::Display for ExprError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExprError::Overflow { operation } => {
                write!(f, "[{}] Integer overflow while {}", self.code(), operation)
            }
        }
    }
}

impl std::error::Error for ExprError {}
