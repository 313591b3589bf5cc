//! MIP engine error types.

use crate::handle::{ConsHandle, ConshdlrId, HandleCensus, VarHandle};
use crate::transform::ProblemStage;

#[derive(Debug, Clone, PartialEq)]
pub enum MipError {
    /// No problem has been created yet.
    NoProblem,
    /// `create_problem` was called twice.
    ProblemExists,
    InvalidVar(VarHandle),
    InvalidCons(ConsHandle),
    InvalidConshdlr(ConshdlrId),
    InvalidBounds { lb: i64, ub: i64 },
    InvalidObjective(f64),
    /// Complement requested for a non-binary variable.
    NotBinary(VarHandle),
    /// Operation requires a column but got a negation view.
    NegationView(VarHandle),
    /// Operation is not allowed in the current problem stage.
    WrongStage {
        operation: &'static str,
        stage: ProblemStage,
    },
    /// Handle belongs to the other side of the original/transformed split.
    WrongSide(VarHandle),
    VarAlreadyAdded(VarHandle),
    ConsAlreadyAdded(ConsHandle),
    ConsNotAdded(ConsHandle),
    DuplicateConshdlr(String),
    /// A custom constraint is present but no matching handler was supplied.
    MissingConshdlr(String),
    /// Only one of the two payload hooks was installed.
    MissingPayloadHook,
    InvalidParam { name: &'static str, reason: String },
    /// Handles still alive when they should all have been released.
    LeakedHandles(HandleCensus),
    /// Failure reported by a payload hook or constraint handler.
    Payload(String),
    Io(String),
}

impl MipError {
    /// Returns a semantic error code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            MipError::NoProblem => "MIP_NO_PROBLEM",
            MipError::ProblemExists => "MIP_PROBLEM_EXISTS",
            MipError::InvalidVar(_) => "MIP_INVALID_VAR",
            MipError::InvalidCons(_) => "MIP_INVALID_CONS",
            MipError::InvalidConshdlr(_) => "MIP_INVALID_CONSHDLR",
            MipError::InvalidBounds { .. } => "MIP_INVALID_BOUNDS",
            MipError::InvalidObjective(_) => "MIP_INVALID_OBJECTIVE",
            MipError::NotBinary(_) => "MIP_NOT_BINARY",
            MipError::NegationView(_) => "MIP_NEGATION_VIEW",
            MipError::WrongStage { .. } => "MIP_WRONG_STAGE",
            MipError::WrongSide(_) => "MIP_WRONG_SIDE",
            MipError::VarAlreadyAdded(_) => "MIP_VAR_ALREADY_ADDED",
            MipError::ConsAlreadyAdded(_) => "MIP_CONS_ALREADY_ADDED",
            MipError::ConsNotAdded(_) => "MIP_CONS_NOT_ADDED",
            MipError::DuplicateConshdlr(_) => "MIP_DUPLICATE_CONSHDLR",
            MipError::MissingConshdlr(_) => "MIP_MISSING_CONSHDLR",
            MipError::MissingPayloadHook => "MIP_MISSING_PAYLOAD_HOOK",
            MipError::InvalidParam { .. } => "MIP_INVALID_PARAM",
            MipError::LeakedHandles(_) => "MIP_LEAKED_HANDLES",
            MipError::Payload(_) => "MIP_PAYLOAD",
            MipError::Io(_) => "MIP_IO",
        }
    }
}

impl std::fmt::Display for MipError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code = self.code();
        match self {
            MipError::NoProblem => write!(f, "[{code}] No problem has been created"),
            MipError::ProblemExists => write!(f, "[{code}] A problem already exists"),
            MipError::InvalidVar(var) => write!(f, "[{code}] Unknown or freed variable {var}"),
            MipError::InvalidCons(cons) => {
                write!(f, "[{code}] Unknown or freed constraint {cons}")
            }
            MipError::InvalidConshdlr(id) => {
                write!(f, "[{code}] Unknown constraint handler {id}")
            }
            MipError::InvalidBounds { lb, ub } => {
                write!(f, "[{code}] Invalid bounds [{lb}, {ub}]")
            }
            MipError::InvalidObjective(value) => {
                write!(f, "[{code}] Objective coefficient {value} is not finite")
            }
            MipError::NotBinary(var) => {
                write!(f, "[{code}] Variable {var} is not binary and has no complement")
            }
            MipError::NegationView(var) => {
                write!(f, "[{code}] Variable {var} is a negation view, not a column")
            }
            MipError::WrongStage { operation, stage } => write!(
                f,
                "[{code}] Operation '{operation}' is not allowed in stage {}",
                stage.as_str()
            ),
            MipError::WrongSide(var) => write!(
                f,
                "[{code}] Variable {var} belongs to the other side of the transform"
            ),
            MipError::VarAlreadyAdded(var) => {
                write!(f, "[{code}] Variable {var} is already in the problem")
            }
            MipError::ConsAlreadyAdded(cons) => {
                write!(f, "[{code}] Constraint {cons} is already in the problem")
            }
            MipError::ConsNotAdded(cons) => {
                write!(f, "[{code}] Constraint {cons} is not in the problem")
            }
            MipError::DuplicateConshdlr(name) => {
                write!(f, "[{code}] Constraint handler '{name}' is already registered")
            }
            MipError::MissingConshdlr(name) => {
                write!(f, "[{code}] No handler supplied for constraint type '{name}'")
            }
            MipError::MissingPayloadHook => write!(
                f,
                "[{code}] Payload hooks must be installed together (trans and deltrans)"
            ),
            MipError::InvalidParam { name, reason } => {
                write!(f, "[{code}] Invalid parameter '{name}': {reason}")
            }
            MipError::LeakedHandles(census) => {
                write!(f, "[{code}] Handles still alive: {census}")
            }
            MipError::Payload(msg) => write!(f, "[{code}] Payload hook failed: {msg}"),
            MipError::Io(msg) => write!(f, "[{code}] I/O error: {msg}"),
        }
    }
}

impl std::error::Error for MipError {}

impl From<std::io::Error> for MipError {
    fn from(err: std::io::Error) -> Self {
        MipError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_code() {
        let msg = MipError::InvalidBounds { lb: 3, ub: 1 }.to_string();
        assert!(msg.starts_with("[MIP_INVALID_BOUNDS]"));
        assert!(msg.contains("[3, 1]"));
    }

    #[test]
    fn test_wrong_stage_names_stage() {
        let msg = MipError::WrongStage {
            operation: "add_var",
            stage: ProblemStage::Transformed,
        }
        .to_string();
        assert!(msg.contains("add_var"));
        assert!(msg.contains("transformed"));
    }

    #[test]
    fn test_leak_message_lists_counts() {
        let census = HandleCensus {
            transformed_vars: 2,
            ..HandleCensus::default()
        };
        let err = MipError::LeakedHandles(census);
        assert_eq!(err.code(), "MIP_LEAKED_HANDLES");
        assert!(err.to_string().contains("2 transformed vars"));
    }
}
