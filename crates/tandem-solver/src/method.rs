//! Solving strategy selector.

use crate::SolverError;
use std::str::FromStr;

/// The strategy a model uses to minimize its objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Method {
    /// MIP branch-and-bound with a CP propagation constraint attached.
    #[default]
    BranchAndCut,
    /// Logic-based Benders decomposition: MIP master, CP subproblem.
    Decomposition,
    /// MIP branch-and-bound alone.
    Mip,
    /// CP search alone.
    Cp,
}

impl Method {
    pub const ALL: [Method; 4] = [
        Method::BranchAndCut,
        Method::Decomposition,
        Method::Mip,
        Method::Cp,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Method::BranchAndCut => "bc",
            Method::Decomposition => "lbbd",
            Method::Mip => "mip",
            Method::Cp => "cp",
        }
    }

    /// Whether the MIP engine carries the CP propagation constraint.
    pub fn uses_propagation_constraint(self) -> bool {
        matches!(self, Method::BranchAndCut)
    }

    /// Whether constraints that only the CP engine understands are enforced.
    pub fn supports_cp_only_constraints(self) -> bool {
        !matches!(self, Method::Mip)
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .into_iter()
            .find(|method| method.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| SolverError::InvalidMethod(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_roundtrip() {
        for method in Method::ALL {
            assert_eq!(method.as_str().parse::<Method>().unwrap(), method);
        }
        assert_eq!("BC".parse::<Method>().unwrap(), Method::BranchAndCut);
    }

    #[test]
    fn parse_rejects_unknown() {
        let err = "simplex".parse::<Method>().unwrap_err();
        assert_eq!(err, SolverError::InvalidMethod("simplex".to_string()));
    }

    #[test]
    fn capability_flags() {
        assert!(Method::BranchAndCut.uses_propagation_constraint());
        assert!(!Method::Decomposition.uses_propagation_constraint());
        assert!(!Method::Mip.supports_cp_only_constraints());
        assert!(Method::Cp.supports_cp_only_constraints());
    }
}
