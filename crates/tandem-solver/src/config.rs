//! Solver configuration types.

use crate::Method;

/// Configuration of a model: which strategy to run and the limits it obeys.
///
/// The time limit is not part of the configuration; it is passed to each
/// `minimize` call.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverConfig {
    /// Strategy used by `minimize`.
    pub method: Method,
    /// Maximum number of branch-and-bound nodes per backend search. `None`
    /// means no limit.
    pub node_limit: Option<u64>,
    /// Maximum number of master/subproblem rounds in the decomposition.
    /// `None` means no limit.
    pub max_decomposition_iterations: Option<u32>,
    /// Name given to the MIP problem.
    pub problem_name: String,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            method: Method::default(),
            node_limit: None,
            max_decomposition_iterations: None,
            problem_name: "tandem".to_string(),
        }
    }
}

impl SolverConfig {
    /// Create a new configuration with all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration for the given method, other fields default.
    pub fn for_method(method: Method) -> Self {
        Self::new().with_method(method)
    }

    /// Set the solving strategy.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Set the node limit.
    pub fn with_node_limit(mut self, nodes: u64) -> Self {
        self.node_limit = Some(nodes);
        self
    }

    /// Set the decomposition round limit.
    pub fn with_max_decomposition_iterations(mut self, rounds: u32) -> Self {
        self.max_decomposition_iterations = Some(rounds);
        self
    }

    /// Set the MIP problem name.
    pub fn with_problem_name(mut self, name: impl Into<String>) -> Self {
        self.problem_name = name.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = SolverConfig::new();
        assert_eq!(config.method, Method::BranchAndCut);
        assert_eq!(config.node_limit, None);
        assert_eq!(config.max_decomposition_iterations, None);
        assert_eq!(config.problem_name, "tandem");
    }

    #[test]
    fn test_config_builder_pattern() {
        let config = SolverConfig::for_method(Method::Decomposition)
            .with_node_limit(500)
            .with_max_decomposition_iterations(20)
            .with_problem_name("jobs");

        assert_eq!(config.method, Method::Decomposition);
        assert_eq!(config.node_limit, Some(500));
        assert_eq!(config.max_decomposition_iterations, Some(20));
        assert_eq!(config.problem_name, "jobs");
    }

    #[test]
    fn test_config_debug() {
        let config = SolverConfig::new().with_node_limit(10);
        let debug_str = format!("{:?}", config);
        assert!(debug_str.contains("node_limit"));
        assert!(debug_str.contains("10"));
    }
}
