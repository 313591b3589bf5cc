//! Engine parameters.

use crate::error::MipError;

/// Engine-level settings applied with [`crate::MipEngine::set_params`].
///
/// The search itself is sequential; `max_threads` and `lp_threads` are
/// recorded and validated so that callers can ask for deterministic
/// single-threaded behaviour explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct MipParams {
    /// Worker threads for tree search. 0 lets the engine choose.
    pub max_threads: u32,
    /// Threads for relaxation solves. 0 lets the engine choose.
    pub lp_threads: u32,
    /// Whether presolve may replace a variable by an affine combination of others.
    pub allow_multi_aggregation: bool,
    /// Upper limit on presolve restarts. `None` is unlimited.
    pub max_restarts: Option<u32>,
    /// Upper limit on processed branch-and-bound nodes.
    pub node_limit: Option<u64>,
}

impl Default for MipParams {
    fn default() -> Self {
        Self {
            max_threads: 0,
            lp_threads: 0,
            allow_multi_aggregation: true,
            max_restarts: None,
            node_limit: None,
        }
    }
}

impl MipParams {
    /// Single thread, no multi-aggregation, no restarts.
    pub fn deterministic() -> Self {
        Self {
            max_threads: 1,
            lp_threads: 1,
            allow_multi_aggregation: false,
            max_restarts: Some(0),
            node_limit: None,
        }
    }

    pub fn with_node_limit(mut self, limit: Option<u64>) -> Self {
        self.node_limit = limit;
        self
    }

    /// True when the variable set is guaranteed stable across the solve.
    pub fn keeps_variables_stable(&self) -> bool {
        !self.allow_multi_aggregation && self.max_restarts == Some(0)
    }

    pub(crate) fn validate(&self) -> Result<(), MipError> {
        if self.node_limit == Some(0) {
            return Err(MipError::InvalidParam {
                name: "node_limit",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.max_threads > 0 && self.lp_threads > self.max_threads {
            return Err(MipError::InvalidParam {
                name: "lp_threads",
                reason: format!(
                    "{} exceeds max_threads {}",
                    self.lp_threads, self.max_threads
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_settings() {
        let params = MipParams::deterministic();
        assert_eq!(params.max_threads, 1);
        assert!(params.keeps_variables_stable());
        assert!(!MipParams::default().keeps_variables_stable());
    }

    #[test]
    fn validate_rejects_zero_node_limit() {
        let params = MipParams::default().with_node_limit(Some(0));
        assert!(matches!(
            params.validate(),
            Err(MipError::InvalidParam {
                name: "node_limit",
                ..
            })
        ));
    }

    #[test]
    fn validate_rejects_more_lp_threads_than_workers() {
        let params = MipParams {
            max_threads: 1,
            lp_threads: 4,
            ..MipParams::default()
        };
        assert!(params.validate().is_err());
        assert!(MipParams::deterministic().validate().is_ok());
    }
}
