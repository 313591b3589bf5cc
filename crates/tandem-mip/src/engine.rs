//! Engine construction, problem setup and teardown.

use crate::arena::Arena;
use crate::cons::ConsRecord;
use crate::error::MipError;
use crate::handle::{ConsHandle, HandleCensus, VarHandle};
use crate::params::MipParams;
use crate::transform::{ProbDelTransFn, ProbTransFn, ProblemStage};
use crate::var::{Side, VarKind, VarRecord};
use tracing::{debug, error};

pub(crate) struct ProblemHeader {
    pub(crate) name: String,
    pub(crate) objective_integral: bool,
    /// Variables captured by the problem, in insertion order.
    pub(crate) vars: Vec<VarHandle>,
    /// Constraints captured by the problem, in insertion order.
    pub(crate) conss: Vec<ConsHandle>,
}

pub(crate) struct WorkingProblem<P> {
    pub(crate) vars: Vec<VarHandle>,
    pub(crate) conss: Vec<ConsHandle>,
    pub(crate) payload: Option<P>,
}

/// MIP engine holding one problem and, while solving, its transformed copy.
///
/// `P` is the payload type attached through [`MipEngine::set_prob_trans`] and
/// [`MipEngine::set_prob_deltrans`].
pub struct MipEngine<P> {
    pub(crate) params: MipParams,
    pub(crate) problem: Option<ProblemHeader>,
    pub(crate) vars: Arena<VarRecord>,
    pub(crate) conss: Arena<ConsRecord>,
    pub(crate) conshdlrs: Vec<String>,
    pub(crate) stage: ProblemStage,
    pub(crate) working: Option<WorkingProblem<P>>,
    pub(crate) prob_trans: Option<ProbTransFn<P>>,
    pub(crate) prob_deltrans: Option<ProbDelTransFn<P>>,
}

impl<P> Default for MipEngine<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> MipEngine<P> {
    pub fn new() -> Self {
        debug!(
            component = "mip",
            operation = "create",
            status = "success",
            "Created MIP engine"
        );
        Self {
            params: MipParams::default(),
            problem: None,
            vars: Arena::default(),
            conss: Arena::default(),
            conshdlrs: Vec::new(),
            stage: ProblemStage::Original,
            working: None,
            prob_trans: None,
            prob_deltrans: None,
        }
    }

    pub fn set_params(&mut self, params: MipParams) -> Result<(), MipError> {
        params.validate()?;
        debug!(
            component = "mip",
            operation = "set_params",
            status = "success",
            max_threads = params.max_threads,
            lp_threads = params.lp_threads,
            allow_multi_aggregation = params.allow_multi_aggregation,
            max_restarts = ?params.max_restarts,
            node_limit = ?params.node_limit,
            "Applied engine parameters"
        );
        self.params = params;
        Ok(())
    }

    pub fn params(&self) -> &MipParams {
        &self.params
    }

    /// Create the (single) minimization problem.
    pub fn create_problem(&mut self, name: &str) -> Result<(), MipError> {
        if self.problem.is_some() {
            return Err(MipError::ProblemExists);
        }
        self.problem = Some(ProblemHeader {
            name: name.to_string(),
            objective_integral: false,
            vars: Vec::new(),
            conss: Vec::new(),
        });
        self.stage = ProblemStage::Original;
        debug!(
            component = "mip",
            operation = "create_problem",
            status = "success",
            name,
            "Created problem"
        );
        Ok(())
    }

    pub fn problem_name(&self) -> Option<&str> {
        self.problem.as_ref().map(|header| header.name.as_str())
    }

    /// Declare that the objective only takes integral values.
    pub fn set_objective_integral(&mut self) -> Result<(), MipError> {
        self.require_original_stage("set_objective_integral")?;
        self.header_mut()?.objective_integral = true;
        Ok(())
    }

    pub fn is_objective_integral(&self) -> bool {
        self.problem
            .as_ref()
            .is_some_and(|header| header.objective_integral)
    }

    pub fn stage(&self) -> ProblemStage {
        self.stage
    }

    /// Variables added to the original problem, in insertion order.
    pub fn problem_vars(&self) -> &[VarHandle] {
        self.problem
            .as_ref()
            .map_or(&[], |header| header.vars.as_slice())
    }

    /// Constraints added to the original problem, in insertion order.
    pub fn problem_conss(&self) -> &[ConsHandle] {
        self.problem
            .as_ref()
            .map_or(&[], |header| header.conss.as_slice())
    }

    /// Count live columns and constraints on each side of the transform.
    pub fn census(&self) -> HandleCensus {
        let mut census = HandleCensus::default();
        for record in self.vars.values() {
            if !matches!(record.kind, VarKind::Column(_)) {
                continue;
            }
            match record.side {
                Side::Original => census.original_vars += 1,
                Side::Transformed => census.transformed_vars += 1,
            }
        }
        for record in self.conss.values() {
            match record.side {
                Side::Original => census.original_conss += 1,
                Side::Transformed => census.transformed_conss += 1,
            }
        }
        census
    }

    /// Free the problem: drop the working copy if one exists, release the
    /// problem's own captures (constraints first) and check that nothing is
    /// left alive.
    ///
    /// Whatever the outcome, the engine is empty afterwards. Handles that were
    /// still alive are reported through [`MipError::LeakedHandles`].
    pub fn free(&mut self) -> Result<(), MipError> {
        let mut first_error = None;
        if self.stage == ProblemStage::Transformed {
            if let Err(err) = self.free_transform() {
                first_error.get_or_insert(err);
            }
        }
        if let Some(header) = self.problem.take() {
            for &cons in header.conss.iter().rev() {
                if let Err(err) = self.release_cons(cons) {
                    first_error.get_or_insert(err);
                }
            }
            for &var in header.vars.iter().rev() {
                if let Err(err) = self.release_var(var) {
                    first_error.get_or_insert(err);
                }
            }
        }

        let census = self.census();
        self.vars.clear();
        self.conss.clear();
        self.working = None;
        self.stage = ProblemStage::Original;
        if !census.is_empty() {
            first_error.get_or_insert(MipError::LeakedHandles(census));
        }

        match first_error {
            Some(err) => Err(err),
            None => {
                debug!(
                    component = "mip",
                    operation = "free",
                    status = "success",
                    "Freed problem with no live handles"
                );
                Ok(())
            }
        }
    }

    pub(crate) fn header_mut(&mut self) -> Result<&mut ProblemHeader, MipError> {
        self.problem.as_mut().ok_or(MipError::NoProblem)
    }

    pub(crate) fn require_original_stage(&self, operation: &'static str) -> Result<(), MipError> {
        if self.problem.is_none() {
            return Err(MipError::NoProblem);
        }
        if !self.stage.is_original_side() {
            return Err(MipError::WrongStage {
                operation,
                stage: self.stage,
            });
        }
        Ok(())
    }
}

impl<P> Drop for MipEngine<P> {
    fn drop(&mut self) {
        if self.problem.is_none() && self.census().is_empty() {
            return;
        }
        if let Err(err) = self.free() {
            error!(
                component = "mip",
                operation = "drop",
                status = "error",
                error = %err,
                "Engine dropped with unreleased handles"
            );
        }
    }
}
