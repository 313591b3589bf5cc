//! Model module: one optimization model held by both backends.
//!
//! # Module Organization
//!
//! - [`error`]: Model error types
//! - [`variables`]: boolean and integer variable creation
//! - [`constraints`]: linear, clause and CP-only constraints
//! - [`solve`]: `minimize` and strategy dispatch

mod constraints;
mod error;
mod solve;
mod variables;

use crate::bridge::CP_CONSHDLR_NAME;
use crate::problem_data::{MipBackend, ProblemData};
use crate::solution::Solution;
use crate::transform;
use std::path::Path;
use tandem_cp::CpEngine;
use tandem_expr::{BoolVar, IntVar};
use tandem_mip::{HandleCensus, MipParams, ProblemStage};
use tandem_solver::{CpuBudget, Method, SolveStatus, SolverConfig};
use tracing::{debug, error, warn};

pub use error::ModelError;

/// An optimization model solved through a MIP engine, a CP engine, or both.
///
/// Construction creates the constants (booleans false and true, integer
/// zero) and, in branch-and-cut mode, the propagation constraint linking the
/// two engines. Call [`Model::close`] to release backend handles and see
/// release errors; dropping an open model closes it and logs them.
pub struct Model {
    config: SolverConfig,
    pub(crate) mip: MipBackend,
    pub(crate) cp: CpEngine,
    pub(crate) data: ProblemData,
    status: SolveStatus,
    objective_value: f64,
    objective_bound: f64,
    budget: Option<CpuBudget>,
    run_time: f64,
    closed: bool,
}

impl Model {
    /// Create a model configured for `config.method`.
    pub fn new(config: SolverConfig) -> Result<Self, ModelError> {
        let mut mip = MipBackend::new();
        mip.set_params(MipParams::deterministic().with_node_limit(config.node_limit))?;
        mip.create_problem(&config.problem_name)?;
        mip.set_objective_integral()?;
        transform::install_hooks(&mut mip);

        let mut model = Self {
            config,
            mip,
            cp: CpEngine::new(),
            data: ProblemData::new(),
            status: SolveStatus::Unknown,
            objective_value: f64::INFINITY,
            objective_bound: f64::NEG_INFINITY,
            budget: None,
            run_time: 0.0,
            closed: false,
        };
        if let Err(err) = model.install_constants() {
            if let Err(close_err) = model.close() {
                warn!(
                    component = "model",
                    operation = "new",
                    status = "error",
                    error = %close_err,
                    "Teardown after failed construction reported an error"
                );
            }
            return Err(err);
        }

        debug!(
            component = "model",
            operation = "new",
            status = "success",
            method = model.config.method.as_str(),
            problem = model.config.problem_name.as_str(),
            node_limit = ?model.config.node_limit,
            "Created model"
        );
        Ok(model)
    }

    fn install_constants(&mut self) -> Result<(), ModelError> {
        self.data.install_sentinels(&mut self.mip, &mut self.cp)?;
        if let Some(zero) = self.data.mip_int_var(IntVar::ZERO)? {
            self.mip.set_var_obj(zero, 1.0)?;
        }
        if self.config.method.uses_propagation_constraint() {
            let handler = self.mip.include_conshdlr(CP_CONSHDLR_NAME)?;
            let cons = self.mip.create_cons_custom(handler, CP_CONSHDLR_NAME)?;
            self.data.cp_constraint = Some(cons);
            self.mip.add_cons(cons)?;
        }
        Ok(())
    }

    // ── Configuration ───────────────────────────────────────

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn method(&self) -> Method {
        self.config.method
    }

    /// Variable tables of the original problem.
    pub fn problem_data(&self) -> &ProblemData {
        &self.data
    }

    // ── Results ─────────────────────────────────────────────

    pub fn status(&self) -> SolveStatus {
        self.status
    }

    /// Objective of the best solution, `+inf` when none is known.
    pub fn objective_value(&self) -> f64 {
        self.objective_value
    }

    /// Proven lower bound on the optimum, `-inf` when none is known.
    pub fn objective_bound(&self) -> f64 {
        self.objective_bound
    }

    /// CPU seconds spent by the last `minimize`.
    pub fn run_time(&self) -> f64 {
        self.run_time
    }

    pub fn solution(&self) -> &Solution {
        &self.data.solution
    }

    pub fn bool_value(&self, var: BoolVar) -> Result<Option<bool>, ModelError> {
        self.data.check_bool(var)?;
        Ok(self.data.solution.bool_value(var))
    }

    pub fn int_value(&self, var: IntVar) -> Result<Option<i64>, ModelError> {
        self.data.check_int(var)?;
        Ok(self.data.solution.int_value(var))
    }

    // ── Timing ──────────────────────────────────────────────

    /// CPU seconds since the last `minimize` started. Zero before the first.
    pub fn elapsed_cpu_time(&self) -> f64 {
        self.budget.as_ref().map_or(0.0, CpuBudget::elapsed)
    }

    /// CPU seconds left in the last `minimize` budget. Zero before the first.
    pub fn remaining_time(&self) -> f64 {
        self.budget.as_ref().map_or(0.0, CpuBudget::remaining)
    }

    // ── Backend access ──────────────────────────────────────

    /// Live MIP handles, original and transformed.
    pub fn census(&self) -> HandleCensus {
        self.mip.census()
    }

    pub fn mip_stage(&self) -> ProblemStage {
        self.mip.stage()
    }

    /// Write the original MIP problem in LP format.
    pub fn write_lp(&self, path: &Path) -> Result<(), ModelError> {
        self.ensure_open()?;
        self.mip.write_lp_file(path)?;
        debug!(
            component = "model",
            operation = "write_lp",
            status = "success",
            path = %path.display(),
            "Wrote LP file"
        );
        Ok(())
    }

    // ── Teardown ────────────────────────────────────────────

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Release the propagation constraint, then the variables, then free the
    /// MIP engine and check that no handle is left alive.
    ///
    /// Closing twice is a no-op. Every other operation fails on a closed
    /// model with [`ModelError::Closed`].
    pub fn close(&mut self) -> Result<(), ModelError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let mut first_error = None;
        if self.mip.stage() == ProblemStage::Transformed {
            if let Err(err) = self.mip.free_transform() {
                first_error.get_or_insert(err);
            }
        }
        if let Err(err) = self.data.release_mip_handles(&mut self.mip) {
            first_error.get_or_insert(err);
        }
        if let Err(err) = self.mip.free() {
            first_error.get_or_insert(err);
        }
        match first_error {
            Some(err) => Err(err.into()),
            None => {
                debug!(
                    component = "model",
                    operation = "close",
                    status = "success",
                    bools = self.data.num_bools(),
                    ints = self.data.num_ints(),
                    "Closed model"
                );
                Ok(())
            }
        }
    }

    pub(crate) fn ensure_open(&self) -> Result<(), ModelError> {
        if self.closed {
            Err(ModelError::Closed)
        } else {
            Ok(())
        }
    }
}

impl Drop for Model {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            error!(
                component = "model",
                operation = "drop",
                status = "error",
                error = %err,
                "Model teardown failed"
            );
        }
    }
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("method", &self.config.method)
            .field("bools", &self.data.num_bools())
            .field("ints", &self.data.num_ints())
            .field("status", &self.status)
            .field("objective_value", &self.objective_value)
            .field("objective_bound", &self.objective_bound)
            .field("closed", &self.closed)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    mod constraints_api;
    mod lifecycle;
    mod support;
    mod variables_api;

    #[test]
    fn test_new_model_has_constants() {
        let model = Model::new(SolverConfig::for_method(Method::Mip)).unwrap();
        let data = model.problem_data();
        assert_eq!(data.num_bools(), 2);
        assert_eq!(data.num_ints(), 1);
        assert_eq!(data.objective_var(), IntVar::ZERO);
        assert_eq!(data.cp_constraint(), None);
        assert_eq!(model.status(), SolveStatus::Unknown);
        assert_eq!(model.objective_value(), f64::INFINITY);
        assert_eq!(model.objective_bound(), f64::NEG_INFINITY);
    }

    #[test]
    fn test_branch_and_cut_adds_one_propagation_constraint() {
        let model = Model::new(SolverConfig::for_method(Method::BranchAndCut)).unwrap();
        let cons = model.problem_data().cp_constraint().unwrap();
        assert_eq!(model.mip.problem_conss(), &[cons]);
        assert_eq!(model.mip.cons_name(cons).unwrap(), CP_CONSHDLR_NAME);
    }

    #[test]
    fn test_mip_params_are_deterministic() {
        let config = SolverConfig::for_method(Method::Mip).with_node_limit(50);
        let model = Model::new(config).unwrap();
        let params = model.mip.params();
        assert_eq!(params.max_threads, 1);
        assert_eq!(params.lp_threads, 1);
        assert!(!params.allow_multi_aggregation);
        assert_eq!(params.max_restarts, Some(0));
        assert_eq!(params.node_limit, Some(50));
        assert!(model.mip.is_objective_integral());
        assert_eq!(model.mip.problem_name(), Some("tandem"));
    }

    #[test]
    fn test_timing_is_zero_before_minimize() {
        let model = Model::new(SolverConfig::new()).unwrap();
        assert_eq!(model.elapsed_cpu_time(), 0.0);
        assert_eq!(model.remaining_time(), 0.0);
        assert_eq!(model.run_time(), 0.0);
    }

    #[test]
    fn test_objective_column_starts_on_zero() {
        let model = Model::new(SolverConfig::for_method(Method::Mip)).unwrap();
        let zero = model.problem_data().mip_int_var(IntVar::ZERO).unwrap().unwrap();
        assert_eq!(model.mip.var_obj(zero).unwrap(), 1.0);
    }
}
