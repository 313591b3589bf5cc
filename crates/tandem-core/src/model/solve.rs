//! Objective selection and strategy dispatch.

use super::{Model, ModelError};
use crate::strategies::{self, Workspace};
use tandem_expr::IntVar;
use tandem_solver::{CpuBudget, Method, SolveStatus};
use tracing::{debug, info};

impl Model {
    /// Minimize the integer `objective` within `time_limit` CPU seconds.
    ///
    /// Each call solves again from the original problem. Infeasibility and
    /// limits are reported through the returned status, not as errors.
    ///
    /// # Errors
    ///
    /// [`ModelError::Solver`] for a time limit that is not positive,
    /// [`ModelError::InvalidIntVar`] for an unknown objective,
    /// [`ModelError::UnboundIntVar`] when a MIP-based method is asked to
    /// minimize a CP-only integer, and backend errors.
    pub fn minimize(&mut self, objective: IntVar, time_limit: f64) -> Result<SolveStatus, ModelError> {
        self.ensure_open()?;
        let budget = CpuBudget::start(time_limit)?;
        self.data.check_int(objective)?;
        self.set_objective(objective)?;

        self.status = SolveStatus::Unknown;
        self.objective_value = f64::INFINITY;
        self.objective_bound = f64::NEG_INFINITY;
        self.data.solution = Default::default();

        let method = self.config.method;
        info!(
            component = "model",
            operation = "minimize",
            status = "start",
            method = method.as_str(),
            objective = %objective,
            time_limit,
            bools = self.data.num_bools(),
            ints = self.data.num_ints(),
            "Starting solve"
        );

        // timing queries read this clock from here on
        let budget = &*self.budget.insert(budget);
        let workspace = Workspace {
            mip: &mut self.mip,
            cp: &mut self.cp,
            data: &self.data,
            config: &self.config,
            budget,
        };
        let result = strategies::run(method, workspace);
        self.run_time = budget.elapsed();
        let outcome = result?;

        self.status = outcome.status;
        self.objective_value = outcome.objective;
        self.objective_bound = outcome.bound;
        self.data.solution = outcome.solution;
        info!(
            component = "model",
            operation = "minimize",
            status = self.status.as_str(),
            method = method.as_str(),
            objective = self.objective_value,
            bound = self.objective_bound,
            run_time = self.run_time,
            "Solve finished"
        );
        Ok(self.status)
    }

    /// Move the unit objective coefficient to `objective`.
    fn set_objective(&mut self, objective: IntVar) -> Result<(), ModelError> {
        let previous = self.data.objective_var();
        let column = self.data.mip_int_var(objective)?;
        if column.is_none() && self.method() != Method::Cp {
            return Err(ModelError::UnboundIntVar(objective));
        }
        if previous != objective {
            if let Some(old) = self.data.mip_int_var(previous)? {
                self.mip.set_var_obj(old, 0.0)?;
            }
            if let Some(new) = column {
                self.mip.set_var_obj(new, 1.0)?;
            }
            self.data.set_objective_var(objective)?;
        }
        debug!(
            component = "model",
            operation = "set_objective",
            status = "success",
            objective = %objective,
            previous = %previous,
            "Set objective variable"
        );
        Ok(())
    }
}
