//! Variable creation and lookup.

use super::{Model, ModelError};
use tandem_expr::{BoolVar, IntVar};

impl Model {
    /// Add a boolean variable to both backends.
    pub fn create_boolean_variable(&mut self, name: &str) -> Result<BoolVar, ModelError> {
        self.ensure_open()?;
        self.data
            .create_boolean_variable(&mut self.mip, &mut self.cp, name)
    }

    /// The negation of a positive boolean, created on first request.
    pub fn negate(&mut self, var: BoolVar) -> Result<BoolVar, ModelError> {
        self.ensure_open()?;
        self.data.negate(&mut self.mip, var)
    }

    /// Add an integer variable with bounds `[lb, ub]` to both backends.
    pub fn create_integer_variable(
        &mut self,
        name: &str,
        lb: i64,
        ub: i64,
    ) -> Result<IntVar, ModelError> {
        self.ensure_open()?;
        self.data
            .create_integer_variable(&mut self.mip, &mut self.cp, name, lb, ub)
    }

    /// Add an integer variable to the CP engine only.
    ///
    /// It may appear in CP-only constraints but not in linear constraints,
    /// and it cannot be the objective of a MIP-based method.
    pub fn create_cp_integer_variable(
        &mut self,
        name: &str,
        lb: i64,
        ub: i64,
    ) -> Result<IntVar, ModelError> {
        self.ensure_open()?;
        self.data
            .create_cp_integer_variable(&mut self.cp, name, lb, ub)
    }

    pub fn num_bools(&self) -> usize {
        self.data.num_bools()
    }

    pub fn num_ints(&self) -> usize {
        self.data.num_ints()
    }

    pub fn bool_name(&self, var: BoolVar) -> Result<&str, ModelError> {
        self.data.bool_name(var)
    }

    pub fn int_name(&self, var: IntVar) -> Result<&str, ModelError> {
        self.data.int_name(var)
    }

    pub fn int_bounds(&self, var: IntVar) -> Result<(i64, i64), ModelError> {
        self.data.int_bounds(var)
    }

    /// Look up a boolean by display name. Linear in the number of booleans.
    pub fn find_bool(&self, name: &str) -> Option<BoolVar> {
        self.data
            .bool_names
            .iter()
            .position(|candidate| candidate == name)
            .map(|index| BoolVar::new(index as u32))
    }

    /// Look up an integer by display name. Linear in the number of integers.
    pub fn find_int(&self, name: &str) -> Option<IntVar> {
        self.data
            .int_names
            .iter()
            .position(|candidate| candidate == name)
            .map(|index| IntVar::new(index as u32))
    }
}
