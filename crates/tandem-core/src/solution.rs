//! Best known assignment of the model variables.

use crate::problem_data::ProblemData;
use tandem_cp::CpAssignment;
use tandem_expr::{BoolVar, IntVar};
use tandem_mip::MipSolution;

/// Values indexed like the model's variable tables.
///
/// An entry is `None` when the backend that produced the solution does not
/// carry that variable (an integer that exists only in the CP engine, solved
/// by the MIP strategy).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Solution {
    bools: Vec<Option<bool>>,
    ints: Vec<Option<i64>>,
}

impl Solution {
    /// Read a MIP solution through the handles of the transformed tables.
    pub(crate) fn from_mip(data: &ProblemData, mip: &MipSolution) -> Self {
        let bools = data
            .mip_bool_vars
            .iter()
            .map(|&var| mip.value(var).map(|value| value == 1))
            .collect();
        let ints = data
            .mip_int_vars
            .iter()
            .map(|var| var.and_then(|var| mip.value(var)))
            .collect();
        Self { bools, ints }
    }

    pub(crate) fn from_cp(data: &ProblemData, assignment: &CpAssignment) -> Self {
        let bools = data
            .cp_bool_vars
            .iter()
            .map(|&lit| assignment.literal(lit))
            .collect();
        let ints = data
            .cp_int_vars
            .iter()
            .map(|&var| assignment.value(var))
            .collect();
        Self { bools, ints }
    }

    /// Fill integers missing from this solution with values from `other`.
    pub(crate) fn complete_from(&mut self, other: &Solution) {
        for (slot, value) in self.ints.iter_mut().zip(&other.ints) {
            if slot.is_none() {
                *slot = *value;
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bools.is_empty() && self.ints.is_empty()
    }

    pub fn bool_value(&self, var: BoolVar) -> Option<bool> {
        self.bools.get(var.index()).copied().flatten()
    }

    pub fn int_value(&self, var: IntVar) -> Option<i64> {
        self.ints.get(var.index()).copied().flatten()
    }

    pub fn bools(&self) -> &[Option<bool>] {
        &self.bools
    }

    pub fn ints(&self) -> &[Option<i64>] {
        &self.ints
    }
}
