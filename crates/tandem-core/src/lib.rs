//! Optimization model shared by a MIP engine and a CP engine.
//!
//! Every boolean and integer variable of a [`Model`] exists once in each
//! backend; [`ProblemData`] holds the mapping. A model is solved by one of
//! four strategies selected through [`tandem_solver::Method`].
//!
//! # Module Organization
//!
//! - [`problem_data`]: the variable tables and negation aliasing
//! - [`model`]: construction, constraints, solve dispatch and teardown
//! - [`solution`]: values of the best known assignment
//! - `transform`: hooks duplicating the tables for the MIP working copy
//! - `bridge`: the CP propagation constraint used by branch-and-cut
//! - `strategies`: the four solving strategies

mod bridge;
pub mod model;
pub mod problem_data;
pub mod solution;
mod strategies;
mod transform;

pub use model::{Model, ModelError};
pub use problem_data::ProblemData;
pub use solution::Solution;

pub use tandem_expr::{BoolVar, ComparisonSense, IntVar, LinearConstraint, LinearExpr};
pub use tandem_solver::{Method, SolveStatus, SolverConfig};
