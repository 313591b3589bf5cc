//! Typed variable ids and integer linear expressions shared by the tandem crates.

pub mod constraint;
pub mod error;
pub mod ids;
pub mod linear;

pub use constraint::{ComparisonSense, LinearConstraint};
pub use error::ExprError;
pub use ids::{BoolVar, IntVar};
pub use linear::LinearExpr;
