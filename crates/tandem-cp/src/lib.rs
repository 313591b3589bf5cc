//! Finite-domain constraint propagation engine.
//!
//! Integer variables carry interval domains. Booleans are 0/1 integers seen
//! through [`Literal`] views, so a variable and its negation share one
//! domain. Propagators run to a fixpoint over a work queue; every domain
//! change below the root is trailed and undone by [`CpEngine::pop_level`].

mod engine;
mod error;
mod propagator;
mod search;
mod var;

pub use engine::CpEngine;
pub use error::CpError;
pub use search::{CpAssignment, CpOutcome, CpStatus, SearchRequest};
pub use var::{CpIntVar, Literal};
