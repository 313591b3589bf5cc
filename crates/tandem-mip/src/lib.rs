//! In-process mixed-integer programming engine.
//!
//! The engine distinguishes the *original* problem built by the caller from a
//! *transformed* working copy that exists only while solving. Variables and
//! constraints are reference-counted handles; every capture must be paired with
//! a release. A problem payload of type `P` can be attached through a pair of
//! lifecycle hooks that duplicate it when the working copy is built and tear
//! the copy down when the working copy is freed.
//!
//! - [`engine`]: engine construction, problem setup, census and teardown
//! - [`var`] / [`cons`]: handle operations
//! - [`transform`]: original/transformed lifecycle and payload hooks
//! - [`handler`]: custom constraint handlers consulted during search
//! - [`search`]: branch-and-bound
//! - [`lp`]: LP file export of the original problem

mod arena;
pub mod cons;
pub mod engine;
pub mod error;
pub mod handle;
pub mod handler;
pub mod lp;
pub mod params;
pub mod search;
mod status;
pub mod transform;
pub mod var;

pub use engine::MipEngine;
pub use error::MipError;
pub use handle::{ConsHandle, ConshdlrId, HandleCensus, VarHandle};
pub use handler::{ConstraintHandler, NodeDomains, Propagation};
pub use params::MipParams;
pub use search::{MipOutcome, MipSolution, MipStatus};
pub use status::mip_to_solve_status;
pub use transform::{ProbDelTransFn, ProbTransFn, ProblemStage, TransformScope};
pub use var::VarType;
