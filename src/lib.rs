//! Symbolic execution for Datalog programs.
//!
//! Input facts may hold symbolic constants (unknown values) or be marked
//! symbolic-sign (unknown presence). [`executor::SymbolicExecutor`] computes,
//! for each interesting output tuple, a boolean condition over symbol
//! values and fact presence that holds exactly when the tuple is derived.

pub mod analysis;
pub mod builder;
pub mod condition;
pub mod config;
pub mod ddmin;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod pool;
pub mod program;
pub mod provenance;
pub mod repair;
pub mod symbol;
pub mod term;
pub mod trace;
pub mod transform;

pub use builder::{build_program, ProgramBuilder};
pub use condition::{AtomicCondition, Formula, OutputCondition};
pub use config::SymexConfig;
pub use error::{SymlogError, SymlogResult};
pub use evaluator::{Evaluator, SouffleConfig, SouffleEvaluator};
pub use executor::{Conditions, SymbolicExecutor};
pub use program::{Fact, Literal, Program, Rule};
pub use provenance::ProvenanceMode;
pub use symbol::{BaseType, SymbolAllocator, SymbolicConstant};
pub use term::{Assignment, Constant, Term, Value};

#[cfg(test)]
pub(crate) mod test_utils;
