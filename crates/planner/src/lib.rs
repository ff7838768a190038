//! Route planner context: tile selection, endpoints, route computation and
//! saved traces, all backed by one key/value store.

pub mod config;
pub mod inputs;
pub mod planner;

pub use config::*;
pub use inputs::*;
pub use planner::*;
