//! Supervisor: the agent slot specialized for routing between specialists
//! (spec §4.7).

pub mod supervisor;

pub use supervisor::{Supervisor, SupervisorDecision};
