//! Channel implementations for Pregel execution.
//!
//! Channels are typed state containers with versioning that control
//! how state updates are applied and when nodes are triggered.

// Re-export all channel types from agentflow-checkpoint
pub use agentflow_checkpoint::{
    AnyValueChannel, BinaryOperatorChannel, Channel, EphemeralValueChannel, LastValueChannel,
    NamedBarrierValueChannel, TopicChannel, UntrackedValueChannel,
};
