//! Local tool marker types
//!
//! These are placeholder handles for tools that are actually implemented by
//! the external tool gateway (spec §6); the orchestrator never executes them
//! in-process. Kept as typed markers so callers can refer to well-known
//! filesystem tools without stringly-typed names.

pub mod filesystem;

pub use filesystem::{
    FilePatchTool, FileReadTool, FileWriteTool, FsCopyTool, FsDeleteTool, FsListTool, FsMoveTool,
    GrepTool,
};
