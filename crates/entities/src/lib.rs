//! Core entity definitions for Miniban.
//!
//! This crate defines the task entity shown on the Kanban board, its
//! enumerated fields, and the typed create/update requests that the storage
//! layer accepts. Conversions from loose field mappings live here so that
//! every backend validates input the same way.

mod board;
mod error;
mod task;
mod update;

pub use board::*;
pub use error::*;
pub use task::*;
pub use update::*;
