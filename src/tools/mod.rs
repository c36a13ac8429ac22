//! Named tool surface exposed to invoking clients.

pub mod catalog;
pub mod dispatch;

pub use catalog::{find, ToolSpec, CATALOG};
pub use dispatch::{dispatch, ToolFailure, ToolRequest, ToolResponse};
