//! Tool-invocation bridge for AWX, AAP and Tower automation
//! controllers.
//!
//! The crate resolves credentials per session, speaks the controller
//! REST API through a normalized client, and drives job lifecycles to
//! a terminal state. Two topologies share the same core: an embedded
//! stdin/stdout loop and an HTTP server exposing a JSON-RPC surface.

pub mod app;
pub mod client;
pub mod config;
pub mod credentials;
pub mod domain;
pub mod jobs;
pub mod server;
pub mod session;
pub mod stdio;
pub mod tools;

pub use app::AppContext;
pub use domain::AwxError;
