//! Warden daemon library - exposes modules for testing.

pub mod backend;
pub mod commands;
pub mod error;
pub mod executor;
pub mod feedback;
pub mod firewall;
pub mod fuse;
pub mod pages;
pub mod pipeline;
pub mod quota;
pub mod routes;
pub mod sampler;
pub mod server;
pub mod session;
