pub mod config;
pub mod env;
pub mod helix;
pub mod tracing;
