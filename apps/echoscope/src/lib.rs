//! # echoscope
//!
//! CLI and HTTP API over the `echoscope-core` engine.
//!
//! - [`cli`]: clap commands over edge-list files
//! - [`api`]: axum server owning one simulation session
//! - [`config`]: `echoscope.toml` loading

pub mod api;
pub mod cli;
pub mod config;
