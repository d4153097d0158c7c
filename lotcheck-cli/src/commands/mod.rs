//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`config`] - Configuration management (path, show, init)
//! - [`recover`] - Offline report from a lot snapshot
//! - [`run`] - Check a subject file and write a report
//! - [`serve`] - HTTP API for submitting and tracking lots

pub mod config;
pub mod recover;
pub mod run;
pub mod serve;
