// ABOUTME: Library root for cutover - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod cancel;
pub mod command;
pub mod config;
pub mod deploy;
pub mod diagnostics;
pub mod error;
pub mod health;
pub mod http;
pub mod notify;
pub mod output;
pub mod proxy;
pub mod runtime;
pub mod services;
pub mod smoke;
pub mod types;
