//! docconv - document conversion service
//!
//! This library crate exposes the service, configuration, and HTTP router
//! for the binary and for integration testing.

pub mod config;
pub mod server;
pub mod service;
