//! The `utils` module provides shared definitions used across the `echochat` application:
//! the error types and the logging setup.

pub mod error;
pub mod logging;
