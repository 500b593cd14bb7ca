//! The eventgate server: configuration and wiring for the `eventgate`
//! binary.

pub mod bootstrap;
pub mod config;

pub use config::Config;
