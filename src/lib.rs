//! Core library for the `salvo` CLI.
//!
//! The crate exposes the load engine and its building blocks: CLI argument
//! types, configuration loading, request templates and transports, the
//! streaming latency histogram and report rendering. The primary
//! user-facing interface is the `salvo` command-line application; library
//! APIs may evolve as the CLI grows.
pub mod args;
pub mod config;
pub mod engine;
pub mod error;
pub mod http;
pub mod metrics;
pub mod report;
pub mod shutdown;

#[cfg(feature = "fuzzing")]
pub mod fuzzing;
