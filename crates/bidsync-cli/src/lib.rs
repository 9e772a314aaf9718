//! Bidsync CLI - Scheduled host for the bidsync reconciliation engine
//!
//! This crate provides the `bidsync` binary that wires the database pools,
//! the identity client and the upload folders into a batch runner.

pub mod config;

pub use config::{Command, Config};
