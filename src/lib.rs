//! soteria-stats — Soteria network stats bridge
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod format;
pub mod sources;
pub mod chat;
pub mod engine;
