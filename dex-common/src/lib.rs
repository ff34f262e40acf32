//! Shared types and infrastructure for the DEX activity ingestion and query pipeline.

pub mod codec;
pub mod config;
pub mod domain;
pub mod infra;
pub mod retry;
pub mod telemetry;

pub use domain::*;
