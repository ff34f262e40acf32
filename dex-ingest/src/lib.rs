//! Partitioned ingestion: routes decoded block event bundles to per-partition workers,
//! which batch, flush and write the five record families to the store.

pub mod application;
pub mod domain;
pub mod infra;
