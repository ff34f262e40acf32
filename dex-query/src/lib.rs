//! Query service: a sharded single-flight TTL cache fronting the handlers that read
//! chain event, transfer event, pool and balance records back out of the store.

pub mod application;
pub mod domain;
pub mod infra;
