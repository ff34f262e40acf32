pub mod batch;
pub mod builders;
pub mod pool_cache;
pub mod router;
pub mod storage;
pub mod worker;
pub mod writers;
