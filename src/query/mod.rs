pub mod cache;
pub mod executor;
pub mod filter;
pub mod metrics;
pub mod report;
pub mod reshape;
pub mod session;
pub mod summary;
