pub mod aggregate;
pub mod batch;
pub mod cache;
pub mod error;
pub mod filter;
pub mod retry;
