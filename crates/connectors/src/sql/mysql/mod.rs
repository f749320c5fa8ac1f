pub mod adapter;
pub mod fetcher;
pub mod query;
pub mod row;
pub mod seed;
pub mod session;
pub mod transaction;
