pub mod adapter;
pub mod error;
pub mod file;
pub mod memory;
pub mod source;
pub mod sql;
