pub mod error;
pub mod mysql;
