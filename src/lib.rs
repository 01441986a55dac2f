pub mod config;
pub mod error;
pub mod repo;
pub mod ssh;
