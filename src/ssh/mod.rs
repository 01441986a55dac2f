pub mod exec;
pub mod handler;
pub mod service;
