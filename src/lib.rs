pub mod cleaning;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod job;
pub mod loader;
