//! Library crate for dir-scan-rs exposing reusable modules.
pub mod config;
pub mod error;
pub mod logging;
pub mod probe;
pub mod queue;
pub mod report;
pub mod scanner;
pub mod types;
pub mod wordlist;
