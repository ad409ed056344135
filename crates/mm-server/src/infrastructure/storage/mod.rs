//! On-disk configuration.

pub mod config;
