//! Command handlers

pub mod config;
pub mod log;
pub mod store;
