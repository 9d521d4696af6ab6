//! Tributary orchestrator
//!
//! Blueprint validation, plan composition, cron scheduling and pipeline
//! triggering, plus the HTTP API serving them.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod plan;
pub mod repository;
pub mod scheduler;
pub mod service;
