//! Core domain types
//!
//! This module contains the core domain structures used across Tributary services.
//! The orchestrator persists them; the pipeline executor consumes the plans.

pub mod blueprint;
pub mod pipeline;
pub mod plan;
pub mod project;
