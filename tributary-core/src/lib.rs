//! Tributary Core
//!
//! Core types for the Tributary ingestion scheduler.
//!
//! This crate contains:
//! - Domain types: blueprints, pipeline plans, pipelines and projects
//! - Plan merge primitives (`parallelize`, `sequentialize`)
//! - DTOs: requests exchanged with the orchestrator

pub mod domain;
pub mod dto;

pub use domain::plan::{parallelize, sequentialize};
