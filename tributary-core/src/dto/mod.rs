//! Data Transfer Objects
//!
//! Requests and responses exchanged between the HTTP layer, the blueprint
//! service and the pipeline executor.

pub mod blueprint;
pub mod pipeline;
