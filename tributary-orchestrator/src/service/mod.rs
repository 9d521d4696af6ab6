//! Service Module
//!
//! Business logic layer for the orchestrator.
//! Services orchestrate between repositories, the plan composer and the
//! scheduler.

pub mod blueprint;
pub mod trigger;

pub use blueprint::BlueprintService;
pub use trigger::PipelineTrigger;
