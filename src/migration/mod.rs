//! Role migration: plans, their execution, and teardown.
//!
//! A plan is an ordered list of registry mutations. The orchestrator executes
//! it one awaited call at a time and stops at the first failure; already
//! applied effects are real and are left for an operator to remediate with a
//! corrected plan.

pub mod events;
pub mod orchestrator;
pub mod plan;
pub mod result;
pub mod step;

#[cfg(test)]
mod proptests;

pub use events::{EventSink, MigrationEvent, RecordingSink, TracingSink};
pub use orchestrator::{cancellation, validate_plan, CancelHandle, CancelToken, Orchestrator};
pub use plan::MigrationPlan;
pub use result::{
    AppliedStep, ExecutionState, MigrationResult, StepFailure, TeardownEntry, TeardownReport,
};
pub use step::{MigrationStep, StepAction, StepKind};
