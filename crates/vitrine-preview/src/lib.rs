//! Preview orchestration and fault isolation.
//!
//! Ties the pipeline together per input string: transform, load, resolve,
//! then mount under a fault boundary, with the three observable outcomes
//! (loading, ready, failed) exposed as a state machine that re-runs on input
//! change and discards superseded in-flight work.

pub mod boundary;
pub mod orchestrator;
pub mod page;

pub use boundary::{failure_panel, BoundaryState, FaultBoundary};
pub use orchestrator::{
    FailureReport, MountedPreview, Orchestrator, PreviewConfig, PreviewState,
};
pub use page::{render_document, PageOptions};
