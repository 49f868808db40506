//! Render fault boundary.
//!
//! Wraps the render phase of a mounted renderable so that a throw (or a host
//! panic) converts into the uniform failure shape instead of propagating and
//! taking unrelated UI down with it. The boundary is scoped to exactly one
//! mount instance: once faulted it stays faulted, and a new input gets a new
//! boundary.

use std::panic::{catch_unwind, AssertUnwindSafe};

use vitrine_transform::Failure;

/// Boundary state machine: `Clean -> Faulted`, terminal per mount instance.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundaryState {
    Clean,
    Faulted(Failure),
}

/// Fault boundary around one mounted renderable.
#[derive(Debug)]
pub struct FaultBoundary {
    state: BoundaryState,
}

impl FaultBoundary {
    pub fn new() -> Self {
        Self {
            state: BoundaryState::Clean,
        }
    }

    /// Run the render phase under the boundary.
    ///
    /// A faulted boundary short-circuits with the captured failure without
    /// re-rendering; recovery is a new mount with a new boundary.
    pub fn mount<F>(&mut self, render: F) -> Result<String, Failure>
    where
        F: FnOnce() -> Result<String, Failure>,
    {
        if let BoundaryState::Faulted(failure) = &self.state {
            return Err(failure.clone());
        }

        match catch_unwind(AssertUnwindSafe(render)) {
            Ok(Ok(html)) => Ok(html),
            Ok(Err(failure)) => {
                tracing::debug!(stage = %failure.stage, "render boundary faulted");
                self.state = BoundaryState::Faulted(failure.clone());
                Err(failure)
            }
            Err(_) => {
                let failure = Failure::render("render panicked");
                self.state = BoundaryState::Faulted(failure.clone());
                Err(failure)
            }
        }
    }

    pub fn state(&self) -> &BoundaryState {
        &self.state
    }

    pub fn is_faulted(&self) -> bool {
        matches!(self.state, BoundaryState::Faulted(_))
    }
}

impl Default for FaultBoundary {
    fn default() -> Self {
        Self::new()
    }
}

/// Uniform failure presentation.
///
/// The primary message is always visible; the failure detail and the
/// transformed-source debug payload stay inside collapsed `<details>` blocks
/// until the reader opts in.
pub fn failure_panel(failure: &Failure, debug: Option<&str>) -> String {
    let mut panel = format!(
        r#"<div class="vitrine-failure" data-stage="{stage}">
  <strong>Preview failed during {stage}</strong>
  <p>{message}</p>"#,
        stage = failure.stage,
        message = escape_html(&failure.message),
    );

    if let Some(detail) = &failure.detail {
        panel.push_str(&format!(
            "\n  <details><summary>Details</summary><pre>{}</pre></details>",
            escape_html(detail)
        ));
    }

    if let Some(debug) = debug {
        panel.push_str(&format!(
            "\n  <details><summary>Transformed source</summary><pre>{}</pre></details>",
            escape_html(debug)
        ));
    }

    panel.push_str("\n</div>");
    panel
}

/// Escape HTML special characters including single quotes.
fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
