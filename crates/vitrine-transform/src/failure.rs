//! Uniform failure payload for the preview pipeline.

use serde::{Deserialize, Serialize};

/// Pipeline stage where a failure originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Parse/compile errors, including empty input.
    Transform,
    /// Execution errors while evaluating the module body.
    Load,
    /// No usable export shape found.
    Resolve,
    /// Throw while mounting the renderable.
    Render,
}

impl Stage {
    /// Stable lowercase name, as used in logs and wire payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Transform => "transform",
            Stage::Load => "load",
            Stage::Resolve => "resolve",
            Stage::Render => "render",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recoverable pipeline failure.
///
/// Created at the point of failure, carried upward unchanged, rendered by the
/// caller's error presentation, and discarded on the next input change.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[error("{stage} failed: {message}")]
pub struct Failure {
    /// Originating stage.
    pub stage: Stage,

    /// Primary human-readable message.
    pub message: String,

    /// Secondary diagnostic payload (stack trace or transformed-source dump).
    /// Never shown by default; callers put it behind an opt-in affordance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Failure {
    /// Failure in the transform stage.
    pub fn transform(message: impl Into<String>) -> Self {
        Self::new(Stage::Transform, message)
    }

    /// Failure in the load stage.
    pub fn load(message: impl Into<String>) -> Self {
        Self::new(Stage::Load, message)
    }

    /// Failure in the resolve stage.
    pub fn resolve(message: impl Into<String>) -> Self {
        Self::new(Stage::Resolve, message)
    }

    /// Failure in the render stage.
    pub fn render(message: impl Into<String>) -> Self {
        Self::new(Stage::Render, message)
    }

    fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
            detail: None,
        }
    }

    /// Attach a secondary diagnostic payload.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}
