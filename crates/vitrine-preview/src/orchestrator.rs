//! Preview orchestrator.
//!
//! Runs the pipeline per input string and holds the externally observable
//! state machine: `Loading` on input change, then `Ready` or `Failed`.
//! Unchanged input never re-runs the pipeline, and with the transform worker
//! enabled a newer input supersedes any in-flight run: only the response
//! matching the current request id may transition state.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use vitrine_sandbox::{load, RenderableKind, SandboxConfig};
use vitrine_transform::{
    transform, Failure, TransformConfig, TransformPayload, TransformRequest, TransformResponse,
    TransformWorker, TransformedModule,
};

use crate::boundary::{failure_panel, FaultBoundary};

/// Orchestrator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub transform: TransformConfig,
    pub sandbox: SandboxConfig,

    /// Transform-stage timeout in milliseconds when offloaded to the worker.
    pub timeout_ms: u64,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            transform: TransformConfig::default(),
            sandbox: SandboxConfig::default(),
            timeout_ms: 5_000,
        }
    }
}

/// Externally observable pipeline outcome for the current input.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PreviewState {
    /// Initial, or a run is in flight after an input change.
    Loading,
    /// Pipeline succeeded and the renderable was mounted.
    Ready(MountedPreview),
    /// A pipeline stage failed.
    Failed(FailureReport),
}

/// A mounted preview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MountedPreview {
    /// Normalized renderable shape.
    pub kind: RenderableKind,

    /// Rendered output, or the failure presentation when the fault boundary
    /// faulted during mount.
    pub html: String,

    /// Render-phase failure captured by the fault boundary, if any.
    pub fault: Option<Failure>,
}

/// A failed pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureReport {
    pub failure: Failure,

    /// Transformed code for the opt-in debug affordance. Absent when the
    /// transform stage itself failed.
    pub transformed: Option<String>,
}

impl PreviewState {
    pub fn is_loading(&self) -> bool {
        matches!(self, PreviewState::Loading)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, PreviewState::Ready(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, PreviewState::Failed(_))
    }

    /// HTML fragment for the current state: the mounted markup, the failure
    /// panel, or a loading notice.
    pub fn html(&self) -> String {
        match self {
            PreviewState::Loading => {
                r#"<p class="vitrine-loading">Compiling preview…</p>"#.to_string()
            }
            PreviewState::Ready(mounted) => mounted.html.clone(),
            PreviewState::Failed(report) => {
                failure_panel(&report.failure, report.transformed.as_deref())
            }
        }
    }
}

struct Pending {
    id: String,
    label: String,
    source: String,
}

/// Stateful preview pipeline driver for one input slot.
pub struct Orchestrator {
    config: PreviewConfig,
    worker: Option<TransformWorker>,
    source: Option<String>,
    state: PreviewState,
    pending: Option<Pending>,
    cycle: u64,
}

impl Orchestrator {
    /// Synchronous orchestrator: the whole pipeline runs inside
    /// [`Orchestrator::set_source`].
    pub fn new(config: PreviewConfig) -> Self {
        Self {
            config,
            worker: None,
            source: None,
            state: PreviewState::Loading,
            pending: None,
            cycle: 0,
        }
    }

    /// Orchestrator with the transform stage offloaded to a worker thread.
    pub fn with_worker(config: PreviewConfig) -> Self {
        let mut orchestrator = Self::new(config);
        orchestrator.worker = Some(TransformWorker::spawn());
        orchestrator
    }

    pub fn state(&self) -> &PreviewState {
        &self.state
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn config(&self) -> &PreviewConfig {
        &self.config
    }

    /// Feed the current input.
    ///
    /// Identical input is a no-op. New input invalidates any in-flight or
    /// completed result and restarts at `Loading`; in worker mode the run
    /// completes through [`Orchestrator::poll`]/[`Orchestrator::wait`].
    pub fn set_source(&mut self, source: &str) {
        let unchanged = self.source.as_deref() == Some(source);
        if unchanged && !self.state.is_loading() {
            return;
        }
        if unchanged && self.pending.is_some() {
            return;
        }

        self.source = Some(source.to_string());
        self.cycle += 1;
        self.state = PreviewState::Loading;
        self.pending = None;

        let label = format!("preview-{}.tsx", self.cycle);

        if let Some(worker) = &self.worker {
            let id = format!("preview-{}", self.cycle);
            let request = TransformRequest {
                id: id.clone(),
                source: source.to_string(),
                label: label.clone(),
                options: self.config.transform.clone(),
            };
            if worker.submit(request) {
                self.pending = Some(Pending {
                    id,
                    label,
                    source: source.to_string(),
                });
                return;
            }
            tracing::warn!("transform worker unavailable, transforming inline");
        }

        let outcome = transform(source, &label, &self.config.transform);
        let source = source.to_string();
        self.finish(outcome, &source);
    }

    /// Force a re-run of the current input, bypassing the unchanged-input
    /// guard (an explicit retry).
    pub fn refresh(&mut self) {
        if let Some(source) = self.source.take() {
            self.set_source(&source);
        }
    }

    /// Drain worker responses without blocking. Responses whose id does not
    /// match the current request are superseded and discarded.
    pub fn poll(&mut self) {
        loop {
            let response = match &self.worker {
                Some(worker) => worker.try_recv(),
                None => None,
            };
            match response {
                Some(response) => self.accept(response),
                None => break,
            }
        }
    }

    /// Block until the in-flight run completes or the transform timeout
    /// elapses (which fails the pipeline at the transform stage).
    pub fn wait(&mut self) -> &PreviewState {
        let timeout = Duration::from_millis(self.config.timeout_ms);
        let deadline = Instant::now() + timeout;

        while self.pending.is_some() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                tracing::warn!(timeout_ms = self.config.timeout_ms, "transform timed out");
                self.pending = None;
                self.state = PreviewState::Failed(FailureReport {
                    failure: Failure::transform(format!(
                        "transform timed out after {}ms",
                        self.config.timeout_ms
                    )),
                    transformed: None,
                });
                break;
            }

            let response = match &self.worker {
                Some(worker) => worker.recv_timeout(remaining),
                None => None,
            };
            if let Some(response) = response {
                self.accept(response);
            }
        }

        &self.state
    }

    /// Feed input and block for the outcome.
    pub fn update(&mut self, source: &str) -> &PreviewState {
        self.set_source(source);
        self.wait()
    }

    /// Transform, load, and resolve without mounting. Used by validation
    /// surfaces that only need the outcome kind.
    pub fn inspect(&self, source: &str, label: &str) -> Result<RenderableKind, Failure> {
        let module = transform(source, label, &self.config.transform)?;
        let loaded = load(&module, &self.config.sandbox)?;
        Ok(loaded.resolve()?.kind())
    }

    fn accept(&mut self, response: TransformResponse) {
        let matches = self
            .pending
            .as_ref()
            .map(|p| p.id == response.id)
            .unwrap_or(false);
        if !matches {
            tracing::debug!(id = %response.id, "discarding superseded transform response");
            return;
        }

        let Some(pending) = self.pending.take() else {
            return;
        };

        let outcome = match response.payload {
            TransformPayload::Success { code } => Ok(TransformedModule {
                label: pending.label.clone(),
                code,
            }),
            TransformPayload::Error { error } => Err(error.into_failure()),
        };

        self.finish(outcome, &pending.source);
    }

    fn finish(&mut self, outcome: Result<TransformedModule, Failure>, source: &str) {
        self.state = match outcome {
            Err(failure) => PreviewState::Failed(FailureReport {
                failure,
                transformed: None,
            }),
            Ok(module) => Self::mount(&module, source, &self.config),
        };
    }

    /// Load, resolve, and mount under a fresh fault boundary.
    fn mount(module: &TransformedModule, source: &str, config: &PreviewConfig) -> PreviewState {
        let loaded = match load(module, &config.sandbox) {
            Ok(loaded) => loaded,
            Err(failure) => {
                return PreviewState::Failed(FailureReport {
                    failure,
                    transformed: Some(module.code.clone()),
                })
            }
        };

        let mut renderable = match loaded.resolve() {
            Ok(renderable) => renderable,
            Err(failure) => {
                return PreviewState::Failed(FailureReport {
                    failure,
                    transformed: Some(module.code.clone()),
                })
            }
        };

        let kind = renderable.kind();
        tracing::debug!(label = renderable.label(), kind = %kind, "mounting preview");

        let mut boundary = FaultBoundary::new();
        match boundary.mount(|| renderable.render_html(source)) {
            Ok(html) => PreviewState::Ready(MountedPreview {
                kind,
                html,
                fault: None,
            }),
            Err(failure) => PreviewState::Ready(MountedPreview {
                kind,
                html: failure_panel(&failure, Some(&module.code)),
                fault: Some(failure),
            }),
        }
    }
}
