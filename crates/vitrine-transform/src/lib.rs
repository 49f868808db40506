//! Source transformation for untrusted component previews.
//!
//! This crate turns an arbitrary TSX/JSX source string into a plain script
//! the sandbox can execute directly: type syntax stripped, JSX lowered to
//! rendering-library calls, and ES module syntax rewritten against an
//! injected `require`/`exports` pair. Every failure folds into the uniform
//! [`Failure`] payload shared by the whole preview pipeline.

pub mod failure;
pub mod lower;
pub mod transform;
pub mod worker;

pub use failure::{Failure, Stage};
pub use transform::{transform, TransformConfig, TransformedModule, RENDER_BINDING};
pub use worker::{
    TransformPayload, TransformRequest, TransformResponse, TransformWorker, WireError,
};
