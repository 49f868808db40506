//! Explicit-capability sandbox for transformed component modules.
//!
//! Executes transformed module text in a fresh JavaScript realm whose only
//! host-provided bindings are the rendering library and an allow-list module
//! resolver, then normalizes whatever the module exports into a renderable
//! and mounts it to HTML. The realm has the language builtins and nothing
//! else: no DOM, no filesystem, no network, no storage. Every capability the
//! sandboxed code can reach is passed as an explicit wrapper parameter.

pub mod bindings;
pub mod element;
pub mod loader;
pub mod render;
pub mod resolve;

pub use bindings::{HostBindings, SandboxConfig};
pub use loader::{load, LoadedModule};
pub use resolve::{Renderable, RenderableKind};
