//! Live preview server for vitrine snippets.
//!
//! Watches a snippet file, re-runs the preview pipeline on change, and pushes
//! the rendered result to connected browsers over a WebSocket. The server
//! ships rendered HTML only, never executable code.

pub mod server;
pub mod watcher;
pub mod websocket;

pub use server::{PreviewServer, PreviewServerConfig, ServerError};
pub use watcher::{SnippetWatcher, WatchEvent};
pub use websocket::{live_client_script, LiveHub, LiveMessage};
