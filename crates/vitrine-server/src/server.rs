//! Live preview server implementation.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc, RwLock};

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use tower_http::services::ServeDir;

use vitrine_preview::{render_document, Orchestrator, PageOptions, PreviewConfig, PreviewState};

use crate::watcher::{SnippetWatcher, WatchEvent};
use crate::websocket::{live_client_script, LiveHub, LiveMessage};

/// Configuration for the live preview server.
#[derive(Debug, Clone)]
pub struct PreviewServerConfig {
    /// Snippet source file to preview
    pub snippet_path: PathBuf,

    /// Port to listen on
    pub port: u16,

    /// Host to bind to
    pub host: String,

    /// Open browser on start
    pub open: bool,

    /// Document title
    pub title: String,

    /// Pipeline configuration
    pub preview: PreviewConfig,
}

impl Default for PreviewServerConfig {
    fn default() -> Self {
        Self {
            snippet_path: PathBuf::from("snippet.tsx"),
            port: 7700,
            host: "127.0.0.1".to_string(),
            open: true,
            title: "Vitrine Preview".to_string(),
            preview: PreviewConfig::default(),
        }
    }
}

/// Errors that can occur with the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind to {0}: {1}")]
    BindError(SocketAddr, String),

    #[error("File watch error: {0}")]
    WatchError(String),

    #[error("Snippet not found: {0}")]
    SnippetNotFound(String),
}

/// Shared server state.
struct ServerState {
    current: RwLock<PreviewState>,
    hub: LiveHub,
    options: PageOptions,
}

/// Live preview server.
pub struct PreviewServer {
    config: PreviewServerConfig,
}

impl PreviewServer {
    /// Create a new preview server.
    pub fn new(config: PreviewServerConfig) -> Self {
        Self { config }
    }

    /// Start the server.
    pub async fn start(self) -> Result<(), ServerError> {
        if !self.config.snippet_path.exists() {
            return Err(ServerError::SnippetNotFound(
                self.config.snippet_path.display().to_string(),
            ));
        }
        let snippet_path = self
            .config
            .snippet_path
            .canonicalize()
            .unwrap_or_else(|_| self.config.snippet_path.clone());
        let snippet_dir = snippet_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .expect("Invalid address");

        let state = Arc::new(ServerState {
            current: RwLock::new(PreviewState::Loading),
            hub: LiveHub::new(),
            options: PageOptions {
                title: self.config.title.clone(),
                live_script: Some("/__live.js".to_string()),
            },
        });

        // The orchestrator lives on its own thread: pipeline runs are
        // CPU-bound and its execution realms never cross await points.
        let updates = spawn_preview_thread(self.config.preview.clone(), Arc::clone(&state));

        // Initial render.
        send_snippet(&snippet_path, &updates);

        let (watcher, mut rx) = SnippetWatcher::new(&[snippet_dir.clone()])
            .map_err(|e| ServerError::WatchError(e.to_string()))?;

        let watch_state = Arc::clone(&state);
        let watch_path = snippet_path.clone();
        let watch_updates = updates.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                handle_watch_event(&watch_state, &watch_path, &watch_updates, event);
            }
            // Keep watcher alive
            drop(watcher);
        });

        let app = Router::new()
            .route("/", get(index_handler))
            .route("/__live", get(ws_handler))
            .route("/__live.js", get(live_script_handler))
            .nest_service("/assets", ServeDir::new(&snippet_dir))
            .with_state(state);

        tracing::info!("Starting preview server at http://{}", addr);

        if self.config.open {
            let url = format!("http://{}", addr);
            let _ = open::that(&url);
        }

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(addr, e.to_string()))?;

        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::BindError(addr, e.to_string()))?;

        Ok(())
    }
}

/// Spawn the thread that owns the orchestrator and feeds the hub.
fn spawn_preview_thread(config: PreviewConfig, state: Arc<ServerState>) -> mpsc::Sender<String> {
    let (tx, rx) = mpsc::channel::<String>();

    std::thread::Builder::new()
        .name("vitrine-preview".to_string())
        .spawn(move || {
            let mut orchestrator = Orchestrator::with_worker(config);

            while let Ok(source) = rx.recv() {
                // Coalesce queued updates; only the newest input matters.
                let mut source = source;
                while let Ok(newer) = rx.try_recv() {
                    source = newer;
                }

                let snapshot = orchestrator.update(&source).clone();
                if let Ok(mut current) = state.current.write() {
                    *current = snapshot.clone();
                }
                state.hub.send(LiveMessage::Update {
                    html: snapshot.html(),
                });
            }
        })
        .expect("failed to spawn preview thread");

    tx
}

/// Handle file watch events.
fn handle_watch_event(
    state: &Arc<ServerState>,
    snippet_path: &Path,
    updates: &mpsc::Sender<String>,
    event: WatchEvent,
) {
    match event {
        WatchEvent::SnippetModified(path) | WatchEvent::Created(path)
            if path.as_path() == snippet_path =>
        {
            tracing::info!("Snippet modified: {}", path.display());
            send_snippet(snippet_path, updates);
        }

        WatchEvent::Deleted(path) if path.as_path() == snippet_path => {
            tracing::warn!("Snippet deleted: {}", path.display());
            state.hub.send(LiveMessage::Reload);
        }

        _ => {}
    }
}

/// Read the snippet and queue it for the preview thread.
fn send_snippet(path: &Path, updates: &mpsc::Sender<String>) {
    match std::fs::read_to_string(path) {
        Ok(source) => {
            let _ = updates.send(source);
        }
        Err(e) => tracing::warn!("Failed to read {}: {}", path.display(), e),
    }
}

/// Handler for the preview page.
async fn index_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let current = state
        .current
        .read()
        .map(|s| s.clone())
        .unwrap_or(PreviewState::Loading);

    Html(render_document(&current, &state.options))
}

/// Handler for the live-update WebSocket endpoint.
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

/// Handle a WebSocket connection.
async fn handle_ws(mut socket: WebSocket, state: Arc<ServerState>) {
    let mut rx = state.hub.subscribe();

    let msg = serde_json::to_string(&LiveMessage::Connected).unwrap();
    if socket.send(Message::Text(msg.into())).await.is_err() {
        return;
    }

    while let Ok(live_msg) = rx.recv().await {
        let json = serde_json::to_string(&live_msg).unwrap();
        if socket.send(Message::Text(json.into())).await.is_err() {
            break;
        }
    }
}

/// Handler for the live-update client script.
async fn live_script_handler() -> impl IntoResponse {
    let script = live_client_script("/__live");
    ([("content-type", "application/javascript")], script)
}
