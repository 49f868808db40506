//! WebSocket push channel for live preview updates.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Messages sent to connected preview pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveMessage {
    /// Connection established
    Connected,

    /// Full page reload
    Reload,

    /// Replace the preview with freshly rendered markup
    Update {
        /// Rendered preview HTML (or the failure panel)
        html: String,
    },
}

/// Hub for broadcasting live messages to all connected clients.
#[derive(Debug, Clone)]
pub struct LiveHub {
    sender: broadcast::Sender<LiveMessage>,
}

impl LiveHub {
    /// Create a new hub.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }

    /// Send a message to all connected clients.
    pub fn send(&self, msg: LiveMessage) {
        // Ignore send errors (no receivers)
        let _ = self.sender.send(msg);
    }

    /// Subscribe to live messages.
    pub fn subscribe(&self) -> broadcast::Receiver<LiveMessage> {
        self.sender.subscribe()
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for LiveHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate the client-side live-update script.
///
/// Unlike hot-module-replacement schemes, this never evaluates pushed code:
/// updates are rendered HTML swapped into the preview root.
pub fn live_client_script(ws_path: &str) -> String {
    format!(
        r#"
(function() {{
  'use strict';

  const scheme = location.protocol === 'https:' ? 'wss://' : 'ws://';
  const ws = new WebSocket(scheme + location.host + '{ws_path}');
  let reconnectAttempts = 0;
  const maxReconnectAttempts = 10;

  ws.onopen = function() {{
    console.log('[vitrine] Connected');
    reconnectAttempts = 0;
  }};

  ws.onmessage = function(event) {{
    const msg = JSON.parse(event.data);

    switch (msg.type) {{
      case 'reload':
        location.reload();
        break;

      case 'update': {{
        const root = document.getElementById('vitrine-root');
        if (root) {{
          root.innerHTML = msg.html;
        }} else {{
          location.reload();
        }}
        break;
      }}

      case 'connected':
        console.log('[vitrine] Server acknowledged connection');
        break;
    }}
  }};

  ws.onclose = function() {{
    console.log('[vitrine] Disconnected');
    if (reconnectAttempts < maxReconnectAttempts) {{
      reconnectAttempts++;
      setTimeout(function() {{
        location.reload();
      }}, 1000 * reconnectAttempts);
    }}
  }};

  ws.onerror = function(e) {{
    console.error('[vitrine] WebSocket error:', e);
  }};
}})();
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hub_broadcasts_messages() {
        let hub = LiveHub::new();
        let mut rx = hub.subscribe();

        hub.send(LiveMessage::Reload);

        match rx.try_recv() {
            Ok(LiveMessage::Reload) => {}
            _ => panic!("Expected Reload message"),
        }
    }

    #[test]
    fn serializes_messages() {
        let msg = LiveMessage::Update {
            html: "<span>ok</span>".to_string(),
        };

        let json = serde_json::to_string(&msg).unwrap();

        assert!(json.contains(r#""type":"update""#));
        assert!(json.contains("span"));
    }

    #[test]
    fn client_script_targets_the_preview_root() {
        let script = live_client_script("/__live");

        assert!(script.contains("vitrine-root"));
        assert!(script.contains("'/__live'"));
        assert!(!script.contains("createElement"));
    }
}
