//! Form-POST webhook receiver.
//!
//! Chat backends deliver some interactions (button clicks, slash commands)
//! as `application/x-www-form-urlencoded` POSTs rather than over the event
//! socket. [`WebhookServer`] turns each such POST into an [`Event`] with a
//! caller-supplied [`FormConverter`] and pushes it onto a queue that the
//! engine drains alongside its socket.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Form, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use parley_core::{Event, TransportError, TransportResult};

/// Turns the decoded form fields of one POST into an event.
///
/// Returning `None` rejects the request with `400 Bad Request`.
pub type FormConverter = Arc<dyn Fn(HashMap<String, String>) -> Option<Event> + Send + Sync>;

struct ServerState {
    converter: FormConverter,
    sink: mpsc::UnboundedSender<Event>,
}

/// A running webhook receiver.
///
/// The server stops when [`shutdown`](Self::shutdown) is called or the handle
/// is dropped.
pub struct WebhookServer {
    local_addr: SocketAddr,
    path: String,
    shutdown: Option<oneshot::Sender<()>>,
}

impl WebhookServer {
    /// Binds `addr` and starts accepting POSTs on `path`.
    pub async fn bind(
        addr: &str,
        path: &str,
        converter: FormConverter,
        sink: mpsc::UnboundedSender<Event>,
    ) -> TransportResult<Self> {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };

        let state = Arc::new(ServerState { converter, sink });
        let router = Router::new()
            .route(&path, post(receive))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| TransportError::ConnectionFailed {
                url: addr.to_string(),
                reason: format!("bind failed: {e}"),
            })?;
        let local_addr = listener.local_addr()?;

        info!(addr = %local_addr, path = %path, "Webhook server listening");

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let server = axum::serve(listener, router).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            });
            if let Err(e) = server.await {
                error!(error = %e, "Webhook server error");
            }
            info!("Webhook server stopped");
        });

        Ok(Self {
            local_addr,
            path,
            shutdown: Some(shutdown_tx),
        })
    }

    /// Returns the bound address.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns the route POSTs are accepted on.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Stops the server.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for WebhookServer {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for WebhookServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookServer")
            .field("local_addr", &self.local_addr)
            .field("path", &self.path)
            .finish()
    }
}

async fn receive(
    State(state): State<Arc<ServerState>>,
    Form(fields): Form<HashMap<String, String>>,
) -> Response {
    let Some(event) = (state.converter)(fields) else {
        warn!("Rejected webhook payload");
        return (StatusCode::BAD_REQUEST, "unrecognized payload").into_response();
    };

    debug!(event_type = event.event_type().unwrap_or("unknown"), "Webhook event received");
    if state.sink.send(event).is_err() {
        error!("Webhook event queue closed");
        return (StatusCode::SERVICE_UNAVAILABLE, "bot is shutting down").into_response();
    }
    (StatusCode::OK, "").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, Value};

    fn echo_fields() -> FormConverter {
        Arc::new(|fields: HashMap<String, String>| {
            let action = fields.get("action")?.clone();
            let mut map = Map::new();
            map.insert("type".into(), Value::from("webhook"));
            map.insert("action".into(), Value::from(action));
            Some(Event::new(map))
        })
    }

    async fn post_form(url: &str, body: &'static str) -> reqwest::StatusCode {
        reqwest::Client::new()
            .post(url)
            .header("content-type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_form_post_becomes_event() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let server = WebhookServer::bind("127.0.0.1:0", "hooks", echo_fields(), tx)
            .await
            .unwrap();
        assert_eq!(server.path(), "/hooks");

        let url = format!("http://{}/hooks", server.local_addr());
        assert_eq!(post_form(&url, "action=approve&x=1").await, reqwest::StatusCode::OK);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type(), Some("webhook"));
        assert_eq!(event.get_str("action"), Some("approve"));
    }

    #[tokio::test]
    async fn test_unconvertible_payload_is_rejected() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let server = WebhookServer::bind("127.0.0.1:0", "/hooks", echo_fields(), tx)
            .await
            .unwrap();

        let url = format!("http://{}/hooks", server.local_addr());
        assert_eq!(post_form(&url, "other=1").await, reqwest::StatusCode::BAD_REQUEST);
        assert!(rx.try_recv().is_err());
    }
}
