//! WebSocket client connection.

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::{debug, info, trace};

use parley_core::{TransportError, TransportResult};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// A connected WebSocket carrying text frames.
///
/// Reading and writing are independent: one task may wait in
/// [`recv_text`](Self::recv_text) while others [`send_text`](Self::send_text).
/// There is no reconnection; once the peer goes away every call fails with
/// [`TransportError::ConnectionClosed`].
pub struct WsConnection {
    url: String,
    sink: Mutex<WsSink>,
    source: Mutex<WsSource>,
}

impl WsConnection {
    /// Connects to `url` (`ws://` or `wss://`).
    pub async fn connect(url: &str) -> TransportResult<Self> {
        info!(url = %url, "Connecting to WebSocket server");

        let (stream, _response) =
            connect_async(url)
                .await
                .map_err(|e| TransportError::ConnectionFailed {
                    url: url.to_string(),
                    reason: format!("WebSocket connection failed: {e}"),
                })?;
        let (sink, source) = stream.split();

        info!(url = %url, "WebSocket connected");
        Ok(Self {
            url: url.to_string(),
            sink: Mutex::new(sink),
            source: Mutex::new(source),
        })
    }

    /// Returns the URL this connection was opened with.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Waits for the next text frame.
    ///
    /// Pings are answered, pongs skipped and binary frames decoded as UTF-8.
    pub async fn recv_text(&self) -> TransportResult<String> {
        let mut source = self.source.lock().await;
        loop {
            match source.next().await {
                Some(Ok(Message::Text(text))) => {
                    trace!(len = text.len(), "Received text");
                    return Ok(text.as_str().to_string());
                }
                Some(Ok(Message::Binary(data))) => {
                    trace!(len = data.len(), "Received binary");
                    return Ok(String::from_utf8_lossy(&data).into_owned());
                }
                Some(Ok(Message::Ping(data))) => {
                    trace!("Received ping, sending pong");
                    self.sink
                        .lock()
                        .await
                        .send(Message::Pong(data))
                        .await
                        .map_err(|e| TransportError::SendFailed(e.to_string()))?;
                }
                Some(Ok(Message::Pong(_))) | Some(Ok(Message::Frame(_))) => {}
                Some(Ok(Message::Close(frame))) => {
                    debug!(url = %self.url, ?frame, "Server closed connection");
                    return Err(TransportError::closed("server closed the WebSocket"));
                }
                Some(Err(e)) => {
                    return Err(TransportError::protocol(format!("WebSocket error: {e}")));
                }
                None => return Err(TransportError::closed("WebSocket stream ended")),
            }
        }
    }

    /// Sends one text frame.
    pub async fn send_text(&self, text: &str) -> TransportResult<()> {
        self.sink
            .lock()
            .await
            .send(Message::Text(text.to_string().into()))
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    /// Sends a close frame.
    pub async fn close(&self) -> TransportResult<()> {
        self.sink
            .lock()
            .await
            .close()
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }
}

impl std::fmt::Debug for WsConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsConnection").field("url", &self.url).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    /// Accepts one client, sends `greeting`, echoes one frame, then closes.
    async fn echo_server(greeting: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            ws.send(Message::Text(greeting.into())).await.unwrap();
            if let Some(Ok(msg)) = ws.next().await {
                ws.send(msg).await.unwrap();
            }
            ws.close(None).await.unwrap();
        });
        format!("ws://{addr}")
    }

    #[tokio::test]
    async fn test_send_and_receive_text() {
        let url = echo_server(r#"{"type":"hello"}"#).await;
        let conn = WsConnection::connect(&url).await.unwrap();
        assert_eq!(conn.url(), url);

        assert_eq!(conn.recv_text().await.unwrap(), r#"{"type":"hello"}"#);

        conn.send_text("ping me back").await.unwrap();
        assert_eq!(conn.recv_text().await.unwrap(), "ping me back");

        let err = conn.recv_text().await.unwrap_err();
        assert!(matches!(err, TransportError::ConnectionClosed { .. }));
    }

    #[tokio::test]
    async fn test_connect_failure_is_reported() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = WsConnection::connect(&format!("ws://{addr}")).await.unwrap_err();
        assert!(matches!(err, TransportError::ConnectionFailed { .. }));
    }
}
