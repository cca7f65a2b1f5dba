//! Connection establishment.
//!
//! `Connector` hides how a socket is opened so the transport client can be
//! driven by the WebSocket implementation in production and by in-memory
//! channels in tests. A `Connection` is a pair of frame channels: dropping
//! `outbound` flushes queued frames and closes the socket, and `inbound`
//! ends when the socket does.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::connect_async;
use tracing::{debug, info, warn};
use url::Url;

use rh_core::config::ServerConfig;
use rh_core::error::{RhError, RhResult};
use rh_core::platform::{Platform, RuntimeTarget};

use crate::frame::Frame;

/// An open socket, as seen by the transport client.
#[derive(Debug)]
pub struct Connection {
    pub outbound: mpsc::UnboundedSender<Frame>,
    pub inbound: mpsc::UnboundedReceiver<Frame>,
    /// Fires once the writer has drained `outbound` and closed the socket.
    pub flushed: Option<oneshot::Receiver<()>>,
}

impl Connection {
    pub fn new(
        outbound: mpsc::UnboundedSender<Frame>,
        inbound: mpsc::UnboundedReceiver<Frame>,
    ) -> Self {
        Self {
            outbound,
            inbound,
            flushed: None,
        }
    }

    pub fn with_flush_signal(mut self, flushed: oneshot::Receiver<()>) -> Self {
        self.flushed = Some(flushed);
        self
    }
}

/// Opens authenticated sockets.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a socket presenting `token` as the bearer credential.
    ///
    /// Credential rejection during the handshake must be reported as an
    /// auth error (`RhError::AuthFailed`) so it is not retried.
    async fn connect(&self, token: &str) -> RhResult<Connection>;
}

/// WebSocket connector built on tokio-tungstenite.
#[derive(Debug, Clone)]
pub struct WsConnector {
    endpoint: String,
    device: String,
}

impl WsConnector {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            device: Platform::device_name(),
        }
    }

    /// Connector for the configured socket endpoint.
    pub fn from_config(config: &ServerConfig, target: RuntimeTarget) -> Self {
        Self::new(config.socket_endpoint(target))
    }

    /// Override the device name reported to the server.
    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = device.into();
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request_url(&self) -> RhResult<Url> {
        let mut url = Url::parse(&self.endpoint)
            .map_err(|e| RhError::Config(format!("invalid socket url {}: {e}", self.endpoint)))?;
        match url.scheme() {
            "ws" | "wss" => {}
            other => {
                return Err(RhError::Config(format!(
                    "socket url must use ws or wss, got {other}"
                )))
            }
        }
        url.query_pairs_mut().append_pair("device", &self.device);
        Ok(url)
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, token: &str) -> RhResult<Connection> {
        let url = self.request_url()?;
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| RhError::Socket(format!("bad socket request: {e}")))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| RhError::AuthFailed("token is not a valid header value".into()))?;
        request.headers_mut().insert(AUTHORIZATION, bearer);

        info!("opening websocket to {}", self.endpoint);
        let (stream, response) = connect_async(request).await.map_err(map_handshake_error)?;
        debug!("websocket handshake complete (status {})", response.status());

        let (mut ws_write, mut ws_read) = stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Frame>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<Frame>();
        let (flushed_tx, flushed_rx) = oneshot::channel();

        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                let text = match frame.encode() {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("failed to encode {} frame: {e}", frame.event);
                        continue;
                    }
                };
                if let Err(e) = ws_write.send(Message::text(text)).await {
                    warn!("websocket write failed: {e}");
                    break;
                }
            }
            let _ = ws_write.close().await;
            let _ = flushed_tx.send(());
            debug!("websocket writer stopped");
        });

        tokio::spawn(async move {
            loop {
                let next = tokio::select! {
                    _ = inbound_tx.closed() => break,
                    next = ws_read.next() => next,
                };
                let message = match next {
                    Some(Ok(message)) => message,
                    Some(Err(e)) => {
                        warn!("websocket read failed: {e}");
                        break;
                    }
                    None => break,
                };
                match message {
                    Message::Text(text) => match Frame::decode(&text) {
                        Ok(frame) => {
                            if inbound_tx.send(frame).is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!("dropping undecodable frame: {e}"),
                    },
                    Message::Close(reason) => {
                        debug!("websocket closed by server: {reason:?}");
                        break;
                    }
                    _ => {}
                }
            }
            debug!("websocket reader stopped");
        });

        Ok(Connection::new(outbound_tx, inbound_rx).with_flush_signal(flushed_rx))
    }
}

fn map_handshake_error(e: WsError) -> RhError {
    match e {
        WsError::Http(response) if matches!(response.status().as_u16(), 401 | 403) => {
            RhError::AuthFailed(format!("socket handshake rejected ({})", response.status()))
        }
        other => RhError::Socket(other.to_string()),
    }
}
