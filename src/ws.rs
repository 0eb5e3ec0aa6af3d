//! WebSocket connection
//!
//! Performs the handshake (extracting identity from the upgrade request)
//! and adapts a `WebSocketStream` to the [`Connection`] capability.

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tokio_tungstenite::WebSocketStream;
use tracing::debug;

use crate::connection::{Connection, MessageSink, MessageStream};
use crate::error::{AppError, ConnectionError, IdentityError};
use crate::identity::IdentityExtractor;
use crate::message::{InboundMessage, Message};
use crate::types::UserData;

/// Upgrade a raw stream to a WebSocket, identifying the user on the way
///
/// The handshake is rejected with `401 Unauthorized` if the request carries
/// no usable identity, in which case `AppError::Identity` is returned.
pub async fn accept<S>(
    stream: S,
    identity: &dyn IdentityExtractor,
    write_buffer_size: usize,
) -> Result<(WsConnection<S>, UserData), AppError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut identified: Option<Result<UserData, IdentityError>> = None;

    let callback = |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        match identity.identify(request.headers()) {
            Ok(user) => {
                identified = Some(Ok(user));
                Ok(response)
            }
            Err(e) => {
                let mut rejection = ErrorResponse::new(Some(e.to_string()));
                *rejection.status_mut() = StatusCode::UNAUTHORIZED;
                identified = Some(Err(e));
                Err(rejection)
            }
        }
    };

    let mut config = WebSocketConfig::default();
    config.write_buffer_size = write_buffer_size;

    let result =
        tokio_tungstenite::accept_hdr_async_with_config(stream, callback, Some(config)).await;

    match (result, identified) {
        (Ok(ws), Some(Ok(user))) => Ok((WsConnection::new(ws), user)),
        (_, Some(Err(e))) => Err(AppError::Identity(e)),
        (Err(e), _) => Err(AppError::WebSocket(e)),
        // Handshake completed without consulting the callback
        (Ok(_), None) => Err(AppError::Identity(IdentityError::MissingCookie)),
    }
}

/// A WebSocket speaking the room's JSON protocol
pub struct WsConnection<S> {
    inner: WebSocketStream<S>,
}

impl<S> WsConnection<S> {
    pub fn new(inner: WebSocketStream<S>) -> Self {
        Self { inner }
    }
}

impl<S> Connection for WsConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    type Stream = WsStream<S>;
    type Sink = WsSink<S>;

    fn split(self) -> (WsStream<S>, WsSink<S>) {
        let (sink, stream) = self.inner.split();
        (WsStream { stream }, WsSink { sink })
    }
}

pub struct WsStream<S> {
    stream: SplitStream<WebSocketStream<S>>,
}

pub struct WsSink<S> {
    sink: SplitSink<WebSocketStream<S>, WsMessage>,
}

#[async_trait]
impl<S> MessageStream for WsStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn receive(&mut self) -> Result<InboundMessage, ConnectionError> {
        loop {
            match self.stream.next().await {
                Some(Ok(WsMessage::Text(text))) => return Ok(serde_json::from_str(&text)?),
                Some(Ok(WsMessage::Close(_))) | None => return Err(ConnectionError::Closed),
                Some(Ok(WsMessage::Ping(_))) | Some(Ok(WsMessage::Pong(_))) => {
                    // Pong is handled automatically by tungstenite
                    debug!("Control frame received");
                }
                Some(Ok(_)) => {
                    // Binary or raw frames - ignore
                }
                Some(Err(e)) => return Err(map_ws_error(e)),
            }
        }
    }
}

#[async_trait]
impl<S> MessageSink for WsSink<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, message: &Message) -> Result<(), ConnectionError> {
        let json = serde_json::to_string(message)?;
        self.sink
            .send(WsMessage::Text(json.into()))
            .await
            .map_err(map_ws_error)
    }

    async fn close(&mut self) -> Result<(), ConnectionError> {
        self.sink.close().await.map_err(map_ws_error)
    }
}

fn map_ws_error(e: WsError) -> ConnectionError {
    match e {
        WsError::ConnectionClosed | WsError::AlreadyClosed => ConnectionError::Closed,
        e => ConnectionError::Protocol(e),
    }
}
