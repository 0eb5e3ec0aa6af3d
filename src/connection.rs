//! Connection capability consumed by a client
//!
//! A connection is split once into a read half and a write half so the
//! two pumps can own one each. Framing and encoding belong to the
//! implementation; the pumps only see decoded messages.
//!
//! - `ws`: WebSocket implementation (see [`crate::ws`])
//! - `memory`: channel-backed implementation for in-process peers

use async_trait::async_trait;

use crate::error::ConnectionError;
use crate::message::{InboundMessage, Message};

/// Read half: blocking receive of the next inbound message
#[async_trait]
pub trait MessageStream: Send {
    /// Returns `ConnectionError::Closed` once the peer is gone.
    async fn receive(&mut self) -> Result<InboundMessage, ConnectionError>;
}

/// Write half: send messages, then close
#[async_trait]
pub trait MessageSink: Send {
    async fn send(&mut self, message: &Message) -> Result<(), ConnectionError>;

    async fn close(&mut self) -> Result<(), ConnectionError>;
}

/// A duplex message connection
pub trait Connection: Send {
    type Stream: MessageStream + 'static;
    type Sink: MessageSink + 'static;

    fn split(self) -> (Self::Stream, Self::Sink);
}

pub mod memory {
    //! In-process connection backed by unbounded channels

    use async_trait::async_trait;
    use tokio::sync::mpsc;

    use super::{Connection, MessageSink, MessageStream};
    use crate::error::ConnectionError;
    use crate::message::{InboundMessage, Message};

    /// Server side of an in-memory connection
    pub struct MemoryConnection {
        stream: MemoryStream,
        sink: MemorySink,
    }

    pub struct MemoryStream {
        inbound: mpsc::UnboundedReceiver<InboundMessage>,
    }

    pub struct MemorySink {
        outbound: Option<mpsc::UnboundedSender<Message>>,
    }

    /// Remote side of an in-memory connection
    ///
    /// Dropping the peer (or calling [`MemoryPeer::hang_up`]) ends the
    /// server's read half.
    pub struct MemoryPeer {
        to_server: Option<mpsc::UnboundedSender<InboundMessage>>,
        from_server: mpsc::UnboundedReceiver<Message>,
    }

    /// Create a connected (server, peer) pair
    pub fn pair() -> (MemoryConnection, MemoryPeer) {
        let (to_server, inbound) = mpsc::unbounded_channel();
        let (outbound, from_server) = mpsc::unbounded_channel();
        let conn = MemoryConnection {
            stream: MemoryStream { inbound },
            sink: MemorySink {
                outbound: Some(outbound),
            },
        };
        let peer = MemoryPeer {
            to_server: Some(to_server),
            from_server,
        };
        (conn, peer)
    }

    impl Connection for MemoryConnection {
        type Stream = MemoryStream;
        type Sink = MemorySink;

        fn split(self) -> (MemoryStream, MemorySink) {
            (self.stream, self.sink)
        }
    }

    #[async_trait]
    impl MessageStream for MemoryStream {
        async fn receive(&mut self) -> Result<InboundMessage, ConnectionError> {
            self.inbound.recv().await.ok_or(ConnectionError::Closed)
        }
    }

    #[async_trait]
    impl MessageSink for MemorySink {
        async fn send(&mut self, message: &Message) -> Result<(), ConnectionError> {
            let outbound = self.outbound.as_ref().ok_or(ConnectionError::Closed)?;
            outbound
                .send(message.clone())
                .map_err(|_| ConnectionError::Closed)
        }

        async fn close(&mut self) -> Result<(), ConnectionError> {
            self.outbound.take();
            Ok(())
        }
    }

    impl MemoryPeer {
        /// Send a chat line to the server
        ///
        /// Returns false if the server side has stopped reading.
        pub fn say(&self, text: &str) -> bool {
            self.to_server
                .as_ref()
                .is_some_and(|tx| tx.send(InboundMessage::new(text)).is_ok())
        }

        /// Next message delivered by the server, `None` once its write half closed
        pub async fn recv(&mut self) -> Option<Message> {
            self.from_server.recv().await
        }

        /// Close the peer's sending side, keep receiving
        pub fn hang_up(&mut self) {
            self.to_server.take();
        }
    }
}
