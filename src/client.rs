//! Client pumps
//!
//! A client bridges one connection to the room with two concurrent loops:
//! - the read pump is the only reader of the connection and the only
//!   submitter of this client's messages
//! - the write pump is the only reader of the mailbox and the only writer
//!   to the connection

use std::sync::Arc;

use tracing::{debug, warn};

use crate::avatar::Avatar;
use crate::connection::{MessageSink, MessageStream};
use crate::error::ConnectionError;
use crate::message::Message;
use crate::room::{Mailbox, RoomHandle};
use crate::types::{ClientId, UserData};

/// A connected client
///
/// Holds the identity stamped onto outgoing messages and the handle of the
/// room it belongs to.
#[derive(Debug, Clone)]
pub struct Client {
    /// Unique identifier for this client
    pub id: ClientId,
    /// Identity from the handshake
    pub user: UserData,
    /// Avatar reference, resolved once at connect
    pub avatar_url: String,
    room: RoomHandle,
}

impl Client {
    /// Create a client for `user` in `room`
    ///
    /// An avatar lookup failure leaves the avatar URL empty.
    pub fn new(user: UserData, room: RoomHandle, avatar: &dyn Avatar) -> Self {
        let avatar_url = avatar.avatar_url(&user).unwrap_or_else(|e| {
            debug!("No avatar for {}: {}", user.name, e);
            String::new()
        });
        Self {
            id: ClientId::new(),
            user,
            avatar_url,
            room,
        }
    }

    /// Connection → room
    ///
    /// Returns when the connection fails or closes, or the room is gone.
    pub async fn read_pump<S: MessageStream>(&self, mut stream: S) {
        loop {
            let inbound = match stream.receive().await {
                Ok(inbound) => inbound,
                Err(ConnectionError::Closed) => {
                    debug!("Client {} closed the connection", self.id);
                    break;
                }
                Err(e) => {
                    warn!("Read error for {}: {}", self.id, e);
                    break;
                }
            };

            let message = Message::stamp(inbound, self.user.name.clone(), self.avatar_url.clone());
            if self.room.broadcast(self.id, Arc::new(message)).await.is_err() {
                debug!("Room closed, ending read pump for {}", self.id);
                break;
            }
        }
        debug!("Read pump ended for {}", self.id);
    }

    /// Mailbox → connection
    ///
    /// Drains the mailbox until the room closes it, then closes the
    /// connection's write side. A send failure ends the pump early.
    pub async fn write_pump<K: MessageSink>(id: ClientId, mut mailbox: Mailbox, mut sink: K) {
        while let Some(message) = mailbox.recv().await {
            if let Err(e) = sink.send(&message).await {
                debug!("Send to {} failed, ending write pump: {}", id, e);
                break;
            }
        }

        // Best effort
        let _ = sink.close().await;
        debug!("Write pump ended for {}", id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avatar::AuthAvatar;
    use crate::config::RoomConfig;
    use crate::connection::memory::pair;
    use crate::connection::Connection;
    use crate::message::InboundMessage;
    use crate::room::{mailbox, Room};

    fn spawn_room() -> RoomHandle {
        let (room, handle) = Room::new(&RoomConfig::default());
        tokio::spawn(room.run());
        handle
    }

    #[tokio::test]
    async fn test_client_creation() {
        let mut user = UserData::named("Alice");
        user.avatar_url = Some("http://a/b.png".to_string());
        let client = Client::new(user, spawn_room(), &AuthAvatar);

        assert_eq!(client.user.name, "Alice");
        assert_eq!(client.avatar_url, "http://a/b.png");
    }

    #[tokio::test]
    async fn test_missing_avatar_is_empty() {
        let client = Client::new(UserData::named("Bob"), spawn_room(), &AuthAvatar);
        assert_eq!(client.avatar_url, "");
    }

    #[tokio::test]
    async fn test_read_pump_stamps_and_forwards() {
        let room = spawn_room();
        let listener = ClientId::new();
        let (tx, mut rx) = mailbox(8);
        let _departure = room.join(listener, tx).await.unwrap();

        let client = Client::new(UserData::named("Alice"), room.clone(), &AuthAvatar);
        let (conn, mut peer) = pair();
        let (stream, _sink) = conn.split();

        peer.say("hello");
        peer.say("again");
        peer.hang_up();
        client.read_pump(stream).await;

        let first = rx.recv().await.unwrap();
        assert_eq!(first.name, "Alice");
        assert_eq!(first.message, "hello");
        assert_eq!(rx.recv().await.unwrap().message, "again");
    }

    #[tokio::test]
    async fn test_write_pump_drains_then_closes() {
        let (conn, mut peer) = pair();
        let (_stream, sink) = conn.split();
        let (tx, rx) = mailbox(4);

        for body in ["one", "two"] {
            let msg = Message::stamp(InboundMessage::new(body), "Alice", String::new());
            tx.try_send(Arc::new(msg)).unwrap();
        }
        drop(tx);

        Client::write_pump(ClientId::new(), rx, sink).await;

        assert_eq!(peer.recv().await.unwrap().message, "one");
        assert_eq!(peer.recv().await.unwrap().message, "two");
        assert!(peer.recv().await.is_none());
    }
}
