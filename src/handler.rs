//! Connection registration
//!
//! Turns an accepted connection into a room member: identify, create the
//! client, join, run both pumps, leave. The lifetime of
//! [`ChatRoom::serve`] is the client's registered lifetime.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::avatar::Avatar;
use crate::client::Client;
use crate::config::ServerConfig;
use crate::connection::Connection;
use crate::error::AppError;
use crate::identity::{AuthCookie, IdentityExtractor};
use crate::room::{mailbox, Room, RoomHandle};
use crate::types::{ClientId, UserData};
use crate::ws;

/// The room as a connection handler
///
/// Cheap to clone; every clone talks to the same room.
#[derive(Clone)]
pub struct ChatRoom {
    room: RoomHandle,
    identity: Arc<dyn IdentityExtractor>,
    avatar: Arc<dyn Avatar>,
    mailbox_capacity: usize,
    socket_buffer_size: usize,
}

impl ChatRoom {
    /// Spawn the room's control loop and return a handler for it
    pub fn start(config: &ServerConfig) -> (Self, JoinHandle<()>) {
        let (room, handle) = Room::new(&config.room);
        let task = tokio::spawn(room.with_tracer(config.trace.build()).run());

        let chat = Self {
            room: handle,
            identity: Arc::new(AuthCookie),
            avatar: config.avatar.build(),
            mailbox_capacity: config.room.mailbox_capacity,
            socket_buffer_size: config.socket_buffer_size,
        };
        (chat, task)
    }

    pub fn room(&self) -> &RoomHandle {
        &self.room
    }

    /// Handle a raw transport connection
    ///
    /// Performs the WebSocket upgrade, identifying the user from the
    /// request, then serves the client until it leaves. Upgrade and
    /// identity failures abort this connection only.
    pub async fn handle_connection<S>(&self, stream: S) -> Result<(), AppError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (conn, user) = ws::accept(stream, self.identity.as_ref(), self.socket_buffer_size)
            .await
            .inspect_err(|e| warn!("Rejected connection: {}", e))?;

        self.serve(conn, user).await
    }

    /// Register an established connection and run it to completion
    pub async fn serve<C: Connection>(&self, conn: C, user: UserData) -> Result<(), AppError> {
        let client = Client::new(user, self.room.clone(), self.avatar.as_ref());
        let (stream, sink) = conn.split();
        let (tx, rx) = mailbox(self.mailbox_capacity);

        let departure = self.room.join(client.id, tx).await?;
        let membership = Membership::new(&self.room, client.id);
        info!("Client {} ({}) connected", client.id, client.user.name);

        let mut write_task = tokio::spawn(Client::write_pump(client.id, rx, sink));

        // Whichever side finishes first ends the client. Dropping the read
        // pump drops the connection's read half with it.
        let exit = tokio::select! {
            _ = client.read_pump(stream) => PumpExit::ReadEnded,
            result = &mut write_task => {
                if let Err(e) = result {
                    warn!("Write pump for {} failed: {}", client.id, e);
                }
                PumpExit::WriteEnded
            }
            _ = departure.wait() => PumpExit::Evicted,
        };

        membership.leave().await;
        match exit {
            PumpExit::ReadEnded => {
                // Leaving closed the mailbox, so the write pump drains and stops
                if let Err(e) = write_task.await {
                    warn!("Write pump for {} failed: {}", client.id, e);
                }
            }
            PumpExit::WriteEnded => {}
            PumpExit::Evicted => {
                // The peer may never drain a pending send
                write_task.abort();
                info!("Client {} ({}) evicted", client.id, client.user.name);
            }
        }

        info!("Client {} ({}) disconnected", client.id, client.user.name);
        Ok(())
    }
}

/// Why a served client stopped
enum PumpExit {
    /// Connection closed or failed on the read side
    ReadEnded,
    /// Write side failed or finished
    WriteEnded,
    /// The room dropped the client
    Evicted,
}

/// Guaranteed leave for a joined client
///
/// `leave` waits for the room to process it. If the guard is dropped
/// without that (the serving future was cancelled or panicked), the leave
/// is submitted without waiting.
struct Membership<'a> {
    room: &'a RoomHandle,
    client_id: ClientId,
    joined: bool,
}

impl<'a> Membership<'a> {
    fn new(room: &'a RoomHandle, client_id: ClientId) -> Self {
        Self {
            room,
            client_id,
            joined: true,
        }
    }

    async fn leave(mut self) {
        self.joined = false;
        if self.room.leave(self.client_id).await.is_err() {
            debug!("Room already closed when {} left", self.client_id);
        }
    }
}

impl Drop for Membership<'_> {
    fn drop(&mut self) {
        if self.joined {
            self.room.leave_detached(self.client_id);
        }
    }
}
