//! Room actor implementation
//!
//! The room owns the set of connected clients and is the only code that
//! ever touches it. Joins, leaves and broadcasts arrive as [`RoomEvent`]s on
//! a single queue and are processed one at a time, to completion, by
//! [`Room::run`]. No locks needed - all state access goes through message
//! passing.
//!
//! Fan-out never blocks: a client whose mailbox is full (or whose write
//! pump is gone) is evicted instead of stalling everybody else. Eviction is
//! terminal; the client's [`Departure`] resolves so its connection can be
//! torn down.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::config::{EchoPolicy, RoomConfig};
use crate::error::AppError;
use crate::message::Message;
use crate::trace::{self, SharedTracer};
use crate::types::ClientId;

/// Room → client write pump queue
pub type Mailbox = mpsc::Receiver<Arc<Message>>;

/// Producer end of a mailbox, held only by the room once the client joins
pub type MailboxSender = mpsc::Sender<Arc<Message>>;

/// Create a bounded mailbox
pub fn mailbox(capacity: usize) -> (MailboxSender, Mailbox) {
    mpsc::channel(capacity)
}

/// Resolves once the room has dropped a member, by leave or eviction
#[derive(Debug)]
pub struct Departure(oneshot::Receiver<()>);

impl Departure {
    pub async fn wait(self) {
        // Nothing is ever sent; the sender is dropped with the member
        let _ = self.0.await;
    }
}

/// A registered client as held by the room
struct Member {
    mailbox: MailboxSender,
    _departure: oneshot::Sender<()>,
}

/// Events sent from clients to the Room actor
#[derive(Debug)]
pub enum RoomEvent {
    /// Register a client; acknowledged once it is a member
    Join {
        client_id: ClientId,
        mailbox: MailboxSender,
        departure: oneshot::Sender<()>,
        joined: oneshot::Sender<()>,
    },
    /// Unregister a client and close its mailbox
    Leave {
        client_id: ClientId,
        left: Option<oneshot::Sender<()>>,
    },
    /// Fan a message out to every member
    Broadcast {
        from: ClientId,
        message: Arc<Message>,
    },
    /// Snapshot of current members
    Members {
        reply: oneshot::Sender<Vec<ClientId>>,
    },
}

/// The Room actor
///
/// Created together with its [`RoomHandle`] by [`Room::new`]; runs until
/// every handle has been dropped.
pub struct Room {
    /// Registered clients: ClientId -> member
    clients: HashMap<ClientId, Member>,
    /// Event receiver channel
    events: mpsc::Receiver<RoomEvent>,
    /// Operation trace sink
    tracer: SharedTracer,
    /// Whether senders receive their own messages
    echo: EchoPolicy,
}

impl Room {
    /// Create a room and the handle used to reach it
    pub fn new(config: &RoomConfig) -> (Self, RoomHandle) {
        let (tx, rx) = mpsc::channel(config.event_buffer.max(1));
        let room = Self {
            clients: HashMap::new(),
            events: rx,
            tracer: trace::off(),
            echo: config.echo,
        };
        (room, RoomHandle { events: tx })
    }

    /// Replace the trace sink
    pub fn with_tracer(mut self, tracer: SharedTracer) -> Self {
        self.tracer = tracer;
        self
    }

    /// Run the control loop
    ///
    /// Continuously receives and processes events until all handles are dropped.
    pub async fn run(mut self) {
        info!("Room started");

        while let Some(event) = self.events.recv().await {
            self.handle_event(event);
        }

        info!("Room shutting down");
    }

    /// Process a single event
    ///
    /// Synchronous on purpose: nothing in here may wait on a client.
    fn handle_event(&mut self, event: RoomEvent) {
        match event {
            RoomEvent::Join {
                client_id,
                mailbox,
                departure,
                joined,
            } => {
                self.handle_join(
                    client_id,
                    Member {
                        mailbox,
                        _departure: departure,
                    },
                );
                let _ = joined.send(());
            }
            RoomEvent::Leave { client_id, left } => {
                self.handle_leave(client_id);
                if let Some(left) = left {
                    let _ = left.send(());
                }
            }
            RoomEvent::Broadcast { from, message } => {
                self.handle_broadcast(from, message);
            }
            RoomEvent::Members { reply } => {
                let _ = reply.send(self.clients.keys().copied().collect());
            }
        }
    }

    fn handle_join(&mut self, client_id: ClientId, member: Member) {
        self.clients.insert(client_id, member);
        self.tracer.trace("New client joined");
        info!("Client {} joined", client_id);
        debug!("Total clients: {}", self.clients.len());
    }

    /// Removing the entry drops the only mailbox sender, which closes the
    /// mailbox, and resolves the client's departure.
    /// A client that was already evicted is simply not found.
    fn handle_leave(&mut self, client_id: ClientId) {
        if self.clients.remove(&client_id).is_some() {
            self.tracer.trace("Client left");
            info!("Client {} left", client_id);
            debug!("Total clients: {}", self.clients.len());
        } else {
            debug!("Leave for unregistered client {} ignored", client_id);
        }
    }

    fn handle_broadcast(&mut self, from: ClientId, message: Arc<Message>) {
        let tracer = &self.tracer;
        let echo = self.echo;

        tracer.trace(&format!("Message received: {}", message.message));

        self.clients.retain(|&client_id, member| {
            if echo == EchoPolicy::ExcludeSender && client_id == from {
                return true;
            }
            match member.mailbox.try_send(Arc::clone(&message)) {
                Ok(()) => {
                    tracer.trace(" -- sent to client");
                    true
                }
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracer.trace(" -- failed to send, cleaning up client");
                    info!("Client {} evicted (mailbox full)", client_id);
                    false
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracer.trace(" -- failed to send, cleaning up client");
                    debug!("Client {} evicted (write pump gone)", client_id);
                    false
                }
            }
        });

        debug!("Fan-out from {} complete, {} members", from, self.clients.len());
    }
}

/// Cloneable handle for submitting events to a running [`Room`]
#[derive(Debug, Clone)]
pub struct RoomHandle {
    events: mpsc::Sender<RoomEvent>,
}

impl RoomHandle {
    /// Register a client, returning once the room has accepted it
    ///
    /// The room becomes the sole owner of `mailbox`. The returned
    /// [`Departure`] resolves when the client is no longer a member.
    pub async fn join(
        &self,
        client_id: ClientId,
        mailbox: MailboxSender,
    ) -> Result<Departure, AppError> {
        let (joined, ack) = oneshot::channel();
        let (departure, departed) = oneshot::channel();
        self.send(RoomEvent::Join {
            client_id,
            mailbox,
            departure,
            joined,
        })
        .await?;
        ack.await.map_err(|_| AppError::RoomClosed)?;
        Ok(Departure(departed))
    }

    /// Unregister a client, returning once the room has processed the leave
    pub async fn leave(&self, client_id: ClientId) -> Result<(), AppError> {
        let (left, ack) = oneshot::channel();
        self.send(RoomEvent::Leave {
            client_id,
            left: Some(left),
        })
        .await?;
        ack.await.map_err(|_| AppError::RoomClosed)
    }

    /// Submit a leave without waiting, for use where awaiting is impossible
    ///
    /// Falls back to a spawned send if the event queue is full.
    pub fn leave_detached(&self, client_id: ClientId) {
        let event = RoomEvent::Leave {
            client_id,
            left: None,
        };
        match self.events.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                match tokio::runtime::Handle::try_current() {
                    Ok(runtime) => {
                        let events = self.events.clone();
                        runtime.spawn(async move {
                            let _ = events.send(event).await;
                        });
                    }
                    Err(_) => {
                        debug!("No runtime to submit leave for {}, dropped", client_id);
                    }
                }
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("Room closed before detached leave for {}", client_id);
            }
        }
    }

    /// Submit a message for fan-out
    ///
    /// Waits only for queue space, not for delivery.
    pub async fn broadcast(&self, from: ClientId, message: Arc<Message>) -> Result<(), AppError> {
        self.send(RoomEvent::Broadcast { from, message }).await
    }

    /// Current members, as seen by the control loop
    pub async fn members(&self) -> Result<Vec<ClientId>, AppError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomEvent::Members { reply }).await?;
        rx.await.map_err(|_| AppError::RoomClosed)
    }

    async fn send(&self, event: RoomEvent) -> Result<(), AppError> {
        self.events
            .send(event)
            .await
            .map_err(|_| AppError::RoomClosed)
    }
}
