//! Server and room configuration
//!
//! `Cli` is the command line surface of the binary; it resolves into a
//! `ServerConfig` which the library consumes.

use std::sync::Arc;

use clap::{Parser, ValueEnum};

use crate::avatar::{AuthAvatar, Avatar, GravatarAvatar};
use crate::trace::{self, LogTracer, SharedTracer};

/// Default server address
pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";

/// Per-client mailbox capacity
pub const MESSAGE_BUFFER_SIZE: usize = 256;

/// Room event queue depth
pub const EVENT_BUFFER_SIZE: usize = 256;

/// WebSocket write buffer size
pub const SOCKET_BUFFER_SIZE: usize = 1024;

/// Whether a sender receives its own broadcast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EchoPolicy {
    /// Deliver to every member, sender included
    #[default]
    All,
    /// Deliver to every member except the sender
    ExcludeSender,
}

/// Room tuning
#[derive(Debug, Clone)]
pub struct RoomConfig {
    pub mailbox_capacity: usize,
    pub event_buffer: usize,
    pub echo: EchoPolicy,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: MESSAGE_BUFFER_SIZE,
            event_buffer: EVENT_BUFFER_SIZE,
            echo: EchoPolicy::All,
        }
    }
}

/// Avatar lookup strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum AvatarKind {
    /// Use the avatar URL from the auth cookie
    #[default]
    Auth,
    /// Derive a Gravatar URL from the user's email
    Gravatar,
}

impl AvatarKind {
    pub fn build(self) -> Arc<dyn Avatar> {
        match self {
            AvatarKind::Auth => Arc::new(AuthAvatar),
            AvatarKind::Gravatar => Arc::new(GravatarAvatar),
        }
    }
}

/// Where room trace records go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TraceKind {
    /// Discard them
    #[default]
    Off,
    /// One line per record on stdout
    Stdout,
    /// As `tracing` events under the `chat_room::trace` target
    Log,
}

impl TraceKind {
    pub fn build(self) -> SharedTracer {
        match self {
            TraceKind::Off => trace::off(),
            TraceKind::Stdout => trace::stdout(),
            TraceKind::Log => Arc::new(LogTracer),
        }
    }
}

/// Everything the server needs to start
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: String,
    pub socket_buffer_size: usize,
    pub trace: TraceKind,
    pub avatar: AvatarKind,
    pub room: RoomConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            socket_buffer_size: SOCKET_BUFFER_SIZE,
            trace: TraceKind::Off,
            avatar: AvatarKind::Auth,
            room: RoomConfig::default(),
        }
    }
}

/// Single-room WebSocket chat server
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Cli {
    /// Address to listen on
    #[arg(long, default_value = DEFAULT_ADDR)]
    pub addr: String,

    /// Messages buffered per client before it is disconnected
    #[arg(long, default_value_t = MESSAGE_BUFFER_SIZE)]
    pub mailbox_capacity: usize,

    /// Room event queue depth
    #[arg(long, default_value_t = EVENT_BUFFER_SIZE)]
    pub event_buffer: usize,

    /// WebSocket write buffer size in bytes
    #[arg(long, default_value_t = SOCKET_BUFFER_SIZE)]
    pub socket_buffer_size: usize,

    /// Do not send a client its own messages
    #[arg(long)]
    pub no_echo: bool,

    /// Where room trace records go
    #[arg(long, value_enum, default_value_t = TraceKind::Off)]
    pub trace: TraceKind,

    /// Avatar lookup strategy
    #[arg(long, value_enum, default_value_t = AvatarKind::Auth)]
    pub avatar: AvatarKind,
}

impl From<Cli> for ServerConfig {
    fn from(cli: Cli) -> Self {
        Self {
            addr: cli.addr,
            socket_buffer_size: cli.socket_buffer_size,
            trace: cli.trace,
            avatar: cli.avatar,
            room: RoomConfig {
                // Zero would make every member look slow
                mailbox_capacity: cli.mailbox_capacity.max(1),
                event_buffer: cli.event_buffer.max(1),
                echo: if cli.no_echo {
                    EchoPolicy::ExcludeSender
                } else {
                    EchoPolicy::All
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let config: ServerConfig = Cli::try_parse_from(["chat_room"]).unwrap().into();

        assert_eq!(config.addr, DEFAULT_ADDR);
        assert_eq!(config.socket_buffer_size, SOCKET_BUFFER_SIZE);
        assert_eq!(config.room.mailbox_capacity, MESSAGE_BUFFER_SIZE);
        assert_eq!(config.room.echo, EchoPolicy::All);
        assert_eq!(config.avatar, AvatarKind::Auth);
        assert_eq!(config.trace, TraceKind::Off);
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::try_parse_from([
            "chat_room",
            "--addr",
            "0.0.0.0:9000",
            "--mailbox-capacity",
            "0",
            "--no-echo",
            "--trace",
            "log",
            "--avatar",
            "gravatar",
        ])
        .unwrap();
        let config = ServerConfig::from(cli);

        assert_eq!(config.addr, "0.0.0.0:9000");
        assert_eq!(config.room.mailbox_capacity, 1);
        assert_eq!(config.room.echo, EchoPolicy::ExcludeSender);
        assert_eq!(config.avatar, AvatarKind::Gravatar);
        assert_eq!(config.trace, TraceKind::Log);
    }
}
