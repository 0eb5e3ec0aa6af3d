//! Room trace sink
//!
//! A human-readable record of what the room did. Separate from `tracing`
//! logging: tracers are injected into the room and the default is [`Off`].
//!
//! Implementations must not block; `trace` is called from inside the
//! room's control loop.

use std::io::Write;
use std::sync::{Arc, Mutex};

/// Appends human-readable event records
pub trait Tracer: Send + Sync {
    fn trace(&self, record: &str);
}

/// Shared tracer handle as held by the room
pub type SharedTracer = Arc<dyn Tracer>;

/// Tracer that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct Off;

impl Tracer for Off {
    fn trace(&self, _record: &str) {}
}

/// Tracer that writes one line per record to an `io::Write`
pub struct WriterTracer<W> {
    out: Mutex<W>,
}

impl<W: Write + Send> WriterTracer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }
}

impl<W: Write + Send> Tracer for WriterTracer<W> {
    fn trace(&self, record: &str) {
        // A poisoned or failing writer only loses trace output
        if let Ok(mut out) = self.out.lock() {
            let _ = writeln!(out, "{}", record);
        }
    }
}

/// Tracer that forwards records as `tracing` events
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTracer;

impl Tracer for LogTracer {
    fn trace(&self, record: &str) {
        tracing::info!(target: "chat_room::trace", "{}", record);
    }
}

/// No-op tracer, the room default
pub fn off() -> SharedTracer {
    Arc::new(Off)
}

/// Tracer writing to stdout
pub fn stdout() -> SharedTracer {
    Arc::new(WriterTracer::new(std::io::stdout()))
}
