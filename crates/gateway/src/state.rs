use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use padlink_sessions::SessionRegistry;

/// Shared gateway runtime state, wrapped in Arc for use across async tasks.
pub struct GatewayState {
    /// All live sessions.
    pub registry: SessionRegistry,
    /// Currently open WebSocket connections, registered or not.
    connections: AtomicUsize,
    /// Server version string.
    pub version: String,
    /// Hostname for the startup banner.
    pub hostname: String,
}

impl GatewayState {
    pub fn new() -> Arc<Self> {
        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "unknown".into());

        Arc::new(Self {
            registry: SessionRegistry::new(),
            connections: AtomicUsize::new(0),
            version: env!("CARGO_PKG_VERSION").to_string(),
            hostname,
        })
    }

    /// Record a newly accepted connection; returns the new total.
    pub fn connection_opened(&self) -> usize {
        self.connections.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Record a closed connection; returns the new total.
    pub fn connection_closed(&self) -> usize {
        self.connections
            .fetch_sub(1, Ordering::Relaxed)
            .saturating_sub(1)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::Relaxed)
    }
}
