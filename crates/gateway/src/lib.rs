//! Gateway: HTTP + WebSocket server for the padlink relay.
//!
//! Lifecycle:
//! 1. Load config, bind address
//! 2. Build router (health, session API, optional static front-end)
//! 3. Attach WebSocket upgrade handler
//! 4. Spawn the session expiry sweeper
//!
//! Membership and routing live in `padlink-sessions`; this crate parses
//! frames, drives per-connection registration, and delegates.

pub mod server;
pub mod state;
pub mod ws;
