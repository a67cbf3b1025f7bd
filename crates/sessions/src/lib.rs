//! Session-scoped connection relay: membership, routing, expiry.
//!
//! A [`Session`] owns the controller/game membership for one game instance
//! and routes controller input to that instance's game clients. The
//! [`SessionRegistry`] owns every live session behind a synchronized map and
//! garbage-collects abandoned ones. Transport concerns (sockets, frame
//! parsing) live in the gateway crate; this crate only ever sees
//! [`ClientHandle`]s.

pub mod registry;
pub mod session;

pub use {
    registry::SessionRegistry,
    session::{ClientHandle, Session},
};
