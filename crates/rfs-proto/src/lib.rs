//! `rfs-proto` — the swarm coordination protocol.
//!
//! Every message on the broadcast channel is one variant of
//! [`SwarmMessage`], tagged by a `type` field in its JSON form and decoded
//! exactly once at the receive boundary.  A malformed inbound message
//! surfaces as a [`ProtoError`] for the receive loop to log and drop — it
//! must never crash the loop.

pub mod error;
pub mod message;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{ProtoError, ProtoResult};
pub use message::{
    Capabilities, Location, RoleAssignment, SwarmMessage, Velocity, decode, encode,
};
