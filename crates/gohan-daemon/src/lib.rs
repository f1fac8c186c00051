//! gohan-daemon library target.
//!
//! Exposes the router and shared state for integration tests; the binary
//! `main.rs` wires everything (config, collaborators, long-lived tasks) and
//! depends on this library only for the liveness route.

pub mod routes;
pub mod state;
pub mod wiring;
