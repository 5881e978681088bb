//! Coordinator-side assembly of the pulsewatch distributed monitoring
//! platform: wires peer membership, remote-check assignment and execution,
//! alerting, and the HTTP API into one process (see [`Coordinator`]).

mod coordinator;

pub use coordinator::Coordinator;
