//! Repository trait definitions (ports).
//!
//! These traits define the storage interface that the infrastructure layer
//! (randchat-infra) implements. The core crate never depends on any
//! specific storage technology.

pub mod talk;
pub mod user;
