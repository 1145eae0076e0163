//! Chat roulette business logic and port definitions for RandChat.
//!
//! This crate defines the "ports" (repository, transport and localization
//! traits) that the infrastructure layer implements. It depends only on
//! `randchat-types` -- never on `randchat-infra` or any database/IO crate.

pub mod directory;
pub mod gateway;
pub mod i18n;
pub mod lifecycle;
pub mod locks;
pub mod matcher;
pub mod pairing;
pub mod repository;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;
