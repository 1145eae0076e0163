//! Infrastructure layer for randchat.
//!
//! Contains implementations of the ports defined in `randchat-core`:
//! SQLite storage, the config loader, data directory resolution and the
//! built-in translation tables.

pub mod config;
pub mod filesystem;
pub mod i18n;
pub mod sqlite;
