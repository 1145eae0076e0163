//! Shared domain types for randchat.
//!
//! This crate contains the domain types used across the randchat service:
//! User, Talk, the matching attributes (sex, languages, invitation) and
//! their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod error;
pub mod invitation;
pub mod language;
pub mod message;
pub mod sex;
pub mod talk;
pub mod user;
