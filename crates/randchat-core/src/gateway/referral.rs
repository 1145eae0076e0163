//! Referral links.
//!
//! A referral link is the configured prefix followed by a start argument:
//! base64 of the JSON object `{"i": "<invitation>"}`.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use randchat_types::config::GlobalConfig;
use randchat_types::invitation::Invitation;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct StartArgs {
    #[serde(rename = "i")]
    invitation: Option<String>,
}

/// Encode an invitation token as a start argument.
pub fn start_args(invitation: &str) -> String {
    let payload = StartArgs {
        invitation: Some(invitation.to_string()),
    };
    // Serializing a struct of strings cannot fail.
    let json = serde_json::to_string(&payload).unwrap_or_default();
    STANDARD.encode(json)
}

/// Extract the invitation token from a start argument.
///
/// Accepts standard and URL-safe alphabets. Returns `None` for anything
/// that does not decode to an object with an `i` string.
pub fn decode_start_args(args: &str) -> Option<String> {
    let args = args.trim();
    let bytes = STANDARD
        .decode(args)
        .or_else(|_| URL_SAFE.decode(args))
        .ok()?;
    serde_json::from_slice::<StartArgs>(&bytes).ok()?.invitation
}

/// The shareable link for a user's invitation.
pub fn invite_link(config: &GlobalConfig, invitation: &Invitation) -> String {
    format!("{}{}", config.invite_link_prefix, start_args(invitation.as_str()))
}
