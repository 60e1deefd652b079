//! Session token claims decoding.
//!
//! TRUST BOUNDARY
//! ==============
//! The payload segment is decoded without checking the signature. The
//! result is good for UI branching and for rejecting structurally broken
//! tokens early; it is never proof of who the user is. Authorization
//! decisions go through the backend (`GET /user/detail`).

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

/// Claims carried in a session token's payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Management role flag. Absent means non-management.
    #[serde(rename = "isGestao", default)]
    pub is_gestao: bool,
    /// Remaining backend-defined claims (`sub`, `exp`, ...).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Decode the payload of a `header.payload.signature` token.
///
/// Returns `None` for anything that is not a dot-separated token whose
/// second segment is base64url-encoded JSON object text.
#[must_use]
pub fn decode(token: &str) -> Option<Claims> {
    let mut segments = token.trim().split('.');
    let _header = segments.next().filter(|s| !s.is_empty())?;
    let payload = segments.next().filter(|s| !s.is_empty())?;

    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let value: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    if !value.is_object() {
        return None;
    }
    serde_json::from_value(value).ok()
}

#[cfg(test)]
#[path = "claims_test.rs"]
mod tests;
