//! Conditional responses (`ETag` / `If-None-Match`)
//!
//! The validator is a SHA-256 fingerprint of the response bytes, so the same
//! payload gets the same tag in every process.

use bytes::Bytes;
use sha2::{Digest, Sha256};

/// Result of negotiating a response against a client validator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conditional {
    /// Client copy is missing or stale; send the body
    Fresh { body: Bytes, validator: String },
    /// Client copy is current; send no body
    NotModified { validator: String },
}

/// Entity tag for `data`, quoted as sent in the `ETag` header
pub fn fingerprint(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("\"sha256-{}\"", hex::encode(hasher.finalize()))
}

/// Decide between a full response and `304 Not Modified`
pub fn respond(request_validator: Option<&str>, payload: Bytes) -> Conditional {
    let validator = fingerprint(&payload);

    match request_validator {
        Some(header) if matches_any(header, &validator) => Conditional::NotModified { validator },
        _ => Conditional::Fresh {
            body: payload,
            validator,
        },
    }
}

/// `If-None-Match` may list several tags, quoted or not, weak or strong
fn matches_any(header: &str, validator: &str) -> bool {
    let current = validator.trim_matches('"');
    header
        .split(',')
        .map(|tag| tag.trim())
        .map(|tag| tag.strip_prefix("W/").unwrap_or(tag))
        .map(|tag| tag.trim_matches('"'))
        .any(|tag| !tag.is_empty() && tag == current)
}
