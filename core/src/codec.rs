//! VAPID key codec
//!
//! The server publishes its application server key as URL-safe base64 without
//! padding. The push manager wants the raw bytes (a 65-byte uncompressed
//! P-256 point); a single wrong byte makes `subscribe` reject.

use crate::PushError;
use base64::{
    alphabet,
    engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, URL_SAFE_NO_PAD},
    engine::DecodePaddingMode,
    Engine,
};

/// Standard alphabet, decoding as leniently as the browser's `atob`.
const FORGIVING: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decode a base64url VAPID public key into raw bytes.
///
/// ASCII whitespace is ignored, as are non-zero bits in the last symbol.
pub fn decode_vapid_key(base64_url: &str) -> crate::Result<Vec<u8>> {
    let trimmed: String = base64_url
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let padding = "=".repeat((4 - trimmed.len() % 4) % 4);
    let standard: String = format!("{trimmed}{padding}")
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();

    FORGIVING
        .decode(standard.as_bytes())
        .map_err(|e| PushError::Codec(e.to_string()))
}

/// Encode raw key bytes as base64url without padding.
pub fn encode_vapid_key(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}
