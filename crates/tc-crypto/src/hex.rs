//! Lowercase hex encoding and decoding.

use crate::error::CryptoError;

/// Encode bytes as lowercase hex.
pub fn encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Decode a hex string of any even length. Accepts upper or lower case.
pub fn decode(hex: &str) -> Result<Vec<u8>, CryptoError> {
    let hex = hex.trim();
    if hex.len() % 2 != 0 {
        return Err(CryptoError::Hex("hex string must have even length".into()));
    }
    if !hex.is_ascii() {
        return Err(CryptoError::Hex("hex string must be ASCII".into()));
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|e| CryptoError::Hex(format!("invalid hex at position {i}: {e}")))
        })
        .collect()
}

/// Decode exactly `N` bytes.
pub fn decode_array<const N: usize>(hex: &str) -> Result<[u8; N], CryptoError> {
    let bytes = decode(hex)?;
    bytes.try_into().map_err(|v: Vec<u8>| {
        CryptoError::Hex(format!("expected {N} bytes, got {}", v.len()))
    })
}

/// Whether `s` is a 64-char hex digest.
pub fn is_hex_32(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit())
}
