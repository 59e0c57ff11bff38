//! Image encoding: raw upload bytes → base64 inline data.
//!
//! The Generative Language API accepts images embedded in the JSON request
//! body as `inlineData { mimeType, data }` with standard (padded) base64.
//! The upload is forwarded as-is: re-encoding would cost CPU and could strip
//! detail the model needs.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use tracing::debug;

/// Base64 payload ready to be embedded in a request part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

/// Encode raw image bytes for the wire.
pub fn encode_inline(mime_type: &str, bytes: &[u8]) -> InlineData {
    let data = STANDARD.encode(bytes);
    debug!("Encoded {} → {} bytes base64", mime_type, data.len());
    InlineData {
        mime_type: mime_type.to_string(),
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_keeps_mime_and_decodes_back() {
        let raw = [0x89u8, b'P', b'N', b'G', 0, 1, 2, 3];
        let data = encode_inline("image/png", &raw);
        assert_eq!(data.mime_type, "image/png");
        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        assert_eq!(decoded, raw);
    }

    #[test]
    fn wire_shape_is_camel_case() {
        let json = serde_json::to_value(encode_inline("image/jpeg", b"abc")).unwrap();
        assert_eq!(json["mimeType"], "image/jpeg");
        assert_eq!(json["data"], "YWJj");
    }
}
