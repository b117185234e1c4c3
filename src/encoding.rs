use base64::engine::{general_purpose::STANDARD as BASE64, Engine};
use log::trace;
use sha2::{Digest, Sha256};

/// Transport form of a document together with its integrity checksum.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedDocument {
    /// Standard base64 of the document bytes
    pub content: String,
    /// Base64 of the SHA-256 digest of `content`
    pub checksum: String,
}

/// Base64-encodes `bytes` and checksums the encoded text.
///
/// The digest is taken over the UTF-8 bytes of the base64 text, not over the
/// raw document. The signing service verifies exactly this value.
pub fn encode_document(bytes: &[u8]) -> EncodedDocument {
    let content = BASE64.encode(bytes);
    let checksum = checksum(&content);

    trace!(
        "Encoded {} bytes into {} base64 chars, checksum {checksum}",
        bytes.len(),
        content.len()
    );

    EncodedDocument { content, checksum }
}

/// Base64 SHA-256 of an already encoded payload.
pub fn checksum(encoded: &str) -> String {
    let digest = Sha256::digest(encoded.as_bytes());
    BASE64.encode(digest)
}
