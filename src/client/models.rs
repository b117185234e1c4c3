use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::encoding::EncodedDocument;

/// Content type declared for every JSON document sent for signing.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Body of a sign request.
#[derive(Clone, Debug, Serialize)]
pub struct SignRequest {
    /// Compact signing assertion
    pub token: String,
    pub api_token_key: String,
    /// Documents to sign, in order
    pub files: Vec<FileEntry>,
}

impl SignRequest {
    pub fn new(token: String, api_token_key: String) -> Self {
        Self {
            token,
            api_token_key,
            files: Vec::new(),
        }
    }

    pub fn with_file(mut self, file: FileEntry) -> Self {
        self.files.push(file);
        self
    }
}

/// One document inside a [`SignRequest`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    #[serde(rename = "content-type")]
    pub content_type: String,
    pub description: String,
    /// Checksum over exactly the text in `content`
    pub checksum: String,
    /// Base64 document
    pub content: String,
}

impl FileEntry {
    /// JSON document entry described by `description`, usually the original file name.
    pub fn json(description: impl Into<String>, document: EncodedDocument) -> Self {
        let EncodedDocument { content, checksum } = document;
        Self {
            content_type: JSON_CONTENT_TYPE.to_owned(),
            description: description.into(),
            checksum,
            content,
        }
    }
}

/// Successful response of the signing service.
///
/// Only `files[].content` is used to continue the transaction. Every other
/// field is informational and tolerates nulls and loosely typed values.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SignResponse {
    pub files: Vec<FileResult>,
    #[serde(default, deserialize_with = "lenient_metadata")]
    pub metadata: Option<ResponseMetadata>,
    #[serde(rename = "idSolicitud", default, deserialize_with = "lenient_i64")]
    pub request_id: Option<i64>,
}

/// Per-document result.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResult {
    /// Base64 of the signed envelope
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub content_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub document_status: Option<String>,
    #[serde(rename = "checksum_original", default, deserialize_with = "lenient_string")]
    pub checksum_original: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    #[serde(default, deserialize_with = "lenient_bool")]
    pub otp_expired: Option<bool>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub files_signed: Option<u32>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub signed_failed: Option<u32>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub objects_received: Option<u32>,
}

/// Strings as-is, numbers and booleans as their JSON text, null as `None`.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Integers or quoted integers; anything else is `None`.
fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(as_i64(&Value::deserialize(deserializer)?))
}

fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(as_i64(&Value::deserialize(deserializer)?).and_then(|n| u32::try_from(n).ok()))
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => Some(b),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_metadata<'de, D>(deserializer: D) -> Result<Option<ResponseMetadata>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        value @ Value::Object(_) => serde_json::from_value(value).ok(),
        _ => None,
    })
}
