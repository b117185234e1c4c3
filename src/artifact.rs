use std::{
    fs,
    path::{Path, PathBuf},
};

use base64::engine::{general_purpose::STANDARD as BASE64, Engine};
use log::{debug, info};
use serde::Deserialize;

use crate::error::{Result, SignError};

const JSON_SUFFIX: &str = ".json";
const SIGNED_SUFFIX: &str = "-firmado.json";

/// Signed document extracted from the service envelope.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct SignedArtifact {
    pub jws: String,
}

impl SignedArtifact {
    /// Decodes the base64 envelope returned for a signed file.
    pub fn decode(content: &str) -> Result<Self> {
        let bytes = BASE64
            .decode(content.trim())
            .map_err(|e| SignError::MalformedArtifact(format!("invalid base64: {e}")))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| SignError::MalformedArtifact(format!("invalid envelope: {e}")))
    }
}

/// Path of the signed output for `snapshot`: `<name>.json` becomes `<name>-firmado.json`.
///
/// A file name without a `.json` suffix is rejected with [`SignError::OutputPath`].
pub fn output_path(snapshot: &Path) -> Result<PathBuf> {
    let stem = snapshot
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.strip_suffix(JSON_SUFFIX))
        .filter(|stem| !stem.is_empty())
        .ok_or_else(|| SignError::OutputPath(snapshot.to_path_buf()))?;

    Ok(snapshot.with_file_name(format!("{stem}{SIGNED_SUFFIX}")))
}

/// Decodes `content` and writes its signed document next to the snapshot,
/// replacing any previous output.
///
/// # Returns
///
/// The path written.
pub fn write_artifact(snapshot: &Path, content: &str) -> Result<PathBuf> {
    let output = output_path(snapshot)?;
    let artifact = SignedArtifact::decode(content)?;

    debug!(
        "Writing {} bytes of signed document to {}",
        artifact.jws.len(),
        output.display()
    );
    fs::write(&output, artifact.jws.as_bytes()).map_err(|e| SignError::io(&output, e))?;
    info!("Signed document written to {}", output.display());

    Ok(output)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn envelope(jws: &str) -> String {
        BASE64.encode(serde_json::to_vec(&json!({ "jws": jws })).unwrap())
    }

    #[test]
    fn output_path_replaces_json_suffix() {
        assert_eq!(
            output_path(Path::new("/data/20240307090501-ejemplo.json")).unwrap(),
            PathBuf::from("/data/20240307090501-ejemplo-firmado.json")
        );
    }

    #[test]
    fn output_path_only_touches_file_name() {
        assert_eq!(
            output_path(Path::new("/data.json/dir/a.json")).unwrap(),
            PathBuf::from("/data.json/dir/a-firmado.json")
        );
    }

    #[test]
    fn output_path_without_json_suffix_is_rejected() {
        for path in ["/data/ejemplo.txt", "/data/ejemplo.json.bak", "/data/.json", "/"] {
            assert!(
                matches!(output_path(Path::new(path)), Err(SignError::OutputPath(_))),
                "{path}"
            );
        }
    }

    #[test]
    fn written_file_is_exact_jws_text() {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = tempfile::tempdir().unwrap();
        let snapshot = dir.path().join("20240307090501-ejemplo.json");
        let jws = "eyJhbGciOiJSUzI1NiJ9.eyJhIjoxfQ.c2lnbmF0dXJl";

        let written = write_artifact(&snapshot, &envelope(jws)).unwrap();

        assert_eq!(written, dir.path().join("20240307090501-ejemplo-firmado.json"));
        assert_eq!(fs::read_to_string(written).unwrap(), jws);
    }

    #[test]
    fn existing_output_is_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = dir.path().join("a.json");
        fs::write(dir.path().join("a-firmado.json"), "old contents that are longer").unwrap();

        let written = write_artifact(&snapshot, &envelope("X")).unwrap();

        assert_eq!(fs::read_to_string(written).unwrap(), "X");
    }

    #[test]
    fn undecodable_content_is_malformed_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = dir.path().join("a.json");

        for content in [
            "%%% not base64 %%%".to_owned(),
            BASE64.encode("not json"),
            BASE64.encode(r#"{"other": "field"}"#),
        ] {
            let result = write_artifact(&snapshot, &content);
            assert!(
                matches!(result, Err(SignError::MalformedArtifact(_))),
                "{content}: {result:?}"
            );
        }
        assert!(!dir.path().join("a-firmado.json").exists());
    }
}
