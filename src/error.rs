use std::{io, path::PathBuf};

/// Failures of a signing transaction, one variant per stage failure kind.
#[derive(Debug, thiserror::Error)]
pub enum SignError {
    #[error("invalid configuration: {}", .0.join("; "))]
    Config(Vec<String>),
    #[error("snapshot already exists: {}", .0.display())]
    AlreadyExists(PathBuf),
    #[error("failed to build signing assertion: {0}")]
    Assertion(String),
    #[error("failed to reach signing service: {0}")]
    Network(#[source] reqwest::Error),
    #[error("signing service returned status {status}: {body}")]
    SigningService { status: u16, body: String },
    #[error("signing service response has no signed content")]
    EmptyResponse,
    #[error("malformed signing service response: {0}")]
    MalformedResponse(String),
    #[error("malformed signed artifact: {0}")]
    MalformedArtifact(String),
    #[error("cannot derive output path from '{}': file name has no '.json' suffix", .0.display())]
    OutputPath(PathBuf),
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SignError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = SignError> = std::result::Result<T, E>;
