use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local};
use log::{debug, info, warn};

use crate::{
    artifact,
    assertion::AssertionIssuer,
    client::{FileEntry, SignRequest, SignResponse, SigningClient},
    config::Config,
    encoding::encode_document,
    error::SignError,
    snapshot::{self, Snapshot},
};

/// Progress of a signing transaction. Each state is entered only after the
/// previous stage succeeded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    Start,
    Snapshotted,
    Encoded,
    Assertioned,
    Requested,
    Received,
    Written,
    Done,
}

impl State {
    /// Stage attempted when leaving this state.
    pub fn next_stage(self) -> &'static str {
        match self {
            State::Start => "snapshot",
            State::Snapshotted => "encode",
            State::Encoded => "assertion",
            State::Assertioned => "request",
            State::Requested => "response",
            State::Received => "write",
            State::Written | State::Done => "finish",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A failed transaction: the last state reached and the error that stopped it.
#[derive(Debug, thiserror::Error)]
#[error("{} stage failed after {state}: {error}", .state.next_stage())]
pub struct PipelineError {
    pub state: State,
    #[source]
    pub error: SignError,
}

/// Result of a completed transaction.
#[derive(Clone, Debug)]
pub struct SignOutcome {
    pub snapshot: Snapshot,
    pub output_path: PathBuf,
    /// Request id assigned by the signing service, when it sent one
    pub request_id: Option<i64>,
}

/// Runs one signing transaction per call, stage by stage.
pub struct Pipeline {
    api_token_key: String,
    issuer: AssertionIssuer,
    client: SigningClient,
}

struct Tracker {
    state: State,
}

impl Tracker {
    fn advance(&mut self, to: State) {
        debug!("{} -> {to}", self.state);
        self.state = to;
    }

    fn fail(&self, error: SignError) -> PipelineError {
        PipelineError {
            state: self.state,
            error,
        }
    }
}

impl Pipeline {
    pub fn new(config: &Config) -> Result<Self, SignError> {
        Ok(Self {
            api_token_key: config.api_token_key.clone(),
            issuer: AssertionIssuer::new(config),
            client: SigningClient::new(config)?,
        })
    }

    /// Snapshots, signs and writes the signed version of `source`.
    ///
    /// The snapshot is named after the start time; the assertion carries the
    /// time it is issued.
    pub fn run(&self, source: &Path) -> Result<SignOutcome, PipelineError> {
        self.execute(source, Local::now(), None)
    }

    /// Same as [`Pipeline::run`], with `now` used for both the snapshot name
    /// and the assertion time claims.
    pub fn run_at(&self, source: &Path, now: DateTime<Local>) -> Result<SignOutcome, PipelineError> {
        self.execute(source, now, Some(now))
    }

    fn execute(
        &self,
        source: &Path,
        started_at: DateTime<Local>,
        issued_at: Option<DateTime<Local>>,
    ) -> Result<SignOutcome, PipelineError> {
        let mut tracker = Tracker {
            state: State::Start,
        };
        info!("Signing {}", source.display());

        // reject names that cannot produce an output path before copying anything
        artifact::output_path(source).map_err(|e| tracker.fail(e))?;

        let snapshot = snapshot::create_snapshot_at(source, started_at).map_err(|e| tracker.fail(e))?;
        tracker.advance(State::Snapshotted);

        let bytes = fs::read(&snapshot.snapshot_path)
            .map_err(|e| tracker.fail(SignError::io(&snapshot.snapshot_path, e)))?;
        let document = encode_document(&bytes);
        let sent_checksum = document.checksum.clone();
        tracker.advance(State::Encoded);

        let assertion = match issued_at {
            Some(at) => self.issuer.issue_at(at),
            None => self.issuer.issue(),
        }
        .map_err(|e| tracker.fail(e))?;
        tracker.advance(State::Assertioned);

        let description = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let request = SignRequest::new(assertion.into_token(), self.api_token_key.clone())
            .with_file(FileEntry::json(description, document));
        let raw = self.client.send(&request).map_err(|e| tracker.fail(e))?;
        tracker.advance(State::Requested);

        let response = raw.into_sign_response().map_err(|e| tracker.fail(e))?;
        let content = response
            .signed_content()
            .map_err(|e| tracker.fail(e))?
            .to_owned();
        log_response(&response, &sent_checksum);
        tracker.advance(State::Received);

        let output_path = artifact::write_artifact(&snapshot.snapshot_path, &content)
            .map_err(|e| tracker.fail(e))?;
        tracker.advance(State::Written);

        tracker.advance(State::Done);
        info!("Signed document generated at {}", output_path.display());

        Ok(SignOutcome {
            snapshot,
            output_path,
            request_id: response.request_id,
        })
    }
}

fn log_response(response: &SignResponse, sent_checksum: &str) {
    if let Some(id) = response.request_id {
        info!("Signing service request id {id}");
    }
    if let Some(metadata) = &response.metadata {
        debug!(
            "Signing metadata: {:?} received, {:?} signed, {:?} failed, otp expired: {:?}",
            metadata.objects_received,
            metadata.files_signed,
            metadata.signed_failed,
            metadata.otp_expired
        );
    }
    if let Some(file) = response.files.first() {
        debug!(
            "Signed file status: {:?}, document status: {:?}",
            file.status, file.document_status
        );
        if let Some(original) = &file.checksum_original {
            if original != sent_checksum {
                warn!("Signing service reports checksum {original}, sent {sent_checksum}");
            }
        }
    }
}
