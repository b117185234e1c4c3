//! Library for signing JSON documents with a remote signing service.
//!
//! A signing transaction snapshots the source document, encodes and checksums
//! it, authenticates with a short-lived HS256 assertion, submits it to the
//! service and writes the signed document returned next to the snapshot.

/// Result writer for signed documents
pub mod artifact;

/// HS256 authentication assertions
pub mod assertion;

/// Signing service client and wire models
pub mod client;

/// Validated configuration
pub mod config;

/// Base64 transport encoding and checksum
pub mod encoding;

/// Error taxonomy
pub mod error;

/// The signing transaction state machine
pub mod pipeline;

/// Timestamped document snapshots
pub mod snapshot;

pub use config::{Config, ConfigSource};
pub use error::SignError;
pub use pipeline::{Pipeline, PipelineError, SignOutcome, State};
