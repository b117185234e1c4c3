/// Wire models of the signing service
pub mod models;

use log::{debug, info, trace, warn};
pub use models::*;
use reqwest::{blocking::Client, StatusCode, Url};

use crate::{
    config::Config,
    error::{Result, SignError},
};

/// Blocking client for the remote signing service.
#[derive(Clone, Debug)]
pub struct SigningClient {
    endpoint: Url,
    http: Client,
}

/// Status and full body text of a signing call, read before any interpretation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl SigningClient {
    /// Builds a client for the configured endpoint.
    ///
    /// Connections are not pooled, so each call opens and closes its own.
    pub fn new(config: &Config) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .pool_max_idle_per_host(0)
            .build()
            .map_err(client_build_error)?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            http,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// POSTs `request` as JSON and reads the whole response body, whatever the status.
    pub fn send(&self, request: &SignRequest) -> Result<RawResponse> {
        info!("Calling signing service at {}", self.endpoint);
        trace!("Sign request '{request:?}'");

        let response = self
            .http
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .map_err(SignError::Network)?;

        let status = response.status();
        debug!("Reading signing service response, status {status}");
        let body = response.text().map_err(SignError::Network)?;

        trace!("Response status: {status}, body: {body}");

        Ok(RawResponse {
            status: status.as_u16(),
            body,
        })
    }

    /// Sends `request` and returns the base64 content of the first signed file.
    pub fn sign(&self, request: &SignRequest) -> Result<String> {
        let response = self.send(request)?.into_sign_response()?;
        response.signed_content().map(str::to_owned)
    }
}

/// A client that cannot be built is a setup problem, not a transport failure.
fn client_build_error(error: impl std::fmt::Display) -> SignError {
    SignError::Config(vec![format!("cannot build HTTP client: {error}")])
}

impl RawResponse {
    /// Interprets the response. Only a 200 body is parsed; any other status is
    /// a [`SignError::SigningService`] carrying the raw body.
    pub fn into_sign_response(self) -> Result<SignResponse> {
        if self.status != StatusCode::OK.as_u16() {
            warn!("Signing service rejected the request with status {}", self.status);
            return Err(SignError::SigningService {
                status: self.status,
                body: self.body,
            });
        }

        if self.body.trim().is_empty() {
            return Err(SignError::MalformedResponse(
                "signing service returned an empty body".to_owned(),
            ));
        }

        serde_json::from_str::<SignResponse>(&self.body).map_err(|e| {
            SignError::MalformedResponse(format!("{e}. Response body: {}", self.body))
        })
    }
}

impl SignResponse {
    /// Base64 signed envelope of the first file.
    pub fn signed_content(&self) -> Result<&str> {
        match self.files.first().and_then(|f| f.content.as_deref()) {
            Some(content) if !content.is_empty() => Ok(content),
            _ => Err(SignError::EmptyResponse),
        }
    }
}
