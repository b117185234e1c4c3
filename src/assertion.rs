//! Short-lived HS256 assertions that authenticate a signing request.

use chrono::{DateTime, Duration, Local, NaiveDateTime};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::{
    config::Config,
    error::{Result, SignError},
};

/// How long an assertion stays valid after it is issued.
pub const ASSERTION_VALIDITY_MINUTES: i64 = 5;

/// Local wall-clock format of the `expiration` claim, without offset.
pub const EXPIRATION_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Claim set carried by an assertion, in wire order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub entity: String,
    pub run: String,
    pub expiration: String,
    pub purpose: String,
    pub iat: i64,
}

/// A signed, time-bounded assertion. Used for one request, never persisted.
#[derive(Clone, Debug)]
pub struct SigningAssertion {
    pub entity: String,
    pub requester_id: String,
    pub purpose: String,
    pub issued_at: DateTime<Local>,
    pub expires_at: DateTime<Local>,
    pub signature: String,
    token: String,
}

impl SigningAssertion {
    /// Compact `header.claims.signature` serialization.
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn into_token(self) -> String {
        self.token
    }
}

/// Issues assertions for the configured entity and requester.
#[derive(Clone)]
pub struct AssertionIssuer {
    entity: String,
    run: String,
    purpose: String,
    secret: Vec<u8>,
}

/// `{"alg":"HS256"}` with no `typ`, as the signing service expects.
fn header() -> Header {
    Header {
        typ: None,
        ..Header::new(Algorithm::HS256)
    }
}

impl AssertionIssuer {
    pub fn new(config: &Config) -> Self {
        Self::from_parts(
            &config.entity,
            &config.run,
            &config.purpose,
            &config.secret_key,
        )
    }

    pub fn from_parts(entity: &str, run: &str, purpose: &str, secret: &str) -> Self {
        Self {
            entity: entity.to_owned(),
            run: run.to_owned(),
            purpose: purpose.to_owned(),
            secret: secret.as_bytes().to_vec(),
        }
    }

    /// Issues an assertion valid from now for [`ASSERTION_VALIDITY_MINUTES`].
    pub fn issue(&self) -> Result<SigningAssertion> {
        self.issue_at(Local::now())
    }

    /// Issues an assertion as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// [`SignError::Assertion`] if the secret or any claim is blank.
    pub fn issue_at(&self, now: DateTime<Local>) -> Result<SigningAssertion> {
        if self.secret.iter().all(u8::is_ascii_whitespace) {
            return Err(SignError::Assertion("signing secret is empty".to_owned()));
        }
        let missing: Vec<&str> = [
            ("entity", &self.entity),
            ("run", &self.run),
            ("purpose", &self.purpose),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();
        if !missing.is_empty() {
            return Err(SignError::Assertion(format!(
                "missing claims: {}",
                missing.join(", ")
            )));
        }

        let expires_at = now + Duration::minutes(ASSERTION_VALIDITY_MINUTES);
        let claims = Claims {
            entity: self.entity.clone(),
            run: self.run.clone(),
            expiration: expires_at.format(EXPIRATION_FORMAT).to_string(),
            purpose: self.purpose.clone(),
            iat: now.timestamp(),
        };

        let token = jsonwebtoken::encode(&header(), &claims, &EncodingKey::from_secret(&self.secret))
            .map_err(|e| SignError::Assertion(format!("cannot sign claims: {e}")))?;
        let signature = token
            .rsplit_once('.')
            .map(|(_, signature)| signature.to_owned())
            .unwrap_or_default();

        debug!(
            "Issued assertion for run {} expiring {}",
            claims.run, claims.expiration
        );
        trace!("Assertion token: {token}");

        Ok(SigningAssertion {
            entity: claims.entity,
            requester_id: claims.run,
            purpose: claims.purpose,
            issued_at: now,
            expires_at,
            signature,
            token,
        })
    }

    /// Checks the HS256 signature of a compact token against this issuer's
    /// secret and returns its claims.
    ///
    /// Expiry is not checked here: `expiration` is local wall-clock text,
    /// not a numeric `exp`.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        jsonwebtoken::decode::<Claims>(token, &DecodingKey::from_secret(&self.secret), &validation)
            .map(|data| data.claims)
            .map_err(|e| SignError::Assertion(format!("invalid token: {e}")))
    }
}

/// Parses the `expiration` claim back into a local wall-clock time.
pub fn parse_expiration(expiration: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(expiration, EXPIRATION_FORMAT)
        .map_err(|e| SignError::Assertion(format!("invalid expiration '{expiration}': {e}")))
}
