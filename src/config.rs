use std::{fmt, fs, path::Path, time::Duration};

use log::debug;
use reqwest::Url;
use serde::Deserialize;

use crate::error::{Result, SignError};

/// Network timeout used when none is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Validated settings for a signing transaction.
///
/// Built once at startup through [`ConfigSource::validate`] and handed by
/// reference to every component.
#[derive(Clone, PartialEq)]
pub struct Config {
    /// Entity identifier registered with the signing service
    pub entity: String,
    /// Shared secret used to sign the authentication assertion
    pub secret_key: String,
    /// Requester identifier (RUN)
    pub run: String,
    /// Purpose declared in the assertion
    pub purpose: String,
    /// API key sent alongside the assertion
    pub api_token_key: String,
    /// Signing endpoint
    pub endpoint: Url,
    /// Bound on connect, write and read of the signing call
    pub timeout: Duration,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("entity", &self.entity)
            .field("secret_key", &"<redacted>")
            .field("run", &self.run)
            .field("purpose", &self.purpose)
            .field("api_token_key", &"<redacted>")
            .field("endpoint", &self.endpoint.as_str())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Unvalidated configuration values, as gathered from a config file,
/// the environment or command-line flags.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ConfigSource {
    pub entity: Option<String>,
    pub secret_key: Option<String>,
    pub run: Option<String>,
    pub purpose: Option<String>,
    pub api_token_key: Option<String>,
    pub endpoint: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl ConfigSource {
    /// Loads configuration values from a JSON file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to a JSON object whose keys match the fields of `ConfigSource`.
    ///
    /// # Returns
    ///
    /// The parsed values. Absent keys stay `None`.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| SignError::io(path, e))?;
        let source = serde_json::from_str::<ConfigSource>(&contents).map_err(|e| {
            SignError::Config(vec![format!(
                "config file '{}' is not valid: {e}",
                path.display()
            )])
        })?;
        debug!("Loaded config values from {}", path.display());
        Ok(source)
    }

    /// Overlays `other` on top of `self`; values present in `other` win.
    pub fn merge(self, other: ConfigSource) -> Self {
        Self {
            entity: other.entity.or(self.entity),
            secret_key: other.secret_key.or(self.secret_key),
            run: other.run.or(self.run),
            purpose: other.purpose.or(self.purpose),
            api_token_key: other.api_token_key.or(self.api_token_key),
            endpoint: other.endpoint.or(self.endpoint),
            timeout_secs: other.timeout_secs.or(self.timeout_secs),
        }
    }

    /// Checks every required value at once.
    ///
    /// A missing or blank value, an endpoint that is not an `http(s)` URL and
    /// a zero timeout are all collected into a single [`SignError::Config`].
    pub fn validate(self) -> Result<Config> {
        let mut problems = Vec::new();

        let mut required = |name: &str, value: Option<String>| match value {
            Some(v) if !v.trim().is_empty() => v,
            _ => {
                problems.push(format!("missing {name}"));
                String::new()
            }
        };

        let entity = required("entity", self.entity);
        let secret_key = required("secret_key", self.secret_key);
        let run = required("run", self.run);
        let purpose = required("purpose", self.purpose);
        let api_token_key = required("api_token_key", self.api_token_key);
        let endpoint = required("endpoint", self.endpoint);

        let endpoint = if endpoint.is_empty() {
            None
        } else {
            match Url::parse(endpoint.trim()) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => Some(url),
                Ok(url) => {
                    problems.push(format!(
                        "endpoint '{url}' must use http or https, not '{}'",
                        url.scheme()
                    ));
                    None
                }
                Err(e) => {
                    problems.push(format!("endpoint '{endpoint}' is not a valid URL: {e}"));
                    None
                }
            }
        };

        let timeout_secs = self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            problems.push("timeout_secs must be greater than zero".to_owned());
        }

        match endpoint {
            Some(endpoint) if problems.is_empty() => Ok(Config {
                entity,
                secret_key,
                run,
                purpose,
                api_token_key,
                endpoint,
                timeout: Duration::from_secs(timeout_secs),
            }),
            _ => Err(SignError::Config(problems)),
        }
    }
}

#[cfg(test)]
pub(crate) fn test_config(endpoint: &str) -> Config {
    ConfigSource {
        entity: Some("Subsecretaría General de la Presidencia".into()),
        secret_key: Some("27a216342c744f89b7b82fa290519ba0".into()),
        run: Some("22222222".into()),
        purpose: Some("Desatendido".into()),
        api_token_key: Some("sandbox".into()),
        endpoint: Some(endpoint.into()),
        timeout_secs: Some(5),
    }
    .validate()
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_source() -> ConfigSource {
        ConfigSource {
            entity: Some("entity".into()),
            secret_key: Some("secret".into()),
            run: Some("11111111".into()),
            purpose: Some("Propósito General".into()),
            api_token_key: Some("api-key".into()),
            endpoint: Some("https://sign.example.test/firma/v2/files/tickets".into()),
            timeout_secs: None,
        }
    }

    #[test]
    fn validate_complete_source() {
        let config = full_source().validate().unwrap();
        assert_eq!(config.entity, "entity");
        assert_eq!(config.endpoint.host_str(), Some("sign.example.test"));
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn validate_aggregates_all_missing_values() {
        let source = ConfigSource {
            entity: None,
            secret_key: Some("   ".into()),
            endpoint: None,
            ..full_source()
        };

        match source.validate() {
            Err(SignError::Config(problems)) => {
                assert_eq!(
                    problems,
                    vec!["missing entity", "missing secret_key", "missing endpoint"]
                );
            }
            other => panic!("Expected config error, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_bad_endpoint_and_timeout() {
        let source = ConfigSource {
            endpoint: Some("ftp://sign.example.test".into()),
            timeout_secs: Some(0),
            ..full_source()
        };

        match source.validate() {
            Err(SignError::Config(problems)) => {
                assert_eq!(problems.len(), 2, "{problems:?}");
                assert!(problems[0].contains("http or https"));
                assert!(problems[1].contains("timeout_secs"));
            }
            other => panic!("Expected config error, got {other:?}"),
        }
    }

    #[test]
    fn merge_prefers_overlay_values() {
        let base = full_source();
        let overlay = ConfigSource {
            run: Some("99999999".into()),
            ..Default::default()
        };

        let merged = base.merge(overlay);
        assert_eq!(merged.run.as_deref(), Some("99999999"));
        assert_eq!(merged.entity.as_deref(), Some("entity"));
    }

    #[test]
    fn load_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("firma.json");
        fs::write(
            &path,
            r#"{"entity": "from-file", "timeout_secs": 12, "endpoint": "http://localhost:9000"}"#,
        )
        .unwrap();

        let source = ConfigSource::load(&path).unwrap();
        assert_eq!(source.entity.as_deref(), Some("from-file"));
        assert_eq!(source.timeout_secs, Some(12));
        assert!(source.secret_key.is_none());
    }

    #[test]
    fn debug_redacts_secrets() {
        let config = full_source().validate().unwrap();
        let printed = format!("{config:?}");
        assert!(!printed.contains("secret\""));
        assert!(!printed.contains("api-key"));
        assert!(printed.contains("<redacted>"));
    }
}
