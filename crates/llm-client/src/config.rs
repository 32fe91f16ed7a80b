//! Endpoint descriptors and backoff settings.
//!
//! The YAML file lists endpoints in failover order:
//!
//! ```yaml
//! endpoints:
//!   - name: primary
//!     base_url: https://example-east.openai.azure.com
//!     model: gpt-4o
//!     api_version: 2024-08-01-preview
//!     max_tokens: 4096
//!     api_key_env: CODING_REVIEW_PRIMARY_KEY
//! backoff:
//!   max_cycles: 3
//!   cycle_delay_secs: 10
//!   json_retry_delay_millis: 1000
//! ```

use crate::{LlmError, LlmResult};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

const DEFAULT_MAX_CYCLES: u32 = 3;
const DEFAULT_CYCLE_DELAY_SECS: u64 = 10;
const DEFAULT_JSON_RETRY_DELAY_MILLIS: u64 = 1_000;

/// One endpoint as described in configuration. Holds the *name* of the credential variable only.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct EndpointConfig {
    pub name: String,
    pub base_url: String,
    pub model: String,
    pub api_version: String,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    pub api_key_env: String,
}

impl EndpointConfig {
    /// Attach the credential, looked up through `lookup` (normally `std::env::var`).
    pub fn resolve<F>(&self, lookup: F) -> LlmResult<ResolvedEndpoint>
    where
        F: Fn(&str) -> Option<String>,
    {
        let key = lookup(&self.api_key_env)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| LlmError::MissingCredential {
                endpoint: self.name.clone(),
                variable: self.api_key_env.clone(),
            })?;

        Ok(ResolvedEndpoint {
            config: self.clone(),
            credential: Credential(key),
        })
    }
}

/// An API key. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedEndpoint {
    pub config: EndpointConfig,
    pub credential: Credential,
}

/// Retry schedule for [`crate::InvocationManager`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Number of full sweeps over the endpoint list before giving up.
    pub max_cycles: u32,
    /// Pause after each sweep in which every endpoint failed.
    pub cycle_delay: Duration,
    /// Pause between JSON reformatting retries.
    pub json_retry_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_cycles: DEFAULT_MAX_CYCLES,
            cycle_delay: Duration::from_secs(DEFAULT_CYCLE_DELAY_SECS),
            json_retry_delay: Duration::from_millis(DEFAULT_JSON_RETRY_DELAY_MILLIS),
        }
    }
}

#[derive(Debug, Deserialize)]
struct BackoffSettings {
    #[serde(default = "default_max_cycles")]
    max_cycles: u32,
    #[serde(default = "default_cycle_delay_secs")]
    cycle_delay_secs: u64,
    #[serde(default = "default_json_retry_delay_millis")]
    json_retry_delay_millis: u64,
}

fn default_max_cycles() -> u32 {
    DEFAULT_MAX_CYCLES
}

fn default_cycle_delay_secs() -> u64 {
    DEFAULT_CYCLE_DELAY_SECS
}

fn default_json_retry_delay_millis() -> u64 {
    DEFAULT_JSON_RETRY_DELAY_MILLIS
}

impl From<BackoffSettings> for BackoffPolicy {
    fn from(s: BackoffSettings) -> Self {
        Self {
            max_cycles: s.max_cycles,
            cycle_delay: Duration::from_secs(s.cycle_delay_secs),
            json_retry_delay: Duration::from_millis(s.json_retry_delay_millis),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawEndpointsFile {
    endpoints: Vec<EndpointConfig>,
    #[serde(default)]
    backoff: Option<BackoffSettings>,
}

/// Parsed endpoint configuration file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EndpointsFile {
    pub endpoints: Vec<EndpointConfig>,
    pub backoff: BackoffPolicy,
}

impl EndpointsFile {
    pub fn from_yaml_str(text: &str) -> LlmResult<Self> {
        let raw: RawEndpointsFile =
            serde_yaml::from_str(text).map_err(LlmError::YamlDeserialization)?;

        if raw.endpoints.is_empty() {
            return Err(LlmError::InvalidConfig(
                "at least one endpoint must be configured".into(),
            ));
        }

        let backoff = raw.backoff.map(BackoffPolicy::from).unwrap_or_default();
        if backoff.max_cycles == 0 {
            return Err(LlmError::InvalidConfig(
                "backoff.max_cycles must be at least 1".into(),
            ));
        }

        Ok(Self {
            endpoints: raw.endpoints,
            backoff,
        })
    }

    /// Resolve every endpoint's credential. Fails on the first missing variable.
    pub fn resolve_all<F>(&self, lookup: F) -> LlmResult<Vec<ResolvedEndpoint>>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.endpoints.iter().map(|e| e.resolve(&lookup)).collect()
    }
}

/// Read and validate an endpoint configuration file.
pub fn load_endpoints_file(path: &Path) -> LlmResult<EndpointsFile> {
    let text = std::fs::read_to_string(path).map_err(LlmError::ConfigRead)?;
    EndpointsFile::from_yaml_str(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    const TWO_ENDPOINTS: &str = r#"
endpoints:
  - name: east
    base_url: https://east.example.test
    model: gpt-4o
    api_version: 2024-08-01-preview
    max_tokens: 2048
    api_key_env: EAST_KEY
  - name: west
    base_url: https://west.example.test
    model: gpt-4o
    api_version: 2024-08-01-preview
    api_key_env: WEST_KEY
"#;

    #[test]
    fn backoff_defaults_apply_when_section_absent() {
        let file = EndpointsFile::from_yaml_str(TWO_ENDPOINTS).unwrap();
        assert_eq!(file.endpoints.len(), 2);
        assert_eq!(file.endpoints[0].max_tokens, Some(2048));
        assert_eq!(file.endpoints[1].max_tokens, None);
        assert_eq!(file.backoff, BackoffPolicy::default());
        assert_eq!(file.backoff.max_cycles, 3);
        assert_eq!(file.backoff.cycle_delay, Duration::from_secs(10));
    }

    #[test]
    fn partial_backoff_section_keeps_other_defaults() {
        let text = format!("{TWO_ENDPOINTS}backoff:\n  max_cycles: 5\n");
        let file = EndpointsFile::from_yaml_str(&text).unwrap();
        assert_eq!(file.backoff.max_cycles, 5);
        assert_eq!(file.backoff.json_retry_delay, Duration::from_secs(1));
    }

    #[test]
    fn empty_endpoint_list_is_rejected() {
        let err = EndpointsFile::from_yaml_str("endpoints: []\n").expect_err("must reject");
        assert!(matches!(err, LlmError::InvalidConfig(_)));
    }

    #[test]
    fn zero_cycles_is_rejected() {
        let text = format!("{TWO_ENDPOINTS}backoff:\n  max_cycles: 0\n");
        assert!(matches!(
            EndpointsFile::from_yaml_str(&text),
            Err(LlmError::InvalidConfig(_))
        ));
    }

    #[test]
    fn credentials_come_from_lookup_and_are_redacted() {
        let file = EndpointsFile::from_yaml_str(TWO_ENDPOINTS).unwrap();
        let env: HashMap<&str, &str> = [("EAST_KEY", "secret-east"), ("WEST_KEY", "secret-west")]
            .into_iter()
            .collect();

        let resolved = file
            .resolve_all(|name| env.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(resolved[0].credential.expose(), "secret-east");
        let debug = format!("{:?}", resolved[1]);
        assert!(!debug.contains("secret-west"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn missing_or_blank_credential_is_an_error() {
        let file = EndpointsFile::from_yaml_str(TWO_ENDPOINTS).unwrap();
        let err = file
            .resolve_all(|name| (name == "EAST_KEY").then(|| "k".to_string()))
            .expect_err("west key missing");
        assert!(matches!(
            err,
            LlmError::MissingCredential { ref endpoint, ref variable }
                if endpoint == "west" && variable == "WEST_KEY"
        ));

        let err = file.endpoints[0]
            .resolve(|_| Some("   ".into()))
            .expect_err("blank key");
        assert!(matches!(err, LlmError::MissingCredential { .. }));
    }

    #[test]
    fn load_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(TWO_ENDPOINTS.as_bytes()).unwrap();
        let loaded = load_endpoints_file(file.path()).unwrap();
        assert_eq!(loaded.endpoints[1].name, "west");

        let missing = load_endpoints_file(Path::new("/definitely/not/here.yaml"));
        assert!(matches!(missing, Err(LlmError::ConfigRead(_))));
    }
}
