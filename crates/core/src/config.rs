use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Default address for the status endpoint.
pub const DEFAULT_LISTEN_ADDRESS: &str = "127.0.0.1:8888";
/// Default search backend URL when the document leaves it empty.
pub const DEFAULT_ELASTICSEARCH_URL: &str = "http://127.0.0.1:9200";
/// `max_count` value meaning "no upper bound".
pub const UNBOUNDED: i64 = -1;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn default_listen_address() -> String {
    DEFAULT_LISTEN_ADDRESS.to_string()
}

// ── Top-level config ──────────────────────────────────────────

/// The configuration document: listen address, backend URL, handler
/// definitions and the ordered policy list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    #[serde(rename = "listen_address", default = "default_listen_address")]
    pub listen_address: String,
    #[serde(rename = "elasticsearch_url", default)]
    pub elasticsearch_url: String,
    /// Handler name → string parameters. The handler kind comes from the
    /// `type` parameter, or the name itself when `type` is absent.
    #[serde(default)]
    pub handlers: HashMap<String, HashMap<String, String>>,
    #[serde(default)]
    pub policies: Vec<PolicyConfig>,
}

impl WatchConfig {
    /// Read, parse and validate a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file))
    }

    /// Parse and validate a configuration document from any reader.
    pub fn from_reader(reader: impl Read) -> Result<Self> {
        let mut config: WatchConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a configuration document held in memory.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut config: WatchConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the cross-field rules and fill in the backend URL default.
    ///
    /// Rejects zero polling intervals, references to undefined handlers,
    /// empty or duplicate policy names and inverted count bounds.
    pub fn validate(&mut self) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.policies.len());
        for policy in &self.policies {
            if policy.name.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "Policy name must not be empty".to_string(),
                ));
            }
            if !seen.insert(policy.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "Policy {} is defined more than once",
                    policy.name
                )));
            }
            if policy.frequency_seconds == 0 {
                return Err(ConfigError::Validation(format!(
                    "Policy {} polling frequency needs to be set",
                    policy.name
                )));
            }
            if policy.max_count > 0 && (policy.max_count as u64) < policy.min_count {
                return Err(ConfigError::Validation(format!(
                    "Policy {} max_count {} is below min_count {}",
                    policy.name, policy.max_count, policy.min_count
                )));
            }
            if policy.max_count < UNBOUNDED {
                return Err(ConfigError::Validation(format!(
                    "Policy {} max_count must be -1 (unbounded) or a non-negative count",
                    policy.name
                )));
            }
            for handler in &policy.handlers {
                if !self.handlers.contains_key(handler) {
                    return Err(ConfigError::Validation(format!(
                        "Policy {} specified a handler {} but it wasn't defined",
                        policy.name, handler
                    )));
                }
            }
        }
        if self.elasticsearch_url.trim().is_empty() {
            self.elasticsearch_url = DEFAULT_ELASTICSEARCH_URL.to_string();
        }
        Ok(())
    }

    /// Print a redacted summary for startup logs.
    ///
    /// Handler parameters may carry API tokens, so only handler names are
    /// written out.
    pub fn log_summary(&self) {
        let mut handler_names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        handler_names.sort_unstable();
        tracing::info!("Config loaded:");
        tracing::info!("  listen:        {}", self.listen_address);
        tracing::info!("  elasticsearch: {}", self.elasticsearch_url);
        tracing::info!("  handlers:      {}", handler_names.join(", "));
        tracing::info!("  policies:      {}", self.policies.len());
    }
}

// ── Policy ────────────────────────────────────────────────────

/// One policy definition as written in the configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Unique policy name.
    pub name: String,
    /// Backend query expression, passed through untouched.
    pub query: String,
    /// Target index; empty means all indices.
    #[serde(default)]
    pub index: String,
    /// Minimum number of results needed to be in compliance.
    #[serde(default)]
    pub min_count: u64,
    /// Count not to exceed, or -1 when there is no upper bound.
    #[serde(default)]
    pub max_count: i64,
    /// How often to run the query.
    #[serde(rename = "polling_secs", alias = "frequency_seconds")]
    pub frequency_seconds: u64,
    /// Handler names invoked, in order, on violation and resolution.
    #[serde(default)]
    pub handlers: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_json(policies: &str) -> String {
        format!(
            r#"{{
                "listen_address": "127.0.0.1:9999",
                "elasticsearch_url": "http://es:9200",
                "handlers": {{ "stdout": {{}}, "pagerduty": {{ "apikey": "abcd1234" }} }},
                "policies": [{policies}]
            }}"#
        )
    }

    #[test]
    fn parses_full_document() {
        let json = base_json(
            r#"{
                "name": "apache hits in last hour",
                "query": "_type:logs AND @timestamp:{now-1h TO now}",
                "min_count": 100,
                "max_count": -1,
                "polling_secs": 300,
                "handlers": ["pagerduty"]
            }"#,
        );
        let config = WatchConfig::from_json(&json).unwrap();
        assert_eq!(config.listen_address, "127.0.0.1:9999");
        assert_eq!(config.policies.len(), 1);
        let policy = &config.policies[0];
        assert_eq!(policy.min_count, 100);
        assert_eq!(policy.max_count, UNBOUNDED);
        assert_eq!(policy.frequency_seconds, 300);
        assert_eq!(policy.index, "");
        assert_eq!(policy.handlers, vec!["pagerduty".to_string()]);
    }

    #[test]
    fn frequency_seconds_alias_accepted() {
        let json = base_json(r#"{ "name": "a", "query": "*", "frequency_seconds": 5 }"#);
        let config = WatchConfig::from_json(&json).unwrap();
        assert_eq!(config.policies[0].frequency_seconds, 5);
    }

    #[test]
    fn zero_frequency_rejected() {
        let json = base_json(r#"{ "name": "idle", "query": "*", "polling_secs": 0 }"#);
        let err = WatchConfig::from_json(&json).unwrap_err();
        match err {
            ConfigError::Validation(msg) => assert!(msg.contains("polling frequency")),
            other => panic!("expected Validation error, got: {other:?}"),
        }
    }

    #[test]
    fn undefined_handler_rejected() {
        let json = base_json(
            r#"{ "name": "p", "query": "*", "polling_secs": 60, "handlers": ["hipchat"] }"#,
        );
        let err = WatchConfig::from_json(&json).unwrap_err();
        assert!(err.to_string().contains("hipchat"));
    }

    #[test]
    fn duplicate_policy_names_rejected() {
        let json = base_json(
            r#"{ "name": "dup", "query": "*", "polling_secs": 60 },
               { "name": "dup", "query": "x", "polling_secs": 60 }"#,
        );
        let err = WatchConfig::from_json(&json).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn inverted_bounds_rejected() {
        let json = base_json(
            r#"{ "name": "p", "query": "*", "min_count": 10, "max_count": 5, "polling_secs": 60 }"#,
        );
        assert!(WatchConfig::from_json(&json).is_err());
    }

    #[test]
    fn missing_backend_url_defaults() {
        let json = r#"{ "handlers": {}, "policies": [] }"#;
        let config = WatchConfig::from_json(json).unwrap();
        assert_eq!(config.elasticsearch_url, DEFAULT_ELASTICSEARCH_URL);
        assert_eq!(config.listen_address, DEFAULT_LISTEN_ADDRESS);
    }

    #[test]
    fn malformed_document_is_parse_error() {
        let err = WatchConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
