use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::core::{DbError, Result};

const URL_SCHEME: &str = "memgrid://";

/// Grid configuration
///
/// Built with the builder methods below, parsed from a URL of the form
/// `memgrid://cluster?statement_timeout_ms=500&scan_yield_interval=256`,
/// or read from a JSON document with the same keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Cluster name, only reported in logs
    pub cluster_name: String,

    /// Upper bound on the execution time of one SQL statement
    #[serde(rename = "statement_timeout_ms", with = "duration_ms")]
    pub statement_timeout: Option<Duration>,

    /// Scans hand control back to the runtime after this many entries
    pub scan_yield_interval: usize,

    /// Longest accepted statement text, in bytes
    pub max_statement_len: usize,
}

impl GridConfig {
    pub fn new(cluster_name: &str) -> Self {
        Self {
            cluster_name: cluster_name.to_string(),
            statement_timeout: None,
            scan_yield_interval: 1024,
            max_statement_len: crate::parser::DEFAULT_MAX_STATEMENT_LEN,
        }
    }

    /// Set statement timeout
    pub fn statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = Some(timeout);
        self
    }

    pub fn scan_yield_interval(mut self, entries: usize) -> Self {
        self.scan_yield_interval = entries;
        self
    }

    pub fn max_statement_len(mut self, bytes: usize) -> Self {
        self.max_statement_len = bytes;
        self
    }

    /// Parse from URL
    ///
    /// ```
    /// use memgrid::GridConfig;
    ///
    /// let config = GridConfig::from_url("memgrid://dev?statement_timeout_ms=250").unwrap();
    /// assert_eq!(config.cluster_name, "dev");
    /// assert_eq!(config.statement_timeout, Some(std::time::Duration::from_millis(250)));
    /// ```
    pub fn from_url(url: &str) -> Result<Self> {
        let rest = url.strip_prefix(URL_SCHEME).ok_or_else(|| {
            DbError::InvalidConfig(format!("URL must start with '{}'", URL_SCHEME))
        })?;

        let (cluster, query) = match rest.split_once('?') {
            Some((cluster, query)) => (cluster, Some(query)),
            None => (rest, None),
        };
        let cluster = cluster.trim_end_matches('/');
        let mut config = if cluster.is_empty() {
            Self::default()
        } else {
            Self::new(cluster)
        };

        for pair in query.into_iter().flat_map(|q| q.split('&')).filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                DbError::InvalidConfig(format!("Expected key=value, got '{}'", pair))
            })?;
            let number = |value: &str| {
                value.parse::<u64>().map_err(|_| {
                    DbError::InvalidConfig(format!("Invalid value '{}' for '{}'", value, key))
                })
            };
            match key {
                "statement_timeout_ms" => {
                    config.statement_timeout = Some(Duration::from_millis(number(value)?));
                }
                "scan_yield_interval" => config.scan_yield_interval = number(value)? as usize,
                "max_statement_len" => config.max_statement_len = number(value)? as usize,
                other => {
                    return Err(DbError::InvalidConfig(format!("Unknown option '{}'", other)));
                }
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn to_url(&self) -> String {
        let mut url = format!(
            "{}{}?scan_yield_interval={}&max_statement_len={}",
            URL_SCHEME, self.cluster_name, self.scan_yield_interval, self.max_statement_len
        );
        if let Some(timeout) = self.statement_timeout {
            url.push_str(&format!("&statement_timeout_ms={}", timeout.as_millis()));
        }
        url
    }

    /// Parse a JSON document, e.g. `{"cluster_name": "dev", "statement_timeout_ms": 500}`.
    /// Missing keys take their default values.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| DbError::InvalidConfig(format!("Invalid JSON config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| DbError::InvalidConfig(format!("Cannot serialize config: {}", e)))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.cluster_name.is_empty() {
            return Err(DbError::InvalidConfig("cluster_name cannot be empty".into()));
        }
        if self.scan_yield_interval == 0 {
            return Err(DbError::InvalidConfig("scan_yield_interval must be > 0".into()));
        }
        if self.max_statement_len == 0 {
            return Err(DbError::InvalidConfig("max_statement_len must be > 0".into()));
        }
        if self.statement_timeout == Some(Duration::ZERO) {
            return Err(DbError::InvalidConfig("statement_timeout must be > 0".into()));
        }
        Ok(())
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self::new("dev")
    }
}

mod duration_ms {
    use std::time::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}
