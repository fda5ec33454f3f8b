//! Configuration loading and Event Hubs connection strings.
//!
//! Settings come from an optional TOML file overlaid with `EVENTHUB_`
//! environment variables (`EVENTHUB_HUB__CONNECTION_STRING`,
//! `EVENTHUB_PRODUCER__MAX_BATCH_BYTES`, ...). [`Config::from_file`]
//! validates the result, so a loaded config always names a hub.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::transport::BATCH_OVERHEAD;
use crate::{Error, Result};

/// Port of the Event Hubs Kafka endpoint.
pub const EVENT_HUBS_KAFKA_PORT: u16 = 9093;

/// Name of the consumer group every hub is created with.
pub const DEFAULT_CONSUMER_GROUP: &str = "$Default";

/// Largest batch Event Hubs accepts on the standard tier.
pub const DEFAULT_MAX_BATCH_BYTES: usize = 1_046_528;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub hub: HubConfig,
    #[serde(default)]
    pub producer: ProducerConfig,
    #[serde(default)]
    pub consumer: ConsumerConfig,
}

#[derive(Clone, Deserialize, Serialize)]
pub struct HubConfig {
    pub connection_string: String,
    #[serde(default)]
    pub hub_name: String,
    #[serde(default = "default_consumer_group")]
    pub consumer_group: String,
    /// Plain Kafka brokers to use instead of the namespace endpoint (no SASL).
    #[serde(default)]
    pub bootstrap_servers: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProducerConfig {
    #[serde(default = "default_max_batch_bytes")]
    pub max_batch_bytes: usize,
    #[serde(default = "default_acks")]
    pub acks: String,
    #[serde(default = "default_linger_ms")]
    pub linger_ms: u32,
    #[serde(default = "default_compression")]
    pub compression: String,
    #[serde(default = "default_message_timeout_ms")]
    pub message_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConsumerConfig {
    #[serde(default = "default_session_timeout_ms")]
    pub session_timeout_ms: u32,
    #[serde(default = "default_auto_offset_reset")]
    pub auto_offset_reset: String,
}

impl Config {
    /// Builds a validated config for `hub` with default producer and consumer settings.
    pub fn new(hub: HubConfig) -> Result<Self> {
        let mut config = Self {
            hub,
            producer: ProducerConfig::default(),
            consumer: ConsumerConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` (if it exists) overlaid with `EVENTHUB_` environment variables.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).required(false))
            .add_source(
                config::Environment::with_prefix("EVENTHUB")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("hub.bootstrap_servers"),
            )
            .build()
            .map_err(|e| Error::Config(e.to_string()))?;

        let mut config: Config = settings
            .try_deserialize()
            .map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks required settings and fills the hub name from `EntityPath`.
    pub fn validate(&mut self) -> Result<()> {
        let connection = self.hub.connection()?;

        match (&connection.entity_path, self.hub.hub_name.is_empty()) {
            (Some(entity), true) => self.hub.hub_name = entity.clone(),
            (Some(entity), false) if *entity != self.hub.hub_name => {
                return Err(Error::Config(format!(
                    "hub_name '{}' does not match the connection string EntityPath '{}'",
                    self.hub.hub_name, entity
                )));
            }
            (None, true) => {
                return Err(Error::Config(
                    "hub_name is required when the connection string has no EntityPath".to_string(),
                ));
            }
            _ => {}
        }

        if self.hub.consumer_group.trim().is_empty() {
            self.hub.consumer_group = default_consumer_group();
        }

        if self.producer.max_batch_bytes <= BATCH_OVERHEAD {
            return Err(Error::Config(format!(
                "producer.max_batch_bytes must exceed {} bytes",
                BATCH_OVERHEAD
            )));
        }

        Ok(())
    }
}

impl HubConfig {
    pub fn new(connection_string: impl Into<String>, hub_name: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            hub_name: hub_name.into(),
            consumer_group: default_consumer_group(),
            bootstrap_servers: None,
        }
    }

    pub fn connection(&self) -> Result<ConnectionString> {
        self.connection_string.parse()
    }

    /// Brokers to bootstrap from: the override list or the namespace's Kafka endpoint.
    pub fn bootstrap_servers(&self) -> Result<String> {
        match &self.bootstrap_servers {
            Some(servers) if !servers.is_empty() => Ok(servers.join(",")),
            _ => Ok(self.connection()?.kafka_bootstrap()),
        }
    }

    /// Whether the namespace endpoint (SASL over TLS) is used.
    pub fn uses_namespace_endpoint(&self) -> bool {
        self.bootstrap_servers
            .as_ref()
            .map_or(true, |servers| servers.is_empty())
    }
}

impl fmt::Debug for HubConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HubConfig")
            .field("connection_string", &"<redacted>")
            .field("hub_name", &self.hub_name)
            .field("consumer_group", &self.consumer_group)
            .field("bootstrap_servers", &self.bootstrap_servers)
            .finish()
    }
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            max_batch_bytes: default_max_batch_bytes(),
            acks: default_acks(),
            linger_ms: default_linger_ms(),
            compression: default_compression(),
            message_timeout_ms: default_message_timeout_ms(),
        }
    }
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            session_timeout_ms: default_session_timeout_ms(),
            auto_offset_reset: default_auto_offset_reset(),
        }
    }
}

/// A parsed `Endpoint=sb://...;SharedAccessKeyName=...;SharedAccessKey=...` string.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionString {
    pub endpoint: Url,
    pub shared_access_key_name: Option<String>,
    pub shared_access_key: Option<String>,
    pub entity_path: Option<String>,
}

impl ConnectionString {
    pub fn namespace_host(&self) -> &str {
        self.endpoint.host_str().unwrap_or_default()
    }

    pub fn kafka_bootstrap(&self) -> String {
        format!("{}:{}", self.namespace_host(), EVENT_HUBS_KAFKA_PORT)
    }
}

impl FromStr for ConnectionString {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().is_empty() {
            return Err(Error::Config("connection_string is required".to_string()));
        }

        let mut endpoint = None;
        let mut shared_access_key_name = None;
        let mut shared_access_key = None;
        let mut entity_path = None;

        for part in s.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            // Keys are base64 and may themselves contain '='.
            let (key, value) = part.split_once('=').ok_or_else(|| {
                Error::Config(format!("malformed connection string segment '{}'", key_only(part)))
            })?;
            let value = value.trim().to_string();

            match key.trim().to_ascii_lowercase().as_str() {
                "endpoint" => endpoint = Some(value),
                "sharedaccesskeyname" => shared_access_key_name = Some(value),
                "sharedaccesskey" => shared_access_key = Some(value),
                "entitypath" => entity_path = Some(value).filter(|v| !v.is_empty()),
                _ => {}
            }
        }

        let endpoint = endpoint
            .ok_or_else(|| Error::Config("connection string has no Endpoint".to_string()))?;
        let endpoint = Url::parse(&endpoint)
            .map_err(|e| Error::Config(format!("invalid Endpoint '{}': {}", endpoint, e)))?;
        if endpoint.host_str().map_or(true, str::is_empty) {
            return Err(Error::Config("connection string Endpoint has no host".to_string()));
        }

        Ok(Self {
            endpoint,
            shared_access_key_name,
            shared_access_key,
            entity_path,
        })
    }
}

fn key_only(segment: &str) -> &str {
    segment.split('=').next().unwrap_or(segment)
}

impl fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionString")
            .field("endpoint", &self.endpoint.as_str())
            .field("shared_access_key_name", &self.shared_access_key_name)
            .field("shared_access_key", &self.shared_access_key.as_ref().map(|_| "<redacted>"))
            .field("entity_path", &self.entity_path)
            .finish()
    }
}

fn default_consumer_group() -> String {
    DEFAULT_CONSUMER_GROUP.to_string()
}

fn default_max_batch_bytes() -> usize {
    DEFAULT_MAX_BATCH_BYTES
}

fn default_acks() -> String {
    "all".to_string()
}

fn default_linger_ms() -> u32 {
    5
}

fn default_compression() -> String {
    "none".to_string()
}

fn default_message_timeout_ms() -> u64 {
    30_000
}

fn default_session_timeout_ms() -> u32 {
    30_000
}

fn default_auto_offset_reset() -> String {
    "earliest".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    const CONN: &str = "Endpoint=sb://demo-ns.servicebus.windows.net/;SharedAccessKeyName=RootManageSharedAccessKey;SharedAccessKey=abc123+/def==";

    #[test]
    fn test_parse_connection_string() {
        let parsed: ConnectionString = CONN.parse().unwrap();
        assert_eq!(parsed.namespace_host(), "demo-ns.servicebus.windows.net");
        assert_eq!(parsed.shared_access_key_name.as_deref(), Some("RootManageSharedAccessKey"));
        assert_eq!(parsed.shared_access_key.as_deref(), Some("abc123+/def=="));
        assert_eq!(parsed.entity_path, None);
        assert_eq!(parsed.kafka_bootstrap(), "demo-ns.servicebus.windows.net:9093");
    }

    #[test]
    fn test_parse_rejects_missing_endpoint() {
        let err = "SharedAccessKeyName=a;SharedAccessKey=b".parse::<ConnectionString>();
        assert!(matches!(err, Err(Error::Config(_))));
        assert!(matches!("".parse::<ConnectionString>(), Err(Error::Config(_))));
        assert!(matches!("Endpoint".parse::<ConnectionString>(), Err(Error::Config(_))));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let parsed: ConnectionString = CONN.parse().unwrap();
        let rendered = format!("{:?}", parsed);
        assert!(!rendered.contains("abc123"));

        let hub = HubConfig::new(CONN, "telemetry");
        assert!(!format!("{:?}", hub).contains("abc123"));
    }

    #[test]
    fn test_hub_name_taken_from_entity_path() {
        let conn = format!("{};EntityPath=telemetry", CONN);
        let config = Config::new(HubConfig::new(conn, "")).unwrap();
        assert_eq!(config.hub.hub_name, "telemetry");
        assert_eq!(config.hub.consumer_group, DEFAULT_CONSUMER_GROUP);
    }

    #[test]
    fn test_hub_name_must_match_entity_path() {
        let conn = format!("{};EntityPath=telemetry", CONN);
        let err = Config::new(HubConfig::new(conn, "other")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_hub_name_required() {
        let err = Config::new(HubConfig::new(CONN, "")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_bootstrap_override() {
        let mut hub = HubConfig::new(CONN, "telemetry");
        assert!(hub.uses_namespace_endpoint());
        assert_eq!(hub.bootstrap_servers().unwrap(), "demo-ns.servicebus.windows.net:9093");

        hub.bootstrap_servers = Some(vec!["localhost:9092".to_string(), "localhost:9094".to_string()]);
        assert!(!hub.uses_namespace_endpoint());
        assert_eq!(hub.bootstrap_servers().unwrap(), "localhost:9092,localhost:9094");
    }

    #[test]
    fn test_defaults() {
        let producer = ProducerConfig::default();
        assert_eq!(producer.max_batch_bytes, DEFAULT_MAX_BATCH_BYTES);
        assert_eq!(producer.acks, "all");
        assert_eq!(producer.linger_ms, 5);

        let consumer = ConsumerConfig::default();
        assert_eq!(consumer.auto_offset_reset, "earliest");
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[hub]
connection_string = "{}"
hub_name = "telemetry"
consumer_group = "readers"

[producer]
max_batch_bytes = 4096
"#,
            CONN
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.hub.hub_name, "telemetry");
        assert_eq!(config.hub.consumer_group, "readers");
        assert_eq!(config.producer.max_batch_bytes, 4096);
        assert_eq!(config.consumer.session_timeout_ms, 30_000);
    }

    #[test]
    fn test_tiny_batch_limit_rejected() {
        let mut config = Config {
            hub: HubConfig::new(CONN, "telemetry"),
            producer: ProducerConfig::default(),
            consumer: ConsumerConfig::default(),
        };
        config.producer.max_batch_bytes = BATCH_OVERHEAD;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}
