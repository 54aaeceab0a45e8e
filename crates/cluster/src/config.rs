//! Where and how a connection reaches its cluster.
//!
//! [`ClusterOrigin`] bundles the three inputs a client needs to bootstrap: the
//! parsed [`ConnectionString`], the [`Credentials`], and the [`ClusterOptions`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Durations as integer milliseconds
// ---------------------------------------------------------------------------

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let ms = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(ms)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TlsVerifyMode {
    #[default]
    Peer,
    None,
}

/// Threshold-logging tracer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TracingOptions {
    pub orphaned_sample_size: u64,
    #[serde(with = "millis")]
    pub orphaned_emit_interval: Duration,
    pub threshold_sample_size: u64,
    #[serde(with = "millis")]
    pub threshold_emit_interval: Duration,
    #[serde(with = "millis")]
    pub analytics_threshold: Duration,
    #[serde(with = "millis")]
    pub eventing_threshold: Duration,
    #[serde(with = "millis")]
    pub key_value_threshold: Duration,
    #[serde(with = "millis")]
    pub management_threshold: Duration,
    #[serde(with = "millis")]
    pub query_threshold: Duration,
    #[serde(with = "millis")]
    pub search_threshold: Duration,
    #[serde(with = "millis")]
    pub view_threshold: Duration,
}

impl Default for TracingOptions {
    fn default() -> Self {
        Self {
            orphaned_sample_size: 64,
            orphaned_emit_interval: Duration::from_secs(10),
            threshold_sample_size: 64,
            threshold_emit_interval: Duration::from_secs(10),
            analytics_threshold: Duration::from_secs(1),
            eventing_threshold: Duration::from_secs(1),
            key_value_threshold: Duration::from_millis(500),
            management_threshold: Duration::from_secs(1),
            query_threshold: Duration::from_secs(1),
            search_threshold: Duration::from_secs(1),
            view_threshold: Duration::from_secs(1),
        }
    }
}

/// Logging meter settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MeterOptions {
    #[serde(with = "millis")]
    pub emit_interval: Duration,
}

impl Default for MeterOptions {
    fn default() -> Self {
        Self {
            emit_interval: Duration::from_secs(600),
        }
    }
}

/// Cluster-level settings handed to the client at bootstrap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClusterOptions {
    #[serde(with = "millis")]
    pub analytics_timeout: Duration,
    #[serde(with = "millis")]
    pub bootstrap_timeout: Duration,
    #[serde(with = "millis")]
    pub connect_timeout: Duration,
    #[serde(with = "millis")]
    pub dns_srv_timeout: Duration,
    #[serde(with = "millis")]
    pub key_value_durable_timeout: Duration,
    #[serde(with = "millis")]
    pub key_value_timeout: Duration,
    #[serde(with = "millis")]
    pub management_timeout: Duration,
    #[serde(with = "millis")]
    pub query_timeout: Duration,
    #[serde(with = "millis")]
    pub resolve_timeout: Duration,
    #[serde(with = "millis")]
    pub search_timeout: Duration,
    #[serde(with = "millis")]
    pub view_timeout: Duration,

    pub max_http_connections: u64,

    #[serde(with = "millis")]
    pub config_idle_redial_timeout: Duration,
    #[serde(with = "millis")]
    pub config_poll_floor: Duration,
    #[serde(with = "millis")]
    pub config_poll_interval: Duration,
    #[serde(with = "millis")]
    pub idle_http_connection_timeout: Duration,
    #[serde(with = "millis")]
    pub tcp_keep_alive_interval: Duration,

    pub enable_clustermap_notification: bool,
    pub enable_compression: bool,
    pub enable_dns_srv: bool,
    pub enable_metrics: bool,
    pub enable_mutation_tokens: bool,
    pub enable_tcp_keep_alive: bool,
    pub enable_tls: bool,
    pub enable_tracing: bool,
    pub enable_unordered_execution: bool,
    pub force_ipv4: bool,
    pub show_queries: bool,

    pub network: String,
    pub trust_certificate: String,
    pub user_agent_extra: String,
    pub tls_verify: TlsVerifyMode,

    #[serde(rename = "thresholdLoggingTracerOptions")]
    pub tracing_options: TracingOptions,
    #[serde(rename = "loggingMeterOptions")]
    pub meter_options: MeterOptions,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            analytics_timeout: Duration::from_secs(75),
            bootstrap_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(10),
            dns_srv_timeout: Duration::from_millis(500),
            key_value_durable_timeout: Duration::from_secs(10),
            key_value_timeout: Duration::from_millis(2500),
            management_timeout: Duration::from_secs(75),
            query_timeout: Duration::from_secs(75),
            resolve_timeout: Duration::from_secs(2),
            search_timeout: Duration::from_secs(75),
            view_timeout: Duration::from_secs(75),
            max_http_connections: 0,
            config_idle_redial_timeout: Duration::from_secs(300),
            config_poll_floor: Duration::from_millis(50),
            config_poll_interval: Duration::from_millis(2500),
            idle_http_connection_timeout: Duration::from_millis(4500),
            tcp_keep_alive_interval: Duration::from_secs(60),
            enable_clustermap_notification: false,
            enable_compression: true,
            enable_dns_srv: true,
            enable_metrics: true,
            enable_mutation_tokens: true,
            enable_tcp_keep_alive: true,
            enable_tls: false,
            enable_tracing: true,
            enable_unordered_execution: true,
            force_ipv4: false,
            show_queries: false,
            network: "auto".to_owned(),
            trust_certificate: String::new(),
            user_agent_extra: String::new(),
            tls_verify: TlsVerifyMode::Peer,
            tracing_options: TracingOptions::default(),
            meter_options: MeterOptions::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// How the client authenticates.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Password {
        username: String,
        password: String,
        /// Empty means "client default".
        allowed_sasl_mechanisms: Vec<String>,
    },
    Certificate {
        certificate_path: String,
        key_path: String,
    },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Password {
                username,
                allowed_sasl_mechanisms,
                ..
            } => f
                .debug_struct("Password")
                .field("username", username)
                .field("password", &"<redacted>")
                .field("allowed_sasl_mechanisms", allowed_sasl_mechanisms)
                .finish(),
            Credentials::Certificate {
                certificate_path,
                key_path,
            } => f
                .debug_struct("Certificate")
                .field("certificate_path", certificate_path)
                .field("key_path", key_path)
                .finish(),
        }
    }
}

// ---------------------------------------------------------------------------
// Connection string
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Couchbase,
    Couchbases,
    Http,
}

impl Scheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Couchbase => "couchbase",
            Scheme::Couchbases => "couchbases",
            Scheme::Http => "http",
        }
    }

    pub fn uses_tls(self) -> bool {
        self == Scheme::Couchbases
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub host: String,
    pub port: Option<u16>,
}

/// Errors produced while parsing a connection string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionStringError {
    #[error("unsupported scheme \"{0}\", expected couchbase, couchbases or http")]
    UnsupportedScheme(String),

    #[error("connection string does not list any nodes")]
    NoNodes,

    #[error("empty host in node list")]
    EmptyHost,

    #[error("invalid port \"{port}\" for host \"{host}\"")]
    InvalidPort { host: String, port: String },

    #[error("unterminated IPv6 address \"{0}\"")]
    UnterminatedAddress(String),

    #[error("malformed parameter \"{0}\", expected key=value")]
    MalformedParameter(String),
}

/// Parsed `scheme://host[:port][,host[:port]...][/bucket][?key=value&...]`.
///
/// Query parameters are kept as given. Known cluster option names among them
/// are applied beneath the host options when the origin is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionString {
    pub input: String,
    pub scheme: Scheme,
    pub nodes: Vec<Node>,
    pub default_bucket: Option<String>,
    pub params: BTreeMap<String, String>,
}

impl ConnectionString {
    pub fn tls(&self) -> bool {
        self.scheme.uses_tls()
    }
}

impl FromStr for ConnectionString {
    type Err = ConnectionStringError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let (scheme, rest) = match input.split_once("://") {
            Some(("couchbase", rest)) => (Scheme::Couchbase, rest),
            Some(("couchbases", rest)) => (Scheme::Couchbases, rest),
            Some(("http", rest)) => (Scheme::Http, rest),
            Some((other, _)) => {
                return Err(ConnectionStringError::UnsupportedScheme(other.to_owned()))
            }
            None => (Scheme::Couchbase, input),
        };

        let (rest, query) = match rest.split_once('?') {
            Some((rest, query)) => (rest, Some(query)),
            None => (rest, None),
        };
        let (hosts, bucket) = match rest.split_once('/') {
            Some((hosts, bucket)) => (hosts, Some(bucket)),
            None => (rest, None),
        };

        if hosts.trim().is_empty() {
            return Err(ConnectionStringError::NoNodes);
        }
        let nodes = hosts
            .split([',', ';'])
            .map(parse_node)
            .collect::<Result<Vec<_>, _>>()?;

        let mut params = BTreeMap::new();
        for pair in query.into_iter().flat_map(|q| q.split('&')).filter(|p| !p.is_empty()) {
            match pair.split_once('=') {
                Some((key, value)) if !key.is_empty() => {
                    params.insert(key.to_owned(), value.to_owned());
                }
                _ => return Err(ConnectionStringError::MalformedParameter(pair.to_owned())),
            }
        }

        Ok(Self {
            input: input.to_owned(),
            scheme,
            nodes,
            default_bucket: bucket.filter(|b| !b.is_empty()).map(str::to_owned),
            params,
        })
    }
}

fn parse_node(text: &str) -> Result<Node, ConnectionStringError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ConnectionStringError::EmptyHost);
    }

    let (host, port) = if let Some(bracketed) = text.strip_prefix('[') {
        let (address, after) = bracketed
            .split_once(']')
            .ok_or_else(|| ConnectionStringError::UnterminatedAddress(text.to_owned()))?;
        let port = match after {
            "" => None,
            _ => Some(after.strip_prefix(':').ok_or_else(|| {
                ConnectionStringError::InvalidPort {
                    host: address.to_owned(),
                    port: after.to_owned(),
                }
            })?),
        };
        (address, port)
    } else {
        match text.rsplit_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (text, None),
        }
    };

    if host.is_empty() {
        return Err(ConnectionStringError::EmptyHost);
    }
    let port = port
        .map(|p| {
            p.parse::<u16>().map_err(|_| ConnectionStringError::InvalidPort {
                host: host.to_owned(),
                port: p.to_owned(),
            })
        })
        .transpose()?;

    Ok(Node {
        host: host.to_owned(),
        port,
    })
}

impl fmt::Display for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.input)
    }
}

// ---------------------------------------------------------------------------
// Origin
// ---------------------------------------------------------------------------

/// Everything a client needs to bootstrap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterOrigin {
    pub connection_string: ConnectionString,
    pub credentials: Credentials,
    pub options: ClusterOptions,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nodes_bucket_and_params() {
        let cs: ConnectionString = "couchbases://db1:11207,db2/travel?network=external&foo=bar"
            .parse()
            .unwrap();
        assert_eq!(cs.scheme, Scheme::Couchbases);
        assert!(cs.tls());
        assert_eq!(
            cs.nodes,
            vec![
                Node { host: "db1".into(), port: Some(11207) },
                Node { host: "db2".into(), port: None },
            ]
        );
        assert_eq!(cs.default_bucket.as_deref(), Some("travel"));
        assert_eq!(cs.params.get("network").map(String::as_str), Some("external"));
    }

    #[test]
    fn scheme_defaults_to_couchbase_and_ipv6_is_bracketed() {
        let cs: ConnectionString = "[::1]:8091".parse().unwrap();
        assert_eq!(cs.scheme, Scheme::Couchbase);
        assert_eq!(cs.nodes[0].host, "::1");
        assert_eq!(cs.nodes[0].port, Some(8091));

        let cs: ConnectionString = "couchbase://[fe80::2]".parse().unwrap();
        assert_eq!(cs.nodes[0].host, "fe80::2");
        assert_eq!(cs.nodes[0].port, None);
    }

    #[test]
    fn rejects_trailing_characters_after_ipv6_address() {
        assert_eq!(
            "couchbase://[::1]x".parse::<ConnectionString>(),
            Err(ConnectionStringError::InvalidPort {
                host: "::1".into(),
                port: "x".into()
            })
        );
        assert!(matches!(
            "couchbase://[::1]:".parse::<ConnectionString>(),
            Err(ConnectionStringError::InvalidPort { .. })
        ));
        assert!(matches!(
            "couchbase://[::1]8091".parse::<ConnectionString>(),
            Err(ConnectionStringError::InvalidPort { .. })
        ));
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(
            "ftp://host".parse::<ConnectionString>(),
            Err(ConnectionStringError::UnsupportedScheme("ftp".into()))
        );
        assert_eq!("couchbase://".parse::<ConnectionString>(), Err(ConnectionStringError::NoNodes));
        assert!(matches!(
            "couchbase://host:http".parse::<ConnectionString>(),
            Err(ConnectionStringError::InvalidPort { .. })
        ));
        assert!(matches!(
            "couchbase://host?flag".parse::<ConnectionString>(),
            Err(ConnectionStringError::MalformedParameter(_))
        ));
        assert_eq!(
            "couchbase://a,,b".parse::<ConnectionString>(),
            Err(ConnectionStringError::EmptyHost)
        );
    }

    #[test]
    fn options_deserialize_with_host_names_and_defaults() {
        let opts: ClusterOptions = serde_json::from_value(serde_json::json!({
            "keyValueTimeout": 1000,
            "enableTls": true,
            "tlsVerify": "none",
            "thresholdLoggingTracerOptions": { "keyValueThreshold": 250 }
        }))
        .unwrap();
        assert_eq!(opts.key_value_timeout, Duration::from_secs(1));
        assert!(opts.enable_tls);
        assert_eq!(opts.tls_verify, TlsVerifyMode::None);
        assert_eq!(opts.tracing_options.key_value_threshold, Duration::from_millis(250));
        assert_eq!(opts.bootstrap_timeout, Duration::from_secs(10));
    }

    #[test]
    fn debug_never_prints_password() {
        let creds = Credentials::Password {
            username: "admin".into(),
            password: "s3cret".into(),
            allowed_sasl_mechanisms: vec![],
        };
        let text = format!("{creds:?}");
        assert!(text.contains("admin"));
        assert!(!text.contains("s3cret"));
    }
}
