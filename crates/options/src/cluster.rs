//! Connection-level inputs: cluster options, credentials, and the origin.

use cluster::{
    location, ClusterOptions, ClusterOrigin, ConnectionString, CoreError, CoreResult, Credentials,
    ErrorCode, MeterOptions, TlsVerifyMode, TracingOptions,
};
use serde_json::{Map, Value};
use tracing::debug;

use crate::table::{populate_object, OptionField, Setter};

const TRACER_FIELDS: &[OptionField<TracingOptions>] = &[
    OptionField::new(
        "orphanedSampleSize",
        Setter::Unsigned(|o: &mut TracingOptions, v| o.orphaned_sample_size = v),
    ),
    OptionField::new(
        "orphanedEmitInterval",
        Setter::Millis(|o: &mut TracingOptions, v| o.orphaned_emit_interval = v),
    ),
    OptionField::new(
        "thresholdSampleSize",
        Setter::Unsigned(|o: &mut TracingOptions, v| o.threshold_sample_size = v),
    ),
    OptionField::new(
        "thresholdEmitInterval",
        Setter::Millis(|o: &mut TracingOptions, v| o.threshold_emit_interval = v),
    ),
    OptionField::new(
        "analyticsThreshold",
        Setter::Millis(|o: &mut TracingOptions, v| o.analytics_threshold = v),
    ),
    OptionField::new(
        "eventingThreshold",
        Setter::Millis(|o: &mut TracingOptions, v| o.eventing_threshold = v),
    ),
    OptionField::new(
        "keyValueThreshold",
        Setter::Millis(|o: &mut TracingOptions, v| o.key_value_threshold = v),
    ),
    OptionField::new(
        "managementThreshold",
        Setter::Millis(|o: &mut TracingOptions, v| o.management_threshold = v),
    ),
    OptionField::new(
        "queryThreshold",
        Setter::Millis(|o: &mut TracingOptions, v| o.query_threshold = v),
    ),
    OptionField::new(
        "searchThreshold",
        Setter::Millis(|o: &mut TracingOptions, v| o.search_threshold = v),
    ),
    OptionField::new(
        "viewThreshold",
        Setter::Millis(|o: &mut TracingOptions, v| o.view_threshold = v),
    ),
];

const METER_FIELDS: &[OptionField<MeterOptions>] = &[OptionField::new(
    "emitInterval",
    Setter::Millis(|o: &mut MeterOptions, v| o.emit_interval = v),
)];

fn tls_verify(options: &mut ClusterOptions, mode: &str) -> CoreResult<()> {
    options.tls_verify = match mode {
        "peer" => TlsVerifyMode::Peer,
        "none" => TlsVerifyMode::None,
        _ => {
            return Err(CoreError::invalid_argument(
                location!(),
                format!(
                    r#"unsupported tlsVerify mode "{mode}", supported modes are "peer" and "none""#
                ),
            ))
        }
    };
    Ok(())
}

const CLUSTER_FIELDS: &[OptionField<ClusterOptions>] = &[
    OptionField::new(
        "analyticsTimeout",
        Setter::Millis(|o: &mut ClusterOptions, v| o.analytics_timeout = v),
    ),
    OptionField::new(
        "bootstrapTimeout",
        Setter::Millis(|o: &mut ClusterOptions, v| o.bootstrap_timeout = v),
    ),
    OptionField::new(
        "connectTimeout",
        Setter::Millis(|o: &mut ClusterOptions, v| o.connect_timeout = v),
    ),
    OptionField::new(
        "dnsSrvTimeout",
        Setter::Millis(|o: &mut ClusterOptions, v| o.dns_srv_timeout = v),
    ),
    OptionField::new(
        "keyValueDurableTimeout",
        Setter::Millis(|o: &mut ClusterOptions, v| o.key_value_durable_timeout = v),
    ),
    OptionField::new(
        "keyValueTimeout",
        Setter::Millis(|o: &mut ClusterOptions, v| o.key_value_timeout = v),
    ),
    OptionField::new(
        "managementTimeout",
        Setter::Millis(|o: &mut ClusterOptions, v| o.management_timeout = v),
    ),
    OptionField::new(
        "queryTimeout",
        Setter::Millis(|o: &mut ClusterOptions, v| o.query_timeout = v),
    ),
    OptionField::new(
        "resolveTimeout",
        Setter::Millis(|o: &mut ClusterOptions, v| o.resolve_timeout = v),
    ),
    OptionField::new(
        "searchTimeout",
        Setter::Millis(|o: &mut ClusterOptions, v| o.search_timeout = v),
    ),
    OptionField::new("viewTimeout", Setter::Millis(|o: &mut ClusterOptions, v| o.view_timeout = v)),
    OptionField::new(
        "maxHttpConnections",
        Setter::Unsigned(|o: &mut ClusterOptions, v| o.max_http_connections = v),
    ),
    OptionField::new(
        "configIdleRedialTimeout",
        Setter::Millis(|o: &mut ClusterOptions, v| o.config_idle_redial_timeout = v),
    ),
    OptionField::new(
        "configPollFloor",
        Setter::Millis(|o: &mut ClusterOptions, v| o.config_poll_floor = v),
    ),
    OptionField::new(
        "configPollInterval",
        Setter::Millis(|o: &mut ClusterOptions, v| o.config_poll_interval = v),
    ),
    OptionField::new(
        "idleHttpConnectionTimeout",
        Setter::Millis(|o: &mut ClusterOptions, v| o.idle_http_connection_timeout = v),
    ),
    OptionField::new(
        "tcpKeepAliveInterval",
        Setter::Millis(|o: &mut ClusterOptions, v| o.tcp_keep_alive_interval = v),
    ),
    OptionField::new(
        "enableClustermapNotification",
        Setter::Boolean(|o: &mut ClusterOptions, v| o.enable_clustermap_notification = v),
    ),
    OptionField::new(
        "enableCompression",
        Setter::Boolean(|o: &mut ClusterOptions, v| o.enable_compression = v),
    ),
    OptionField::new(
        "enableDnsSrv",
        Setter::Boolean(|o: &mut ClusterOptions, v| o.enable_dns_srv = v),
    ),
    OptionField::new(
        "enableMetrics",
        Setter::Boolean(|o: &mut ClusterOptions, v| o.enable_metrics = v),
    ),
    OptionField::new(
        "enableMutationTokens",
        Setter::Boolean(|o: &mut ClusterOptions, v| o.enable_mutation_tokens = v),
    ),
    OptionField::new(
        "enableTcpKeepAlive",
        Setter::Boolean(|o: &mut ClusterOptions, v| o.enable_tcp_keep_alive = v),
    ),
    OptionField::new("enableTls", Setter::Boolean(|o: &mut ClusterOptions, v| o.enable_tls = v)),
    OptionField::new(
        "enableTracing",
        Setter::Boolean(|o: &mut ClusterOptions, v| o.enable_tracing = v),
    ),
    OptionField::new(
        "enableUnorderedExecution",
        Setter::Boolean(|o: &mut ClusterOptions, v| o.enable_unordered_execution = v),
    ),
    OptionField::new("forceIpv4", Setter::Boolean(|o: &mut ClusterOptions, v| o.force_ipv4 = v)),
    OptionField::new(
        "showQueries",
        Setter::Boolean(|o: &mut ClusterOptions, v| o.show_queries = v),
    ),
    OptionField::new("network", Setter::NonEmptyString(|o: &mut ClusterOptions, v| o.network = v)),
    OptionField::new(
        "trustCertificate",
        Setter::NonEmptyString(|o: &mut ClusterOptions, v| o.trust_certificate = v),
    ),
    OptionField::new(
        "userAgentExtra",
        Setter::NonEmptyString(|o: &mut ClusterOptions, v| o.user_agent_extra = v),
    ),
    OptionField::new("tlsVerify", Setter::Text(tls_verify)),
    OptionField::new(
        "thresholdLoggingTracerOptions",
        Setter::Object(|o: &mut ClusterOptions, v| {
            populate_object(&mut o.tracing_options, v, TRACER_FIELDS)
        }),
    ),
    OptionField::new(
        "loggingMeterOptions",
        Setter::Object(|o: &mut ClusterOptions, v| {
            populate_object(&mut o.meter_options, v, METER_FIELDS)
        }),
    ),
];

fn expect_object<'a>(options: &'a Value) -> CoreResult<&'a Map<String, Value>> {
    options.as_object().ok_or_else(|| {
        CoreError::invalid_argument(location!(), "expected object for cluster options")
    })
}

/// Applies host cluster options on top of `target`.
pub fn apply_cluster_options(target: &mut ClusterOptions, options: &Value) -> CoreResult<()> {
    populate_object(target, expect_object(options)?, CLUSTER_FIELDS)
}

fn string_field(auth: &Map<String, Value>, key: &str, what: &str) -> CoreResult<String> {
    auth.get(key)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| {
            CoreError::invalid_argument(
                location!(),
                format!("expected {what} to be a string in the authenticator"),
            )
        })
}

/// Reads the `authenticator` object of the cluster options.
pub fn extract_credentials(options: &Value) -> CoreResult<Credentials> {
    let auth = expect_object(options)?
        .get("authenticator")
        .and_then(Value::as_object)
        .ok_or_else(|| CoreError::invalid_argument(location!(), "missing authenticator"))?;

    let kind = auth.get("type").and_then(Value::as_str).ok_or_else(|| {
        CoreError::invalid_argument(location!(), "unexpected type of the authenticator")
    })?;

    match kind {
        "password" => {
            let username = string_field(auth, "username", "username")?;
            let password = string_field(auth, "password", "password")?;
            let allowed_sasl_mechanisms = match auth.get("allowedSaslMechanisms") {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::Array(items)) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect(),
                Some(_) => {
                    return Err(CoreError::invalid_argument(
                        location!(),
                        "expected allowedSaslMechanisms to be an array in the authenticator",
                    ))
                }
            };
            Ok(Credentials::Password {
                username,
                password,
                allowed_sasl_mechanisms,
            })
        }
        "certificate" => Ok(Credentials::Certificate {
            certificate_path: string_field(auth, "certificatePath", "certificate path")?,
            key_path: string_field(auth, "keyPath", "key path")?,
        }),
        other => Err(CoreError::invalid_argument(
            location!(),
            format!("unknown type of the authenticator: {other}"),
        )),
    }
}

fn camel_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper = false;
    for c in key.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Option-map view of the connection string's query parameters.
///
/// Keys are matched as host names or in snake case (`key_value_timeout`).
/// Values are converted to the JSON kind the matching setter expects; values
/// that do not convert stay strings and fail validation. Unknown keys are
/// skipped.
fn connection_string_options(connection_string: &ConnectionString) -> Map<String, Value> {
    let mut options = Map::new();
    for (key, raw) in &connection_string.params {
        let name = camel_case(key);
        let Some(field) = CLUSTER_FIELDS.iter().find(|field| field.name == name) else {
            debug!(parameter = %key, "Ignoring unknown connection string parameter");
            continue;
        };
        let text = || Value::String(raw.clone());
        let value = match &field.setter {
            Setter::Boolean(_) => raw.parse::<bool>().map(Value::Bool).unwrap_or_else(|_| text()),
            Setter::Unsigned(_)
            | Setter::U32(_)
            | Setter::U16(_)
            | Setter::Millis(_)
            | Setter::Integer(_) => raw.parse::<u64>().map(Value::from).unwrap_or_else(|_| text()),
            _ => text(),
        };
        options.insert(name, value);
    }
    options
}

/// Builds the origin of a new connection.
///
/// The connection string is parsed first (`parsing_failure` on error). Its
/// query parameters are applied next, then the options, which win over them.
/// Credentials are read last.
pub fn cluster_origin(connection_string: &str, options: &Value) -> CoreResult<ClusterOrigin> {
    let connection_string: ConnectionString = connection_string.parse().map_err(|err| {
        CoreError::with_message(ErrorCode::ParsingFailure, location!(), format!("{err}"))
    })?;

    let mut cluster_options = ClusterOptions {
        enable_tls: connection_string.tls(),
        ..ClusterOptions::default()
    };
    let params = connection_string_options(&connection_string);
    populate_object(&mut cluster_options, &params, CLUSTER_FIELDS)?;
    apply_cluster_options(&mut cluster_options, options)?;
    let credentials = extract_credentials(options)?;

    debug!(
        connection_string = %connection_string,
        nodes = connection_string.nodes.len(),
        tls = cluster_options.enable_tls,
        "Cluster origin prepared"
    );
    Ok(ClusterOrigin {
        connection_string,
        credentials,
        options: cluster_options,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn password_options() -> Value {
        json!({
            "authenticator": {
                "type": "password",
                "username": "Administrator",
                "password": "password"
            },
            "keyValueTimeout": 1200,
            "tlsVerify": "none",
            "thresholdLoggingTracerOptions": { "queryThreshold": 2000 },
            "loggingMeterOptions": { "emitInterval": 60000 }
        })
    }

    #[test]
    fn origin_combines_connection_string_options_and_credentials() {
        let origin = cluster_origin("couchbases://db1,db2/travel", &password_options()).unwrap();
        assert_eq!(origin.connection_string.nodes.len(), 2);
        assert!(origin.options.enable_tls);
        assert_eq!(origin.options.key_value_timeout, Duration::from_millis(1200));
        assert_eq!(origin.options.tls_verify, TlsVerifyMode::None);
        assert_eq!(origin.options.tracing_options.query_threshold, Duration::from_secs(2));
        assert_eq!(origin.options.meter_options.emit_interval, Duration::from_secs(60));
        assert!(matches!(
            origin.credentials,
            Credentials::Password { ref username, .. } if username == "Administrator"
        ));
    }

    #[test]
    fn connection_string_parameters_sit_beneath_options() {
        let origin = cluster_origin(
            "couchbase://db1?network=external&key_value_timeout=3000\
             &enable_mutation_tokens=false&kvPoolSize=4",
            &password_options(),
        )
        .unwrap();
        assert_eq!(origin.options.network, "external");
        assert!(!origin.options.enable_mutation_tokens);
        // keyValueTimeout is also in the options map, which wins.
        assert_eq!(origin.options.key_value_timeout, Duration::from_millis(1200));

        let origin =
            cluster_origin("couchbase://db1?queryTimeout=9000", &password_options()).unwrap();
        assert_eq!(origin.options.query_timeout, Duration::from_secs(9));
    }

    #[test]
    fn bad_connection_string_parameter_is_invalid_argument() {
        let err = cluster_origin("couchbase://db1?enable_tls=maybe", &password_options())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidArgument);
        assert_eq!(err.message, "expected enableTls to be a boolean in the options");
    }

    #[test]
    fn malformed_connection_string_is_parsing_failure() {
        let err = cluster_origin("ftp://db1", &password_options()).unwrap_err();
        assert_eq!(err.code, ErrorCode::ParsingFailure);
        assert!(err.message.contains("ftp"));
    }

    #[test]
    fn option_errors_are_invalid_argument() {
        let err = cluster_origin("couchbase://db1", &json!({ "keyValueTimeout": -1 })).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidArgument);

        let err = cluster_origin("couchbase://db1", &json!({ "network": "" })).unwrap_err();
        assert_eq!(err.message, "expected network to be a non-empty string in the options");

        let err = cluster_origin("couchbase://db1", &json!({ "tlsVerify": "chain" })).unwrap_err();
        assert!(err.message.contains("chain"));

        let err = cluster_origin("couchbase://db1", &json!([])).unwrap_err();
        assert_eq!(err.message, "expected object for cluster options");
    }

    #[test]
    fn credentials_cover_password_and_certificate() {
        let err = extract_credentials(&json!({})).unwrap_err();
        assert_eq!(err.message, "missing authenticator");

        let options = json!({ "authenticator": { "type": "password", "username": "u" } });
        let err = extract_credentials(&options).unwrap_err();
        assert_eq!(err.message, "expected password to be a string in the authenticator");

        let creds = extract_credentials(&json!({
            "authenticator": {
                "type": "certificate",
                "certificatePath": "/c.pem",
                "keyPath": "/k.pem"
            }
        }))
        .unwrap();
        assert_eq!(
            creds,
            Credentials::Certificate {
                certificate_path: "/c.pem".into(),
                key_path: "/k.pem".into(),
            }
        );

        let err = extract_credentials(&json!({ "authenticator": { "type": "ldap" } })).unwrap_err();
        assert_eq!(err.message, "unknown type of the authenticator: ldap");
    }

    #[test]
    fn sasl_mechanisms_keep_only_strings() {
        let creds = extract_credentials(&json!({
            "authenticator": {
                "type": "password", "username": "u", "password": "p",
                "allowedSaslMechanisms": ["SCRAM-SHA512", 5, "PLAIN"]
            }
        }))
        .unwrap();
        match creds {
            Credentials::Password { allowed_sasl_mechanisms, .. } => {
                assert_eq!(allowed_sasl_mechanisms, vec!["SCRAM-SHA512", "PLAIN"])
            }
            other => panic!("unexpected credentials {other:?}"),
        }
    }
}
