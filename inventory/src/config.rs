//! Provider configuration resolution
//!
//! Host and port come from the provider block, then the `INVENTORY_HOST` and
//! `INVENTORY_PORT` environment variables, then fixed defaults. A value that
//! is still unknown at configure time is an error.

use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use url::Url;

pub const HOST_ENV: &str = "INVENTORY_HOST";
pub const PORT_ENV: &str = "INVENTORY_PORT";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: &str = "8080";

/// A single provider attribute as seen at configure time
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Unknown,
    Null,
    Value(String),
}

impl ConfigValue {
    pub fn from_config(config: &DynamicValue, name: &str) -> Self {
        match config.get(&AttributePath::new(name)) {
            Ok(Dynamic::Unknown) => ConfigValue::Unknown,
            Ok(Dynamic::String(value)) => ConfigValue::Value(value.clone()),
            _ => ConfigValue::Null,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub host: String,
    pub port: String,
}

impl Endpoint {
    /// `http://{host}:{port}/`
    pub fn base_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&format!("http://{}:{}/", self.host, self.port))
    }
}

/// Resolve the service endpoint from provider config and an environment
/// lookup. Returns `None` when an error diagnostic was produced.
pub fn resolve_endpoint<F>(config: &DynamicValue, env: F) -> (Option<Endpoint>, Vec<Diagnostic>)
where
    F: Fn(&str) -> Option<String>,
{
    let host = ConfigValue::from_config(config, "host");
    let port = ConfigValue::from_config(config, "port");
    let mut diagnostics = Vec::new();

    if host == ConfigValue::Unknown {
        diagnostics.push(
            Diagnostic::error(
                "Unknown Inventory service Host",
                format!(
                    "The provider cannot create the Inventory API client as there is an unknown configuration value for the Inventory API host. \
                     Either target apply the source of the value first, set the value statically in the configuration, or use the {} environment variable.",
                    HOST_ENV
                ),
            )
            .with_attribute(AttributePath::new("host")),
        );
    }

    if port == ConfigValue::Unknown {
        diagnostics.push(
            Diagnostic::error(
                "Unknown Inventory service Port",
                format!(
                    "The provider cannot create the Inventory API client as there is an unknown configuration value for the Inventory API port. \
                     Either target apply the source of the value first, set the value statically in the configuration, or use the {} environment variable.",
                    PORT_ENV
                ),
            )
            .with_attribute(AttributePath::new("port")),
        );
    }

    if !diagnostics.is_empty() {
        return (None, diagnostics);
    }

    let mut host = pick(host, env(HOST_ENV));
    let mut port = pick(port, env(PORT_ENV));

    if host.is_empty() {
        tracing::warn!(default = DEFAULT_HOST, "No Inventory API host configured");
        diagnostics.push(
            Diagnostic::warning(
                format!("Missing Inventory API Host (using default value: {})", DEFAULT_HOST),
                format!(
                    "The provider is using a default value as there is a missing or empty value for the Inventory API host. \
                     Set the host value in the configuration or use the {} environment variable. \
                     If either is already set, ensure the value is not empty.",
                    HOST_ENV
                ),
            )
            .with_attribute(AttributePath::new("host")),
        );
        host = DEFAULT_HOST.to_string();
    }

    if port.is_empty() {
        tracing::warn!(default = DEFAULT_PORT, "No Inventory API port configured");
        diagnostics.push(
            Diagnostic::warning(
                format!("Missing Inventory API port (using default value: {})", DEFAULT_PORT),
                format!(
                    "The provider is using a default value as there is a missing or empty value for the Inventory API port. \
                     Set the port value in the configuration or use the {} environment variable. \
                     If either is already set, ensure the value is not empty.",
                    PORT_ENV
                ),
            )
            .with_attribute(AttributePath::new("port")),
        );
        port = DEFAULT_PORT.to_string();
    }

    (Some(Endpoint { host, port }), diagnostics)
}

/// A non-null config value wins over the environment, even when empty
fn pick(config: ConfigValue, env: Option<String>) -> String {
    match config {
        ConfigValue::Value(value) => value,
        _ => env.unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tfplug::types::DiagnosticSeverity;

    fn config(host: Dynamic, port: Dynamic) -> DynamicValue {
        let mut config = DynamicValue::object();
        config.set(&AttributePath::new("host"), host).unwrap();
        config.set(&AttributePath::new("port"), port).unwrap();
        config
    }

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn config_wins_over_env() {
        let (endpoint, diags) = resolve_endpoint(
            &config(
                Dynamic::String("inventory.local".to_string()),
                Dynamic::String("9000".to_string()),
            ),
            env(&[(HOST_ENV, "env-host"), (PORT_ENV, "7000")]),
        );

        assert!(diags.is_empty());
        assert_eq!(
            endpoint.unwrap(),
            Endpoint {
                host: "inventory.local".to_string(),
                port: "9000".to_string(),
            }
        );
    }

    #[test]
    fn env_used_when_config_is_null() {
        let (endpoint, diags) = resolve_endpoint(
            &config(Dynamic::Null, Dynamic::Null),
            env(&[(HOST_ENV, "env-host"), (PORT_ENV, "7000")]),
        );

        assert!(diags.is_empty());
        let endpoint = endpoint.unwrap();
        assert_eq!(endpoint.host, "env-host");
        assert_eq!(endpoint.port, "7000");
    }

    #[test]
    fn defaults_used_with_warnings() {
        let (endpoint, diags) =
            resolve_endpoint(&DynamicValue::object(), env(&[]));

        let endpoint = endpoint.unwrap();
        assert_eq!(endpoint.host, DEFAULT_HOST);
        assert_eq!(endpoint.port, DEFAULT_PORT);

        assert_eq!(diags.len(), 2);
        assert!(diags.iter().all(|d| d.severity == DiagnosticSeverity::Warning));
        assert_eq!(
            diags[0].summary,
            "Missing Inventory API Host (using default value: 127.0.0.1)"
        );
        assert_eq!(diags[0].attribute, Some(AttributePath::new("host")));
        assert_eq!(
            diags[1].summary,
            "Missing Inventory API port (using default value: 8080)"
        );
        assert_eq!(diags[1].attribute, Some(AttributePath::new("port")));
    }

    #[test]
    fn explicit_empty_config_overrides_env_then_defaults() {
        let (endpoint, diags) = resolve_endpoint(
            &config(Dynamic::String(String::new()), Dynamic::Null),
            env(&[(HOST_ENV, "env-host"), (PORT_ENV, "7000")]),
        );

        let endpoint = endpoint.unwrap();
        assert_eq!(endpoint.host, DEFAULT_HOST);
        assert_eq!(endpoint.port, "7000");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].attribute, Some(AttributePath::new("host")));
    }

    #[test]
    fn unknown_host_is_fatal() {
        let (endpoint, diags) = resolve_endpoint(
            &config(Dynamic::Unknown, Dynamic::String("9000".to_string())),
            env(&[(HOST_ENV, "env-host")]),
        );

        assert!(endpoint.is_none());
        assert_eq!(diags.len(), 1);
        assert!(diags[0].is_error());
        assert_eq!(diags[0].summary, "Unknown Inventory service Host");
        assert_eq!(diags[0].attribute, Some(AttributePath::new("host")));
    }

    #[test]
    fn unknown_port_is_fatal_and_skips_defaults() {
        let (endpoint, diags) = resolve_endpoint(
            &config(Dynamic::Null, Dynamic::Unknown),
            env(&[]),
        );

        assert!(endpoint.is_none());
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].summary, "Unknown Inventory service Port");
        assert_eq!(diags[0].attribute, Some(AttributePath::new("port")));
    }

    #[test]
    fn base_url_has_trailing_slash() {
        let endpoint = Endpoint {
            host: "10.0.0.5".to_string(),
            port: "8080".to_string(),
        };
        assert_eq!(endpoint.base_url().unwrap().as_str(), "http://10.0.0.5:8080/");

        let endpoint = Endpoint {
            host: "10.0.0.5".to_string(),
            port: "http".to_string(),
        };
        assert!(endpoint.base_url().is_err());
    }
}
