//! Logging setup for providers
//!
//! Logs go to stderr; stdout belongs to the plugin handshake. The level
//! follows Terraform's own switches: `TF_LOG_PROVIDER` wins over `TF_LOG`,
//! and `info` is used when neither is set.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_LEVEL: &str = "info";

/// Maps a Terraform log level (`TRACE`, `DEBUG`, `INFO`, `WARN`, `ERROR`,
/// `OFF`, `JSON`) to a tracing filter directive.
pub fn level_directive(tf_log: &str) -> &'static str {
    match tf_log.trim().to_ascii_uppercase().as_str() {
        "TRACE" | "JSON" => "trace",
        "DEBUG" => "debug",
        "INFO" => "info",
        "WARN" => "warn",
        "ERROR" => "error",
        "OFF" => "off",
        _ => DEFAULT_LEVEL,
    }
}

/// Resolves the filter directive from a variable lookup
pub fn directive_from<F>(lookup: F) -> &'static str
where
    F: Fn(&str) -> Option<String>,
{
    let set = |key: &str| lookup(key).filter(|level| !level.trim().is_empty());

    set("TF_LOG_PROVIDER")
        .or_else(|| set("TF_LOG"))
        .map(|level| level_directive(&level))
        .unwrap_or(DEFAULT_LEVEL)
}

/// Installs the global subscriber, returning false if one was already set.
pub fn try_init_logging() -> bool {
    let filter = EnvFilter::new(directive_from(|key| std::env::var(key).ok()));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false),
        )
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn maps_terraform_levels() {
        assert_eq!(level_directive("TRACE"), "trace");
        assert_eq!(level_directive("debug"), "debug");
        assert_eq!(level_directive(" WARN "), "warn");
        assert_eq!(level_directive("OFF"), "off");
        assert_eq!(level_directive("JSON"), "trace");
        assert_eq!(level_directive("verbose"), "info");
    }

    #[test]
    fn provider_level_wins_over_global_level() {
        let vars = HashMap::from([
            ("TF_LOG", "ERROR".to_string()),
            ("TF_LOG_PROVIDER", "DEBUG".to_string()),
        ]);

        assert_eq!(directive_from(|key| vars.get(key).cloned()), "debug");
    }

    #[test]
    fn empty_provider_level_falls_back_to_global_level() {
        let vars = HashMap::from([
            ("TF_LOG", "DEBUG".to_string()),
            ("TF_LOG_PROVIDER", "".to_string()),
        ]);

        assert_eq!(directive_from(|key| vars.get(key).cloned()), "debug");
    }

    #[test]
    fn directive_parses_as_filter() {
        assert!(EnvFilter::try_new(directive_from(|_| Some("WARN".to_string()))).is_ok());
    }

    #[test]
    fn defaults_to_info() {
        assert_eq!(directive_from(|_| None), "info");
        assert_eq!(directive_from(|_| Some("  ".to_string())), "info");
    }
}
