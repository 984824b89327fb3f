//! Application settings read from `APP_*` environment variables.
//!
//! | variable          | default              |
//! |-------------------|----------------------|
//! | `APP_NAME`        | `perch`              |
//! | `APP_ENV`         | `local`              |
//! | `APP_DEBUG`       | `true`               |
//! | `APP_URL`         | `http://localhost`   |
//! | `APP_ROUTE_CACHE` | unset (no cache)     |
//! | `APP_ADDR`        | `127.0.0.1:8080`     |

use std::path::PathBuf;

use serde::Deserialize;

const PREFIX: &str = "APP_";

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_env")]
    pub env: String,
    /// Shows failure details on error pages and disables the route cache.
    #[serde(default = "default_debug")]
    pub debug: bool,
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default)]
    pub route_cache: Option<PathBuf>,
    #[serde(default = "default_addr")]
    pub addr: String,
}

fn default_name() -> String {
    "perch".to_string()
}

fn default_env() -> String {
    "local".to_string()
}

fn default_debug() -> bool {
    true
}

fn default_url() -> String {
    "http://localhost".to_string()
}

fn default_addr() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            env: default_env(),
            debug: default_debug(),
            url: default_url(),
            route_cache: None,
            addr: default_addr(),
        }
    }
}

impl AppConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::prefixed(PREFIX).from_env()
    }

    /// Reads the configuration from explicit `(name, value)` pairs, using the same
    /// `APP_` names as the environment.
    pub fn from_vars<I>(vars: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::prefixed(PREFIX).from_iter(vars)
    }

    pub fn is_production(&self) -> bool {
        matches!(self.env.to_ascii_lowercase().as_str(), "production" | "prod")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = AppConfig::from_vars(vars(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(config.debug);
        assert!(!config.is_production());
    }

    #[test]
    fn prefixed_variables_override_defaults() {
        let config = AppConfig::from_vars(vars(&[
            ("APP_NAME", "shop"),
            ("APP_ENV", "Production"),
            ("APP_DEBUG", "false"),
            ("APP_ROUTE_CACHE", "/tmp/routes.json"),
            ("APP_ADDR", "0.0.0.0:9000"),
            ("DEBUG", "true"),
        ]))
        .unwrap();

        assert_eq!(config.name, "shop");
        assert!(!config.debug);
        assert!(config.is_production());
        assert_eq!(config.route_cache, Some(PathBuf::from("/tmp/routes.json")));
        assert_eq!(config.addr, "0.0.0.0:9000");
        assert_eq!(config.url, "http://localhost");
    }

    #[test]
    fn malformed_values_are_errors() {
        assert!(AppConfig::from_vars(vars(&[("APP_DEBUG", "sometimes")])).is_err());
    }
}
