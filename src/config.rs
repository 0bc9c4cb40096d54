use std::path::PathBuf;
use std::str::FromStr;
use tracing::warn;

pub const DEFAULT_BCRA_BASE_URL: &str = "https://api.bcra.gob.ar";
pub const DEFAULT_DATA_BASE_URL: &str = "https://github.com/sfkaplan/Dash_Econometrica/raw/refs/heads/main";

/// Runtime settings, read from the environment (and `.env` if present).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bcra_base_url: String,
    /// The BCRA endpoint has served broken certificate chains; the dashboards skip verification for it.
    pub bcra_accept_invalid_certs: bool,
    pub http_timeout_secs: u64,
    /// Base URL for table and listings files.
    pub data_base_url: String,
    /// When set, table and listings files are read from this directory instead of `data_base_url`.
    pub data_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            bcra_base_url: DEFAULT_BCRA_BASE_URL.to_string(),
            bcra_accept_invalid_certs: true,
            http_timeout_secs: 30,
            data_base_url: DEFAULT_DATA_BASE_URL.to_string(),
            data_dir: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; malformed values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = AppConfig::default();

        AppConfig {
            bcra_base_url: lookup("BCRA_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(defaults.bcra_base_url),
            bcra_accept_invalid_certs: parse_or("BCRA_ACCEPT_INVALID_CERTS", lookup("BCRA_ACCEPT_INVALID_CERTS"), defaults.bcra_accept_invalid_certs),
            http_timeout_secs: parse_or("HTTP_TIMEOUT_SECS", lookup("HTTP_TIMEOUT_SECS"), defaults.http_timeout_secs),
            data_base_url: lookup("DATA_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(defaults.data_base_url),
            data_dir: lookup("DATA_DIR").filter(|v| !v.trim().is_empty()).map(PathBuf::from),
        }
    }

    /// Where a named data file lives: local directory if configured, remote otherwise.
    pub fn data_location(&self, file_name: &str) -> String {
        match &self.data_dir {
            Some(dir) => dir.join(file_name).to_string_lossy().to_string(),
            None => format!("{}/{}", self.data_base_url, file_name),
        }
    }
}

fn parse_or<T: FromStr + Copy + std::fmt::Debug>(key: &str, raw: Option<String>, default: T) -> T {
    match raw {
        Some(value) => value.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring malformed {}='{}', using {:?}", key, value, default);
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_when_unset() {
        let cfg = AppConfig::from_lookup(|_| None);
        assert_eq!(cfg.bcra_base_url, DEFAULT_BCRA_BASE_URL);
        assert!(cfg.bcra_accept_invalid_certs);
        assert_eq!(cfg.http_timeout_secs, 30);
        assert!(cfg.data_dir.is_none());
    }

    #[test]
    fn test_overrides_and_malformed_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("BCRA_BASE_URL", "http://localhost:8080/"),
            ("BCRA_ACCEPT_INVALID_CERTS", "false"),
            ("HTTP_TIMEOUT_SECS", "soon"),
            ("DATA_DIR", "/tmp/data"),
        ]);
        let cfg = AppConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(cfg.bcra_base_url, "http://localhost:8080");
        assert!(!cfg.bcra_accept_invalid_certs);
        assert_eq!(cfg.http_timeout_secs, 30);
        assert_eq!(cfg.data_location("casas.csv"), "/tmp/data/casas.csv");
    }

    #[test]
    fn test_remote_data_location() {
        let cfg = AppConfig::default();
        assert_eq!(
            cfg.data_location("casas.csv"),
            format!("{}/casas.csv", DEFAULT_DATA_BASE_URL)
        );
    }
}
