//! Environment-driven configuration.
//!
//! | variable            | default                 |
//! |---------------------|-------------------------|
//! | `APP_URL`           | `http://localhost:3000` |
//! | `BIND_ADDR`         | `0.0.0.0:8080`          |
//! | `DATABASE_URL`      | unset: in-memory store  |
//! | `IDENTITY_URL`      | unset: in-memory provider |
//! | `IDENTITY_ANON_KEY` | required with `IDENTITY_URL` |

use quill_infra::GoTrueConfig;

pub const DEFAULT_APP_URL: &str = "http://localhost:3000";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Public base URL; reset links are built from it.
    pub app_url: String,
    pub bind_addr: String,
    pub database_url: Option<String>,
    pub identity: Option<GoTrueConfig>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let app_url = get("APP_URL").unwrap_or_else(|| {
            tracing::warn!(
                default = DEFAULT_APP_URL,
                "APP_URL not set; reset links will use the dev default"
            );
            DEFAULT_APP_URL.to_string()
        });

        let identity = match (get("IDENTITY_URL"), get("IDENTITY_ANON_KEY")) {
            (Some(base_url), Some(anon_key)) => Some(GoTrueConfig { base_url, anon_key }),
            (Some(_), None) => {
                tracing::warn!(
                    "IDENTITY_URL set without IDENTITY_ANON_KEY; using in-memory identity provider"
                );
                None
            }
            _ => None,
        };

        Self {
            app_url,
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            database_url: get("DATABASE_URL"),
            identity,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let c = config(&[]);
        assert_eq!(c.app_url, DEFAULT_APP_URL);
        assert_eq!(c.bind_addr, DEFAULT_BIND_ADDR);
        assert!(c.database_url.is_none());
        assert!(c.identity.is_none());
    }

    #[test]
    fn identity_needs_both_url_and_key() {
        assert!(config(&[("IDENTITY_URL", "https://id.example.com")]).identity.is_none());

        let c = config(&[
            ("IDENTITY_URL", "https://id.example.com"),
            ("IDENTITY_ANON_KEY", "anon"),
            ("APP_URL", "https://cms.example.com"),
            ("DATABASE_URL", "  "),
        ]);
        let identity = c.identity.unwrap();
        assert_eq!(identity.base_url, "https://id.example.com");
        assert_eq!(c.app_url, "https://cms.example.com");
        assert!(c.database_url.is_none());
    }
}
