//! # Runtime Configuration Module
//!
//! [`ServerConfig`] controls how the dispatch entry point behaves. It can be
//! built in code, read from environment variables, or loaded from YAML.
//!
//! ## Environment Variables
//!
//! ### `SEGROUTE_MIDDLEWARE_SCOPE`
//!
//! `frontier` (default) or `matched_path`. See
//! [`MiddlewareScope`](crate::router::MiddlewareScope).
//!
//! ### `SEGROUTE_NOT_FOUND_BODY`
//!
//! Body written when no route matches. Default: `NOT FOUND`.
//!
//! ## YAML
//!
//! ```yaml
//! middleware_scope: matched_path
//! not_found_status: 404
//! not_found_body: "nothing here"
//! ```

use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::router::MiddlewareScope;

pub const DEFAULT_NOT_FOUND_STATUS: u16 = 404;
pub const DEFAULT_NOT_FOUND_BODY: &str = "NOT FOUND";

/// Behaviour of [`HttpServer`](crate::server::HttpServer) dispatch
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub middleware_scope: MiddlewareScope,
    pub not_found_status: u16,
    pub not_found_body: String,
}

/// Frontier scope and a `404 NOT FOUND` response for unmatched requests
impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            middleware_scope: MiddlewareScope::default(),
            not_found_status: DEFAULT_NOT_FOUND_STATUS,
            not_found_body: DEFAULT_NOT_FOUND_BODY.to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    /// `not_found_status` has no variable and keeps its default.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(scope) = env::var("SEGROUTE_MIDDLEWARE_SCOPE") {
            config.middleware_scope = MiddlewareScope::parse(&scope);
        }
        if let Ok(body) = env::var("SEGROUTE_NOT_FOUND_BODY") {
            config.not_found_body = body;
        }
        config
    }

    /// Parse YAML; missing keys keep their defaults
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("Failed to parse server config")
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Serializes tests that mutate process environment variables
    static ENV_LOCK: parking_lot::Mutex<()> = parking_lot::Mutex::new(());

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.middleware_scope, MiddlewareScope::Frontier);
        assert_eq!(config.not_found_status, 404);
        assert_eq!(config.not_found_body, "NOT FOUND");
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = ServerConfig::from_yaml_str("middleware_scope: matched_path\n").unwrap();
        assert_eq!(config.middleware_scope, MiddlewareScope::MatchedPath);
        assert_eq!(config.not_found_body, "NOT FOUND");
    }

    #[test]
    fn test_from_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.yaml");
        fs::write(&path, "not_found_status: 410\nnot_found_body: gone\n").unwrap();
        let config = ServerConfig::from_yaml_file(&path).unwrap();
        assert_eq!(config.not_found_status, 410);
        assert_eq!(config.not_found_body, "gone");
    }

    #[test]
    fn test_invalid_yaml_errors() {
        assert!(ServerConfig::from_yaml_str("middleware_scope: [1, 2]").is_err());
        assert!(ServerConfig::from_yaml_file("/definitely/missing.yaml").is_err());
    }

    #[test]
    fn test_scope_parse() {
        assert_eq!(MiddlewareScope::parse("MATCHED_PATH"), MiddlewareScope::MatchedPath);
        assert_eq!(MiddlewareScope::parse("frontier"), MiddlewareScope::Frontier);
        assert_eq!(MiddlewareScope::parse("bogus"), MiddlewareScope::Frontier);
        assert_eq!(MiddlewareScope::parse("matched-path"), MiddlewareScope::MatchedPath);
        assert_eq!(MiddlewareScope::parse("path"), MiddlewareScope::Frontier);
    }

    #[test]
    fn test_from_env_overrides_defaults() {
        let _guard = ENV_LOCK.lock();
        env::set_var("SEGROUTE_MIDDLEWARE_SCOPE", "matched-path");
        env::set_var("SEGROUTE_NOT_FOUND_BODY", "no such route");
        let config = ServerConfig::from_env();
        env::remove_var("SEGROUTE_MIDDLEWARE_SCOPE");
        env::remove_var("SEGROUTE_NOT_FOUND_BODY");

        assert_eq!(config.middleware_scope, MiddlewareScope::MatchedPath);
        assert_eq!(config.not_found_body, "no such route");
        assert_eq!(config.not_found_status, DEFAULT_NOT_FOUND_STATUS);
    }

    #[test]
    fn test_from_env_without_variables() {
        let _guard = ENV_LOCK.lock();
        env::remove_var("SEGROUTE_MIDDLEWARE_SCOPE");
        env::remove_var("SEGROUTE_NOT_FOUND_BODY");
        assert_eq!(ServerConfig::from_env(), ServerConfig::default());
    }
}
