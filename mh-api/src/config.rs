//! Configuration resolution from CLI args and the environment

use crate::cli::Args;
use crate::error::ConfigError;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use zeroize::Zeroizing;

/// Environment variable holding the bearer key for the identify routes
pub const API_KEY_VAR: &str = "MH_API_KEY";

/// Resolved runtime configuration
pub struct Config {
    /// Listen address
    pub bind: SocketAddr,
    /// MouseHunt base URL
    pub base_url: String,
    /// Upstream request timeout
    pub timeout: Duration,
    /// Identity store file, `None` for memory only
    pub store_path: Option<PathBuf>,
    /// Expired-session marker override
    pub expired_marker: Option<String>,
    /// Bearer key for the identify routes (zeroized on drop)
    pub api_key: Option<Zeroizing<String>>,
}

impl Config {
    /// Build config from CLI args and the environment
    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        let api_key = std::env::var(API_KEY_VAR).ok().map(Zeroizing::new);
        Self::resolve(args, api_key)
    }

    fn resolve(args: Args, api_key: Option<Zeroizing<String>>) -> Result<Self, ConfigError> {
        let store_path = if args.memory_store {
            None
        } else {
            Some(match args.store {
                Some(path) => expand_tilde(&path),
                None => default_store_path()?,
            })
        };

        let api_key = api_key.filter(|key| !key.trim().is_empty());
        if api_key.is_none() {
            log::warn!("{API_KEY_VAR} is not set, identify routes are open");
        }

        Ok(Config {
            bind: args.bind,
            base_url: args.base_url,
            timeout: args.timeout,
            store_path,
            expired_marker: args.expired_marker,
            api_key,
        })
    }
}

/// `{data dir}/mh-api/identities.json`
fn default_store_path() -> Result<PathBuf, ConfigError> {
    dirs::data_dir()
        .map(|dir| dir.join("mh-api").join("identities.json"))
        .ok_or_else(|| {
            ConfigError("No data directory on this platform, pass --store or --memory-store".to_string())
        })
}

/// Expand ~ to home directory
fn expand_tilde(path: &Path) -> PathBuf {
    if let Some(path_str) = path.to_str()
        && (path_str.starts_with("~/") || path_str == "~")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(path_str.trim_start_matches('~').trim_start_matches('/'));
    }
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(extra: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("mh-api").chain(extra.iter().copied())).unwrap()
    }

    #[test]
    fn test_memory_store_has_no_path() {
        let config = Config::resolve(args(&["--memory-store"]), None).unwrap();
        assert!(config.store_path.is_none());
    }

    #[test]
    fn test_explicit_store_path() {
        let config = Config::resolve(args(&["--store", "/tmp/links.json"]), None).unwrap();
        assert_eq!(config.store_path, Some(PathBuf::from("/tmp/links.json")));
    }

    #[test]
    fn test_blank_api_key_is_ignored() {
        let config =
            Config::resolve(args(&["--memory-store"]), Some(Zeroizing::new("  ".into()))).unwrap();
        assert!(config.api_key.is_none());

        let config =
            Config::resolve(args(&["--memory-store"]), Some(Zeroizing::new("k".into()))).unwrap();
        assert_eq!(config.api_key.as_deref().map(String::as_str), Some("k"));
    }

    #[test]
    fn test_expand_tilde() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde(Path::new("~/a/b.json")), home.join("a/b.json"));
            assert_eq!(expand_tilde(Path::new("~")), home);
        }
        assert_eq!(expand_tilde(Path::new("/abs")), PathBuf::from("/abs"));
    }
}
