//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The access token is never read from the TOML; it comes from
//! ADMIN_ACCESS_TOKEN or from the session file written by `login`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use admin_auth::{DEFAULT_REFRESH_PATH, DEFAULT_TOKEN_MAX_AGE_SECS, DEFAULT_TOKEN_SKEW_SECS};
use admin_client::ClientConfig;
use common::Secret;
use serde::Deserialize;

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    /// Seed token from ADMIN_ACCESS_TOKEN.
    #[serde(skip)]
    pub access_token: Option<Secret<String>>,
}

/// Backend connection settings
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    /// Required, but may come from ADMIN_API_BASE_URL instead of the file.
    #[serde(default)]
    pub base_url: String,
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,
    #[serde(default = "default_token_skew")]
    pub token_skew_secs: u64,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Where the session survives between invocations
#[derive(Debug, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default = "default_token_file")]
    pub token_file: PathBuf,
    #[serde(default = "default_token_max_age")]
    pub token_max_age_secs: u64,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            token_file: default_token_file(),
            token_max_age_secs: default_token_max_age(),
        }
    }
}

fn default_refresh_path() -> String {
    DEFAULT_REFRESH_PATH.to_owned()
}

fn default_token_skew() -> u64 {
    DEFAULT_TOKEN_SKEW_SECS
}

fn default_timeout() -> u64 {
    admin_client::config::DEFAULT_TIMEOUT_SECS
}

fn default_token_file() -> PathBuf {
    PathBuf::from("admin-cli-session.json")
}

fn default_token_max_age() -> u64 {
    DEFAULT_TOKEN_MAX_AGE_SECS
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if let Ok(url) = std::env::var("ADMIN_API_BASE_URL") {
            config.api.base_url = url;
        }
        if let Ok(token) = std::env::var("ADMIN_ACCESS_TOKEN") {
            let token = token.trim().to_owned();
            if !token.is_empty() {
                config.access_token = Some(Secret::new(token));
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> common::Result<()> {
        if self.api.base_url.is_empty() {
            return Err(common::Error::Config(
                "base_url is required (set [api].base_url or ADMIN_API_BASE_URL)".into(),
            ));
        }
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://") {
            return Err(common::Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                self.api.base_url
            )));
        }
        if self.api.refresh_path.is_empty() {
            return Err(common::Error::Config("refresh_path must not be empty".into()));
        }
        if self.api.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }
        if self.credentials.token_max_age_secs == 0 {
            return Err(common::Error::Config(
                "token_max_age_secs must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(self.api.base_url.clone())
            .with_refresh_path(self.api.refresh_path.clone())
            .with_token_skew(Duration::from_secs(self.api.token_skew_secs))
            .with_timeout(Duration::from_secs(self.api.timeout_secs))
    }

    pub fn token_max_age(&self) -> Duration {
        Duration::from_secs(self.credentials.token_max_age_secs)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("admin-cli.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Serializes tests that mutate environment variables.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// SAFETY: Callers must hold ENV_MUTEX to prevent concurrent env mutation.
    unsafe fn set_env(key: &str, val: &str) {
        unsafe { std::env::set_var(key, val) };
    }

    unsafe fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    fn clear_overrides() {
        unsafe {
            remove_env("ADMIN_API_BASE_URL");
            remove_env("ADMIN_ACCESS_TOKEN");
        }
    }

    fn write_config(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("admin-cli.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_minimal_config_uses_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_overrides();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[api]
base_url = "https://api.example.com"
"#,
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.api.base_url, "https://api.example.com");
        assert_eq!(config.api.refresh_path, "/auth/refresh");
        assert_eq!(config.api.token_skew_secs, 20);
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(
            config.credentials.token_file,
            PathBuf::from("admin-cli-session.json")
        );
        assert_eq!(config.token_max_age(), Duration::from_secs(900));
        assert!(config.access_token.is_none());
    }

    #[test]
    fn test_load_full_config() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_overrides();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[api]
base_url = "http://localhost:4000/api"
refresh_path = "/session/refresh"
token_skew_secs = 5
timeout_secs = 10

[credentials]
token_file = "/tmp/admin-session.json"
token_max_age_secs = 60
"#,
        );

        let config = Config::load(&path).unwrap();
        let client = config.client_config();
        assert_eq!(client.base_url, "http://localhost:4000/api");
        assert_eq!(client.refresh_path, "/session/refresh");
        assert_eq!(client.token_skew, Duration::from_secs(5));
        assert_eq!(client.timeout, Duration::from_secs(10));
        assert_eq!(config.token_max_age(), Duration::from_secs(60));
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Path::new("/nonexistent/path/admin-cli.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "not valid {{{{ toml");
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_missing_base_url_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_overrides();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "[api]\n");

        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("base_url is required"), "got: {err}");
    }

    #[test]
    fn test_base_url_from_env_overrides_file() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_overrides();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "[api]\nbase_url = \"https://file.example.com\"\n");

        unsafe { set_env("ADMIN_API_BASE_URL", "https://env.example.com") };
        let config = Config::load(&path).unwrap();
        assert_eq!(config.api.base_url, "https://env.example.com");
        clear_overrides();
    }

    #[test]
    fn test_access_token_from_env() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_overrides();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "[api]\nbase_url = \"https://api.example.com\"\n");

        unsafe { set_env("ADMIN_ACCESS_TOKEN", "  eyJ.seed.sig\n") };
        let config = Config::load(&path).unwrap();
        assert_eq!(
            config.access_token.as_ref().unwrap().expose(),
            "eyJ.seed.sig"
        );
        clear_overrides();
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_overrides();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "[api]\nbase_url = \"api.example.com\"\n");

        let err = Config::load(&path).unwrap_err();
        assert!(
            err.to_string().contains("base_url must start with http"),
            "got: {err}"
        );
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_overrides();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            "[api]\nbase_url = \"https://api.example.com\"\ntimeout_secs = 0\n",
        );
        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("timeout_secs"), "got: {err}");
    }

    #[test]
    fn test_resolve_path_cli_arg() {
        let path = Config::resolve_path(Some("/custom/path.toml"));
        assert_eq!(path, PathBuf::from("/custom/path.toml"));
    }

    #[test]
    fn test_resolve_path_env_var() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("CONFIG_PATH", "/env/path.toml") };
        let path = Config::resolve_path(None);
        assert_eq!(path, PathBuf::from("/env/path.toml"));
        unsafe { remove_env("CONFIG_PATH") };
    }

    #[test]
    fn test_resolve_path_default() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("CONFIG_PATH") };
        assert_eq!(Config::resolve_path(None), PathBuf::from("admin-cli.toml"));
    }

    #[test]
    fn test_resolve_path_cli_overrides_env() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("CONFIG_PATH", "/env/should-lose.toml") };
        let path = Config::resolve_path(Some("/cli/wins.toml"));
        assert_eq!(
            path,
            PathBuf::from("/cli/wins.toml"),
            "CLI arg must take precedence over CONFIG_PATH env var"
        );
        unsafe { remove_env("CONFIG_PATH") };
    }
}
