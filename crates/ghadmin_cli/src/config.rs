//! Configuration file support for ghadmin.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `GHADMIN_`, e.g., `GHADMIN_GITHUB_TOKEN`)
//! 3. Config file (./ghadmin.toml or ~/.config/ghadmin/config.toml)
//! 4. Built-in defaults
//!
//! The session state (token, selected and default organization) lives in the
//! user config file only. [`FileConfigStore`] reads it from there and writes
//! it back in place, so comments and unrelated settings survive.
//!
//! Example config file:
//! ```toml
//! [github]
//! token = "ghp_..."  # or use GHADMIN_GITHUB_TOKEN env var
//! api_url = "https://api.github.com"  # GitHub Enterprise: https://ghe.example.com/api/v3
//!
//! [session]
//! default_org = "acme"
//!
//! [sync]
//! poll_interval_minutes = 30
//! team_lookup_concurrency = 10
//! requests_per_second = 10  # 0 disables proactive pacing
//! max_retries = 5
//! max_wait_secs = 900
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::builder::DefaultState;
use config::{Config as ConfigBuilder, ConfigBuilder as LayeredBuilder, Environment, File, FileFormat};
use directories::ProjectDirs;
use ghadmin::gateway::ThrottlePolicy;
use ghadmin::sync::{
    DEFAULT_API_URL, DEFAULT_POLL_INTERVAL, DEFAULT_TEAM_LOOKUP_CONCURRENCY,
    DEFAULT_THROTTLE_MAX_WAIT, DEFAULT_THROTTLE_RETRIES,
};
use ghadmin::{ConfigStore, EngineOptions, Settings, SettingsError};
use serde::Deserialize;
use toml_edit::{DocumentMut, value};

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// GitHub configuration.
    pub github: GitHubConfig,
    /// Persisted session state.
    pub session: SessionConfig,
    /// Polling and request pacing.
    pub sync: SyncConfig,
}

/// GitHub configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// GitHub API token.
    /// Can also be set via GHADMIN_GITHUB_TOKEN environment variable.
    pub token: Option<String>,
    /// REST API root, for GitHub Enterprise Server.
    pub api_url: Option<String>,
}

/// Session state written back by `login`, `logout` and `org`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub selected_org: Option<String>,
    pub default_org: Option<String>,
}

/// Polling and pacing options.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Minutes between the end of one fetch pass and the start of the next.
    pub poll_interval_minutes: u64,
    /// Maximum concurrent team member-count lookups.
    pub team_lookup_concurrency: usize,
    /// Proactive request pacing. Zero disables it.
    pub requests_per_second: u32,
    /// Throttled attempts retried before giving up.
    pub max_retries: u32,
    /// Longest single wait on a throttled response, in seconds.
    pub max_wait_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_minutes: DEFAULT_POLL_INTERVAL.as_secs() / 60,
            team_lookup_concurrency: DEFAULT_TEAM_LOOKUP_CONCURRENCY,
            requests_per_second: ghadmin::gateway::rate_limits::GITHUB_DEFAULT_RPS,
            max_retries: DEFAULT_THROTTLE_RETRIES,
            max_wait_secs: DEFAULT_THROTTLE_MAX_WAIT.as_secs(),
        }
    }
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. Built-in defaults
    /// 2. XDG config file (~/.config/ghadmin/config.toml)
    /// 3. Local config file (./ghadmin.toml)
    /// 4. Environment variables with GHADMIN_ prefix
    pub fn load() -> Self {
        match Self::try_load(Self::default_config_path().as_deref()) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config: {}", e);
                Config::default()
            }
        }
    }

    /// Load the layers with `user_config` standing in for the XDG file.
    pub fn try_load(user_config: Option<&Path>) -> Result<Self, config::ConfigError> {
        layered(user_config).build()?.try_deserialize()
    }

    /// Get the GitHub token.
    pub fn github_token(&self) -> Option<String> {
        self.github.token.clone().filter(|t| !t.is_empty())
    }

    /// Get the REST API root.
    pub fn api_url(&self) -> String {
        self.github
            .api_url
            .clone()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    /// Engine options for this configuration.
    ///
    /// One-shot commands pass `poll_on_connect = false` so a connection does
    /// not start the background scheduler.
    pub fn engine_options(&self, poll_on_connect: bool) -> EngineOptions {
        EngineOptions {
            poll_interval: Duration::from_secs(self.sync.poll_interval_minutes.max(1) * 60),
            team_lookup_concurrency: self.sync.team_lookup_concurrency.max(1),
            requests_per_second: (self.sync.requests_per_second > 0)
                .then_some(self.sync.requests_per_second),
            throttle: ThrottlePolicy {
                max_retries: self.sync.max_retries,
                max_wait: Duration::from_secs(self.sync.max_wait_secs),
            },
            api_url: self.api_url(),
            poll_on_connect,
            ..EngineOptions::default()
        }
    }

    /// Session settings carried by this configuration.
    pub fn settings(&self) -> Settings {
        Settings {
            token: self.github_token(),
            selected_org: self.session.selected_org.clone().filter(|o| !o.is_empty()),
            default_org: self.session.default_org.clone().filter(|o| !o.is_empty()),
        }
    }

    /// Get the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "ghadmin").map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

fn layered(user_config: Option<&Path>) -> LayeredBuilder<DefaultState> {
    let mut builder = ConfigBuilder::builder();

    if let Some(path) = user_config
        && path.exists()
    {
        tracing::debug!("Loading config from {:?}", path);
        builder = builder.add_source(
            File::from(path.to_path_buf())
                .format(FileFormat::Toml)
                .required(false),
        );
    }

    // Local config file (higher priority than XDG)
    let local_config = PathBuf::from("ghadmin.toml");
    if local_config.exists() {
        tracing::debug!("Loading config from ./ghadmin.toml");
        builder = builder.add_source(
            File::from(local_config)
                .format(FileFormat::Toml)
                .required(false),
        );
    }

    // e.g., GHADMIN_GITHUB_TOKEN -> github.token
    builder.add_source(
        Environment::with_prefix("GHADMIN")
            .separator("_")
            .try_parsing(true),
    )
}

/// Settings store backed by the user config file.
///
/// Both loading and saving see only that file. Saving touches the
/// `[github] token` and `[session]` keys and nothing else.
#[derive(Clone)]
pub struct FileConfigStore {
    path: PathBuf,
    external_token: Option<String>,
}

impl std::fmt::Debug for FileConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileConfigStore")
            .field("path", &self.path)
            .field("external_token", &self.external_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl FileConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            external_token: None,
        }
    }

    /// Never write `token` to the file. Used for a token that came from the
    /// environment or `./ghadmin.toml`; saving it leaves the file's own
    /// token key as it was.
    #[must_use]
    pub fn with_external_token(mut self, token: Option<String>) -> Self {
        self.external_token = token;
        self
    }

    /// Store at the default config file path.
    pub fn at_default_path() -> Result<Self, SettingsError> {
        Config::default_config_path()
            .map(Self::new)
            .ok_or_else(|| SettingsError::Invalid("could not determine config directory".into()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Result<Settings, SettingsError> {
        if !self.path.exists() {
            return Ok(Settings::default());
        }
        ConfigBuilder::builder()
            .add_source(File::from(self.path.clone()).format(FileFormat::Toml))
            .build()
            .and_then(|built| built.try_deserialize::<Config>())
            .map(|config| config.settings())
            .map_err(|e| SettingsError::Invalid(e.to_string()))
    }

    fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = if self.path.exists() {
            fs::read_to_string(&self.path)?
        } else {
            String::new()
        };

        // Parse as TOML document (preserves formatting and comments)
        let mut doc: DocumentMut = content
            .parse()
            .map_err(|e| SettingsError::Invalid(format!("Invalid TOML: {e}")))?;

        if settings.token.is_none() || settings.token != self.external_token {
            set_or_remove(&mut doc, "github", "token", settings.token.as_deref());
        }
        set_or_remove(&mut doc, "session", "selected_org", settings.selected_org.as_deref());
        set_or_remove(&mut doc, "session", "default_org", settings.default_org.as_deref());

        fs::write(&self.path, doc.to_string())?;
        Ok(())
    }
}

fn set_or_remove(doc: &mut DocumentMut, section: &str, key: &str, new_value: Option<&str>) {
    match new_value {
        Some(v) => {
            if !doc.contains_key(section) {
                doc[section] = toml_edit::table();
            }
            doc[section][key] = value(v);
        }
        None => {
            if let Some(table) = doc.get_mut(section).and_then(|item| item.as_table_like_mut()) {
                table.remove(key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn parse(toml_content: &str) -> Config {
        ConfigBuilder::builder()
            .add_source(config::File::from_str(toml_content, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    fn temp_config_path(tag: &str) -> PathBuf {
        let nonce = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock should be after epoch")
            .as_nanos();
        std::env::temp_dir()
            .join(format!("ghadmin-config-test-{tag}-{nonce}"))
            .join("config.toml")
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.github.token.is_none());
        assert_eq!(config.api_url(), "https://api.github.com");
        assert_eq!(config.sync.poll_interval_minutes, 30);
        assert_eq!(config.sync.team_lookup_concurrency, 10);
        assert_eq!(config.sync.requests_per_second, 10);
        assert_eq!(config.sync.max_retries, 5);
        assert_eq!(config.sync.max_wait_secs, 900);
    }

    #[test]
    fn test_full_config_parsing() {
        let config = parse(
            r#"
            [github]
            token = "ghp_test123"
            api_url = "https://ghe.example.com/api/v3"

            [session]
            selected_org = "widgets-inc"
            default_org = "acme"

            [sync]
            poll_interval_minutes = 5
            team_lookup_concurrency = 4
            requests_per_second = 0
            max_retries = 2
            max_wait_secs = 60
        "#,
        );

        assert_eq!(config.github_token(), Some("ghp_test123".to_string()));
        assert_eq!(config.api_url(), "https://ghe.example.com/api/v3");

        let settings = config.settings();
        assert_eq!(settings.selected_org.as_deref(), Some("widgets-inc"));
        assert_eq!(settings.default_org.as_deref(), Some("acme"));

        let options = config.engine_options(false);
        assert_eq!(options.poll_interval, Duration::from_secs(300));
        assert_eq!(options.team_lookup_concurrency, 4);
        assert_eq!(options.requests_per_second, None);
        assert_eq!(options.throttle.max_retries, 2);
        assert_eq!(options.throttle.max_wait, Duration::from_secs(60));
        assert!(!options.poll_on_connect);
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let config = parse(
            r#"
            [sync]
            poll_interval_minutes = 10
        "#,
        );

        let options = config.engine_options(true);
        assert_eq!(options.poll_interval, Duration::from_secs(600));
        assert_eq!(options.requests_per_second, Some(10));
        assert_eq!(options.team_lookup_concurrency, 10);
        assert!(options.poll_on_connect);
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config = parse(
            r#"
            [github]
            token = ""
            api_url = ""

            [session]
            default_org = ""
        "#,
        );

        assert_eq!(config.github_token(), None);
        assert_eq!(config.api_url(), "https://api.github.com");
        assert_eq!(config.settings().default_org, None);
    }

    #[test]
    fn test_config_invalid_toml() {
        let result = ConfigBuilder::builder()
            .add_source(config::File::from_str("[sync\npoll = 1", FileFormat::Toml))
            .build();

        assert!(result.is_err());
    }

    #[test]
    fn test_store_round_trips_session_state() {
        let path = temp_config_path("roundtrip");
        let store = FileConfigStore::new(&path);
        let settings = Settings {
            token: Some("ghp_saved".into()),
            selected_org: Some("widgets-inc".into()),
            default_org: Some("acme".into()),
        };

        store.save(&settings).expect("save should succeed");
        let loaded = store.load().expect("load should succeed");

        assert_eq!(loaded, settings);
        if let Some(dir) = path.parent() {
            fs::remove_dir_all(dir).expect("test output directory should be removable");
        }
    }

    #[test]
    fn test_store_preserves_comments_and_other_sections() {
        let path = temp_config_path("preserve");
        fs::create_dir_all(path.parent().expect("parent")).expect("create dir");
        fs::write(
            &path,
            "# my settings\n[sync]\npoll_interval_minutes = 5 # fast\n\n[github]\ntoken = \"old\"\n",
        )
        .expect("seed config");
        let store = FileConfigStore::new(&path);

        store
            .save(&Settings {
                token: None,
                selected_org: Some("acme".into()),
                default_org: None,
            })
            .expect("save should succeed");

        let written = fs::read_to_string(&path).expect("read back");
        assert!(written.contains("# my settings"));
        assert!(written.contains("poll_interval_minutes = 5 # fast"));
        assert!(!written.contains("token"));
        assert!(written.contains("selected_org = \"acme\""));
        if let Some(dir) = path.parent() {
            fs::remove_dir_all(dir).expect("test output directory should be removable");
        }
    }

    #[test]
    fn test_store_never_writes_an_external_token() {
        let path = temp_config_path("external");
        fs::create_dir_all(path.parent().expect("parent")).expect("create dir");
        fs::write(&path, "[github]\ntoken = \"ghp_file\"\n").expect("seed config");
        let store = FileConfigStore::new(&path).with_external_token(Some("ghp_from_env".into()));

        ghadmin::settings::update(&store, |s| {
            s.token = Some("ghp_from_env".into());
            s.selected_org = Some("acme".into());
        });

        let written = fs::read_to_string(&path).expect("read back");
        assert!(!written.contains("ghp_from_env"));
        assert!(written.contains("token = \"ghp_file\""));
        assert!(written.contains("selected_org = \"acme\""));

        store.save(&Settings::default()).expect("logout save");
        let written = fs::read_to_string(&path).expect("read back");
        assert!(!written.contains("token"));
        if let Some(dir) = path.parent() {
            fs::remove_dir_all(dir).expect("test output directory should be removable");
        }
    }

    #[test]
    fn test_store_load_ignores_environment() {
        let path = temp_config_path("env");
        fs::create_dir_all(path.parent().expect("parent")).expect("create dir");
        fs::write(&path, "[session]\ndefault_org = \"acme\"\n").expect("seed config");
        // SAFETY: no other test in this crate reads this variable.
        unsafe { std::env::set_var("GHADMIN_GITHUB_TOKEN", "ghp_from_env_only") };

        let loaded = FileConfigStore::new(&path).load();

        unsafe { std::env::remove_var("GHADMIN_GITHUB_TOKEN") };
        let loaded = loaded.expect("load should succeed");
        assert_eq!(loaded.token, None);
        assert_eq!(loaded.default_org.as_deref(), Some("acme"));
        if let Some(dir) = path.parent() {
            fs::remove_dir_all(dir).expect("test output directory should be removable");
        }
    }

    #[test]
    fn test_store_load_of_missing_file_is_empty() {
        let store = FileConfigStore::new(temp_config_path("missing"));
        let loaded = store.load().expect("missing file is not an error");
        assert_eq!(loaded.selected_org, None);
        assert_eq!(loaded.default_org, None);
    }
}
