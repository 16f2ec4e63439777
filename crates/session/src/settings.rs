use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized},
};
use khmerchat_llm::{DEFAULT_GEMINI_MODEL, GEMINI_PROVIDER_ID, TransportConfig};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

use crate::health::HealthConfig;
use crate::manager::SessionConfig;
use crate::retry::RetryPolicy;
use crate::transcript::MAX_HISTORY_ENTRIES;

pub const SETTINGS_DIRECTORY_NAME: &str = "khmerchat";
pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const SETTINGS_ENV_PREFIX: &str = "KHMERCHAT_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub provider_id: String,
    pub api_key: String,
    /// Blank uses the provider's public endpoint.
    pub endpoint: String,
    pub model_id: String,
    pub history_cap: usize,
    pub max_retries: u32,
    pub initial_retry_delay_ms: u64,
    pub check_interval_secs: u64,
    pub stale_threshold_secs: u64,
    pub max_consecutive_failures: u32,
    pub failure_cooldown_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        let health = HealthConfig::default();
        Self {
            provider_id: GEMINI_PROVIDER_ID.to_string(),
            api_key: String::new(),
            endpoint: String::new(),
            model_id: DEFAULT_GEMINI_MODEL.to_string(),
            history_cap: MAX_HISTORY_ENTRIES,
            max_retries: retry.max_retries,
            initial_retry_delay_ms: retry.initial_delay.as_millis() as u64,
            check_interval_secs: health.check_interval.as_secs(),
            stale_threshold_secs: health.stale_threshold.as_secs(),
            max_consecutive_failures: health.max_consecutive_failures,
            failure_cooldown_secs: 5,
        }
    }
}

impl Settings {
    /// Trims strings and puts defaults back in place of blank or zero values.
    ///
    /// `max_retries` may be zero to disable retrying.
    pub fn normalized(mut self) -> Self {
        let defaults = Self::default();

        self.provider_id = non_blank(&self.provider_id).unwrap_or(defaults.provider_id);
        self.api_key = self.api_key.trim().to_string();
        self.endpoint = self.endpoint.trim().to_string();
        self.model_id = non_blank(&self.model_id).unwrap_or(defaults.model_id);

        if self.history_cap == 0 {
            self.history_cap = defaults.history_cap;
        }
        if self.initial_retry_delay_ms == 0 {
            self.initial_retry_delay_ms = defaults.initial_retry_delay_ms;
        }
        if self.check_interval_secs == 0 {
            self.check_interval_secs = defaults.check_interval_secs;
        }
        if self.stale_threshold_secs == 0 {
            self.stale_threshold_secs = defaults.stale_threshold_secs;
        }
        if self.max_consecutive_failures == 0 {
            self.max_consecutive_failures = defaults.max_consecutive_failures;
        }

        self
    }

    pub fn is_valid(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    pub fn to_transport_config(&self) -> Option<TransportConfig> {
        if !self.is_valid() {
            return None;
        }

        Some(TransportConfig::new(
            &self.provider_id,
            &self.api_key,
            &self.endpoint,
            &self.model_id,
        ))
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            history_cap: self.history_cap,
            retry: RetryPolicy::new(
                self.max_retries,
                Duration::from_millis(self.initial_retry_delay_ms),
            ),
            health: HealthConfig {
                check_interval: Duration::from_secs(self.check_interval_secs),
                stale_threshold: Duration::from_secs(self.stale_threshold_secs),
                max_consecutive_failures: self.max_consecutive_failures,
            },
            failure_cooldown: Duration::from_secs(self.failure_cooldown_secs),
            ..SessionConfig::default()
        }
    }
}

fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Current settings, shared lock-free with readers and persisted on update.
pub struct SettingsStore {
    settings: Arc<ArcSwap<Settings>>,
    config_path: PathBuf,
}

impl SettingsStore {
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".khmerchat"))
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join(SETTINGS_FILE_NAME)
    }

    pub fn new(config_path: PathBuf) -> Self {
        let settings = load_settings(&config_path);
        Self {
            settings: Arc::new(ArcSwap::from_pointee(settings)),
            config_path,
        }
    }

    pub fn load() -> Self {
        Self::new(Self::default_config_path())
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn settings(&self) -> Arc<Settings> {
        self.settings.load_full()
    }

    pub fn update(&self, settings: Settings) -> Result<(), SettingsError> {
        let settings = settings.normalized();
        self.persist(&settings)?;
        self.settings.store(Arc::new(settings));
        Ok(())
    }

    fn persist(&self, settings: &Settings) -> Result<(), SettingsError> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).context(CreateDirSnafu {
                stage: "persist-settings-directory",
                path: parent.to_path_buf(),
            })?;
        }

        let content = serde_json::to_string_pretty(settings).context(SerializeSettingsSnafu {
            stage: "serialize-settings",
        })?;

        let temp_path = self.config_path.with_extension("json.partial");
        std::fs::write(&temp_path, content).context(WriteFileSnafu {
            stage: "persist-settings-temp",
            path: temp_path.clone(),
        })?;
        std::fs::rename(&temp_path, &self.config_path).context(RenameTempFileSnafu {
            stage: "replace-settings-file",
            from: temp_path,
            to: self.config_path.clone(),
        })?;

        tracing::info!(path = %self.config_path.display(), "saved settings");
        Ok(())
    }
}

/// Defaults, then the JSON file if present, then `KHMERCHAT_*` variables.
fn load_settings(path: &Path) -> Settings {
    let figment = Figment::from(Serialized::defaults(Settings::default()))
        .merge(Json::file(path))
        .merge(Env::prefixed(SETTINGS_ENV_PREFIX));

    match figment.extract::<Settings>() {
        Ok(settings) => settings.normalized(),
        Err(error) => {
            tracing::warn!(
                path = %path.display(),
                error = %error,
                "failed to load settings, using defaults"
            );
            Settings::default()
        }
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SettingsError {
    #[snafu(display("cannot create config directory {path:?} during `{stage}`: {source}"))]
    CreateDir {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("cannot encode settings as JSON during `{stage}`: {source}"))]
    SerializeSettings {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("cannot write {path:?} during `{stage}`: {source}"))]
    WriteFile {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("cannot move {from:?} over {to:?} during `{stage}`: {source}"))]
    RenameTempFile {
        stage: &'static str,
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}
