/*!
Configuration management for the threat tracker
*/

use std::path::{Path, PathBuf};

use sentry_data::Score;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info};

use crate::monitor::error::AsentryError;

/// File name of the snapshot in the user's home directory
pub const DEFAULT_SNAPSHOT_NAME: &str = ".asentry";
/// Sound played on new threats, looked up next to the executable
pub const DEFAULT_SOUND_NAME: &str = "alert.mp3";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Sentry API settings
    pub source: SourceConfig,
    /// Snapshot persistence settings
    pub state: StateConfig,
    /// Alert sound settings
    pub alert: AlertConfig,
    /// Output configuration
    pub outputs: Vec<OutputConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Sentry summary endpoint
    pub endpoint: String,
    /// Only objects with a cumulative Palermo Scale above this are fetched
    #[serde(deserialize_with = "palermo_threshold")]
    pub ps_min: f64,
    /// Required `signature.source` of the response
    pub expected_source: String,
    /// Required `signature.version` of the response
    pub expected_version: String,
    /// Base of the per-object details page
    pub details_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StateConfig {
    /// Snapshot file; `~/.asentry` when unset
    pub snapshot_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Whether to attempt a sound at all
    pub enabled: bool,
    /// Sound file; `alert.mp3` beside the executable when unset
    pub sound_file: Option<PathBuf>,
    /// Player command and leading arguments; the file path is appended
    pub player: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Output plugin type
    pub plugin: OutputPlugin,
    /// Whether this output is enabled
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub enum OutputPlugin {
    /// Append alerts to a JSON-lines file
    Json {
        path: PathBuf,
        #[serde(default)]
        pretty: bool,
    },
    /// POST each alert to a URL
    Webhook { url: String, auth_token: Option<String> },
    Terminal { format: TerminalFormat },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum TerminalFormat {
    Plain,
    Colored,
    Json,
}

fn enabled_by_default() -> bool {
    true
}

/// Accept the threshold as a number or as a decimal string like the API's.
fn palermo_threshold<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Score::deserialize(deserializer).map(|score| score.value())
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://ssd-api.jpl.nasa.gov/sentry.api".to_string(),
            ps_min: -3.0,
            expected_source: sentry_data::SENTRY_SOURCE.to_string(),
            expected_version: sentry_data::SENTRY_VERSION.to_string(),
            details_url: "https://cneos.jpl.nasa.gov/sentry/details.html".to_string(),
            timeout_secs: 60,
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sound_file: None,
            player: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            plugin: OutputPlugin::Terminal {
                format: TerminalFormat::Plain,
            },
            enabled: true,
        }
    }
}

impl TrackerConfig {
    /// Load configuration.
    ///
    /// An explicit path must exist. Otherwise `<config dir>/asentry/config.toml`
    /// is used when present, and built-in defaults when not.
    pub fn load(explicit: Option<&Path>) -> Result<Self, AsentryError> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::default_path().filter(|path| path.is_file()),
        };

        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(&path).map_err(|e| {
                    AsentryError::Config(format!("cannot read {}: {}", path.display(), e))
                })?;
                let config = Self::from_toml_str(&content)?;
                info!("Loaded configuration from {:?}", path);
                config
            }
            None => {
                debug!("No configuration file, using defaults");
                Self::default()
            }
        };

        if config.outputs.is_empty() {
            config.outputs.push(OutputConfig::default());
        }
        Ok(config)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, AsentryError> {
        let config: TrackerConfig =
            toml::from_str(content).map_err(|e| AsentryError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// `<config dir>/asentry/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("asentry").join("config.toml"))
    }

    fn validate(&self) -> Result<(), AsentryError> {
        if !self.source.ps_min.is_finite() {
            return Err(AsentryError::Config("source.ps_min must be a finite number".into()));
        }
        if self.source.timeout_secs == 0 {
            return Err(AsentryError::Config("source.timeout_secs must be positive".into()));
        }
        if self.source.endpoint.trim().is_empty() {
            return Err(AsentryError::Config("source.endpoint is empty".into()));
        }
        if let Some(player) = &self.alert.player {
            if player.is_empty() {
                return Err(AsentryError::Config("alert.player needs a command".into()));
            }
        }
        for output in &self.outputs {
            if let OutputPlugin::Webhook { url, .. } = &output.plugin {
                if url.trim().is_empty() {
                    return Err(AsentryError::Config("webhook output needs a url".into()));
                }
            }
        }
        Ok(())
    }

    /// Resolved snapshot location.
    pub fn snapshot_path(&self) -> Result<PathBuf, AsentryError> {
        match &self.state.snapshot_path {
            Some(path) => expand_home(path),
            None => dirs::home_dir()
                .map(|home| home.join(DEFAULT_SNAPSHOT_NAME))
                .ok_or_else(|| AsentryError::Config("cannot determine home directory".into())),
        }
    }

    /// Resolved sound file location, if one can be determined.
    pub fn sound_path(&self) -> Option<PathBuf> {
        if !self.alert.enabled {
            return None;
        }
        match &self.alert.sound_file {
            Some(path) => expand_home(path).ok(),
            None => std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(|dir| dir.join(DEFAULT_SOUND_NAME))),
        }
    }
}

/// Expand a leading `~/` to the home directory.
fn expand_home(path: &Path) -> Result<PathBuf, AsentryError> {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .ok_or_else(|| AsentryError::Config("cannot determine home directory".into())),
        Err(_) => Ok(path.to_path_buf()),
    }
}
