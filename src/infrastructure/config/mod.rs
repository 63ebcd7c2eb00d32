//! Configuration management

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use tokio::sync::Mutex;

use crate::application::errors::ConfigError;
use crate::domain::entities::{ActorId, ChatId};
use crate::domain::traits::AdminPersistence;

/// Bot configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    pub bot: BotConfig,
    /// Initial authorized actor set
    pub admins: Vec<ActorId>,
    pub modules: ModulesConfig,
    pub database: Option<DatabaseConfig>,
    pub console: ConsoleConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct BotConfig {
    pub name: String,
    pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct ModulesConfig {
    pub directory: PathBuf,
    /// Reload modules when their files change
    pub watch: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

/// Identity used for lines typed in console mode
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct ConsoleConfig {
    pub actor_id: ActorId,
    pub chat_id: ChatId,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot: BotConfig {
                name: "Admin Bot".to_string(),
                token: None,
            },
            admins: Vec::new(),
            modules: ModulesConfig {
                directory: PathBuf::from("./modules"),
                watch: true,
            },
            database: Some(DatabaseConfig {
                path: PathBuf::from("./queries.db"),
            }),
            console: ConsoleConfig::default(),
        }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self { actor_id: 1, chat_id: 1 }
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn load_env() -> Result<Self, ConfigError> {
        // Load from environment variables
        let mut config = Config::default();

        if let Ok(token) = std::env::var("BOT_TOKEN") {
            config.bot.token = Some(token);
        }

        if let Ok(admins) = std::env::var("BOT_ADMINS") {
            config.admins = parse_admins(&admins)?;
        }

        Ok(config)
    }
}

fn parse_admins(raw: &str) -> Result<Vec<ActorId>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse()
                .map_err(|_| ConfigError::InvalidValue(format!("BOT_ADMINS entry '{}'", s)))
        })
        .collect()
}

/// Config file on disk. Admin changes rewrite only its `admins` key, so
/// runtime overrides such as a token passed on the command line never leak
/// into the file.
pub struct ConfigFile {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// File name shown to chat users and expected for settings uploads
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "config.yaml".to_string())
    }

    /// Current file contents
    pub async fn read(&self) -> Result<Vec<u8>, ConfigError> {
        tokio::fs::read(&self.path)
            .await
            .map_err(|e| ConfigError::Parse(format!("{}: {}", self.path.display(), e)))
    }

    /// Replace the whole file with an uploaded config. Takes effect on restart.
    pub async fn replace(&self, bytes: &[u8]) -> Result<Config, ConfigError> {
        let content = std::str::from_utf8(bytes).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let config = Config::from_yaml(content)?;

        let _guard = self.write_lock.lock().await;
        self.write_atomic(content).await?;
        tracing::info!("Replaced {}", self.path.display());
        Ok(config)
    }

    async fn write_atomic(&self, content: &str) -> Result<(), ConfigError> {
        let tmp = self.path.with_extension("yaml.tmp");
        tokio::fs::write(&tmp, content)
            .await
            .map_err(|e| ConfigError::Write(format!("{}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| ConfigError::Write(format!("{}: {}", self.path.display(), e)))
    }
}

#[async_trait]
impl AdminPersistence for ConfigFile {
    async fn persist(&self, admins: &[ActorId]) -> Result<(), ConfigError> {
        let _guard = self.write_lock.lock().await;

        let mut document = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => serde_yaml::from_str::<Value>(&content)
                .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Value::Mapping(Mapping::new()),
            Err(e) => return Err(ConfigError::Write(format!("{}: {}", self.path.display(), e))),
        };
        if document.is_null() {
            document = Value::Mapping(Mapping::new());
        }

        let Value::Mapping(map) = &mut document else {
            return Err(ConfigError::InvalidValue(format!(
                "{} is not a YAML mapping",
                self.path.display()
            )));
        };
        let list = serde_yaml::to_value(admins).map_err(|e| ConfigError::Parse(e.to_string()))?;
        map.insert(Value::String("admins".to_string()), list);

        let yaml = serde_yaml::to_string(&document).map_err(|e| ConfigError::Parse(e.to_string()))?;
        self.write_atomic(&yaml).await?;

        tracing::debug!("Saved {} admins to {}", admins.len(), self.path.display());
        Ok(())
    }
}
