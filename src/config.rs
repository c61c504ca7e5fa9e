use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::network::completion::{DEFAULT_COMPLETION_HOST, DEFAULT_COMPLETION_URL};

pub const DEFAULT_CONFIG_PATH: &str = "config/chatbot.json";
pub const CONFIG_PATH_VAR: &str = "CHATBOT_CONFIG";

/// Where chat records live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Firestore,
    Sqlite,
    Memory,
}

impl StoreBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "firestore" => Some(StoreBackend::Firestore),
            "sqlite" => Some(StoreBackend::Sqlite),
            "memory" => Some(StoreBackend::Memory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    pub url: String,
    pub host: String,
    pub api_key: Option<String>,
    pub web_access: bool,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_COMPLETION_URL.to_string(),
            host: DEFAULT_COMPLETION_HOST.to_string(),
            api_key: None,
            web_access: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FirebaseConfig {
    pub api_key: Option<String>,
    pub project_id: Option<String>,
    /// Overrides for the emulator suite.
    pub auth_url: Option<String>,
    pub token_url: Option<String>,
    pub firestore_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub completion: CompletionConfig,
    pub firebase: FirebaseConfig,
    /// `None` picks Firestore when a project id is configured, SQLite otherwise.
    pub store: Option<StoreBackend>,
    pub data_dir: PathBuf,
    pub http_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            completion: CompletionConfig::default(),
            firebase: FirebaseConfig::default(),
            store: None,
            data_dir: PathBuf::from("data"),
            http_timeout_secs: 60,
        }
    }
}

impl AppConfig {
    /// Config file (if any) overridden by the process environment.
    pub fn load() -> Self {
        let path = env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = load_config(&path);
        config.apply_env(|key| env::var(key).ok());
        config
    }

    /// Apply environment overrides read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(key) = lookup("RAPIDAPI_KEY").or_else(|| lookup("REACT_APP_RAPIDAPI_KEY")) {
            self.completion.api_key = Some(key);
        }
        if let Some(host) = lookup("RAPIDAPI_HOST") {
            self.completion.host = host;
        }
        if let Some(url) = lookup("CHATBOT_COMPLETION_URL") {
            self.completion.url = url;
        }
        if let Some(key) = lookup("FIREBASE_API_KEY") {
            self.firebase.api_key = Some(key);
        }
        if let Some(project) = lookup("FIREBASE_PROJECT_ID") {
            self.firebase.project_id = Some(project);
        }
        if let Some(store) = lookup("CHATBOT_STORE") {
            match StoreBackend::parse(&store) {
                Some(backend) => self.store = Some(backend),
                None => log::warn!("Ignoring unknown CHATBOT_STORE `{store}`"),
            }
        }
        if let Some(dir) = lookup("CHATBOT_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(secs) = lookup("CHATBOT_HTTP_TIMEOUT_SECS") {
            match secs.trim().parse() {
                Ok(secs) => self.http_timeout_secs = secs,
                Err(err) => log::warn!("Invalid CHATBOT_HTTP_TIMEOUT_SECS `{secs}`: {err}"),
            }
        }
    }

    pub fn store_backend(&self) -> StoreBackend {
        match (self.store, &self.firebase.project_id) {
            (Some(backend), _) => backend,
            (None, Some(_)) => StoreBackend::Firestore,
            (None, None) => StoreBackend::Sqlite,
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("chatbot.db")
    }
}

pub fn load_config(path: &str) -> AppConfig {
    let path = Path::new(path);
    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<AppConfig>(&content) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("Failed to parse config file {}: {err}", path.display());
                AppConfig::default()
            }
        },
        Err(err) => {
            log::info!(
                "Config file {} not found ({err}); using defaults",
                path.display()
            );
            AppConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_target_rapidapi_and_local_storage() {
        let config = AppConfig::default();
        assert_eq!(config.completion.url, DEFAULT_COMPLETION_URL);
        assert!(!config.completion.web_access);
        assert_eq!(config.store_backend(), StoreBackend::Sqlite);
        assert_eq!(config.database_path(), PathBuf::from("data/chatbot.db"));
    }

    #[test]
    fn environment_overrides_file_values() {
        let mut config: AppConfig =
            serde_json::from_str(r#"{ "completion": { "api_key": "from-file" } }"#).unwrap();
        config.apply_env(env_of(&[
            ("RAPIDAPI_KEY", "from-env"),
            ("FIREBASE_PROJECT_ID", "chat-app"),
            ("CHATBOT_HTTP_TIMEOUT_SECS", "15"),
        ]));

        assert_eq!(config.completion.api_key.as_deref(), Some("from-env"));
        assert_eq!(config.store_backend(), StoreBackend::Firestore);
        assert_eq!(config.http_timeout(), Duration::from_secs(15));
    }

    #[test]
    fn legacy_key_name_is_accepted() {
        let mut config = AppConfig::default();
        config.apply_env(env_of(&[("REACT_APP_RAPIDAPI_KEY", "legacy")]));
        assert_eq!(config.completion.api_key.as_deref(), Some("legacy"));
    }

    #[test]
    fn explicit_store_wins_and_bad_values_are_ignored() {
        let mut config = AppConfig::default();
        config.apply_env(env_of(&[
            ("FIREBASE_PROJECT_ID", "chat-app"),
            ("CHATBOT_STORE", "Memory"),
            ("CHATBOT_HTTP_TIMEOUT_SECS", "soon"),
        ]));
        assert_eq!(config.store_backend(), StoreBackend::Memory);
        assert_eq!(config.http_timeout_secs, 60);

        config.apply_env(env_of(&[("CHATBOT_STORE", "postgres")]));
        assert_eq!(config.store_backend(), StoreBackend::Memory);
    }

    #[test]
    fn blank_values_do_not_override() {
        let mut config = AppConfig::default();
        config.apply_env(env_of(&[("RAPIDAPI_KEY", "  ")]));
        assert!(config.completion.api_key.is_none());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = load_config("does/not/exist.json");
        assert_eq!(config.http_timeout_secs, 60);
    }
}
