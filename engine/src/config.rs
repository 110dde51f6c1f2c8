use event_core::event::EventKind;
use legacy_log::IdField;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::warn;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub legacy: Vec<LegacyOverride>,
    #[serde(default)]
    pub events: Vec<EventConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub legacy_log_path: Option<PathBuf>,
    #[serde(default)]
    pub print_legacy: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            legacy_log_path: None,
            print_legacy: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Replaces parts of the built-in legacy mapping for one event kind.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LegacyOverride {
    pub kind: EventKind,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub object: Option<IdField>,
    #[serde(default)]
    pub secondary: Option<IdField>,
}

/// One event to replay through the bus.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EventConfig {
    pub kind: EventKind,
    pub course_id: i64,
    #[serde(default)]
    pub cmid: Option<i64>,
    #[serde(default)]
    pub instance_id: Option<i64>,
    #[serde(default)]
    pub chapter_id: Option<i64>,
    #[serde(default)]
    pub user_id: Option<i64>,
}

impl Config {
    pub fn load_from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.clone(), e.to_string()))?;

        let config: Config =
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))?;

        Ok(config)
    }

    pub fn load_from_dir(dir: &PathBuf) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if !dir.exists() {
            return Ok(config);
        }

        let mut paths = Vec::new();
        for entry in
            std::fs::read_dir(dir).map_err(|e| ConfigError::FileRead(dir.clone(), e.to_string()))?
        {
            let entry = entry.map_err(|e| ConfigError::FileRead(dir.clone(), e.to_string()))?;
            let path = entry.path();

            if path.extension().map(|e| e == "toml").unwrap_or(false) {
                paths.push(path);
            }
        }

        // Replay order follows file names; the first [engine] section wins.
        paths.sort();
        let mut engine_from: Option<PathBuf> = None;
        for path in paths {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::FileRead(path.clone(), e.to_string()))?;
            let table: toml::Table =
                toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
            let file_config: Config =
                toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))?;

            if table.contains_key("engine") {
                match &engine_from {
                    None => {
                        config.engine = file_config.engine;
                        engine_from = Some(path.clone());
                    }
                    Some(first) => warn!(
                        "Ignoring [engine] section in {:?}; already taken from {:?}",
                        path, first
                    ),
                }
            }

            config.legacy.extend(file_config.legacy);
            config.events.extend(file_config.events);
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut kinds = HashSet::new();
        for legacy in &self.legacy {
            if !kinds.insert(legacy.kind) {
                return Err(ConfigError::Validation(format!(
                    "Duplicate legacy override for {}",
                    legacy.kind
                )));
            }
        }

        for (idx, event) in self.events.iter().enumerate() {
            if event.course_id <= 0 {
                return Err(ConfigError::Validation(format!(
                    "Event #{} ({}) needs a positive course_id",
                    idx, event.kind
                )));
            }

            let module_scoped =
                event.kind.context_level() == event_core::context::ContextLevel::Module;
            let fields = [
                ("cmid", event.cmid, module_scoped),
                ("instance_id", event.instance_id, module_scoped),
                ("chapter_id", event.chapter_id, event.kind.is_chapter_event()),
            ];

            for (name, value, expected) in fields {
                match (expected, value) {
                    (true, None) => {
                        return Err(ConfigError::Validation(format!(
                            "Event #{} ({}) is missing {}",
                            idx, event.kind, name
                        )));
                    }
                    (false, Some(_)) => {
                        return Err(ConfigError::Validation(format!(
                            "Event #{} ({}) does not take {}",
                            idx, event.kind, name
                        )));
                    }
                    _ => {}
                }
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone)]
pub enum ConfigError {
    FileRead(PathBuf, String),
    Parse(String),
    Validation(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileRead(path, msg) => {
                write!(f, "Failed to read config file {:?}: {}", path, msg)
            }
            ConfigError::Parse(msg) => write!(f, "Failed to parse config: {}", msg),
            ConfigError::Validation(msg) => write!(f, "Config validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}
