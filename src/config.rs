//! Configuration for evicase paths and collaborators.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (EVICASE_HOME, EVICASE_INFERENCE_URL,
//!    EVICASE_MODEL, EVICASE_API_KEY)
//! 2. Config file (.evicase/config.yaml)
//! 3. Defaults (~/.evicase)
//!
//! Config file discovery:
//! - Searches current directory and parents for .evicase/config.yaml
//! - Paths in the config file are relative to the config file's parent

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::core::reconciler::DEFAULT_TOLERANCE;
use crate::fingerprint::DEFAULT_CHUNK_SIZE;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<std::result::Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub inference: Option<InferenceConfig>,
    #[serde(default)]
    pub engine: Option<EngineConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// Engine state directory (relative to config file)
    pub home: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InferenceConfig {
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Bookmark match tolerance in seconds
    pub match_tolerance: Option<f64>,
    /// Fingerprint read size in bytes
    pub chunk_size_bytes: Option<usize>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Absolute path to evicase home (engine state)
    pub home: PathBuf,
    /// Inference collaborator settings
    pub inference: InferenceSettings,
    /// Engine tuning
    pub engine: EngineSettings,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct InferenceSettings {
    pub endpoint: String,
    pub model: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub match_tolerance: f64,
    pub chunk_size_bytes: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            match_tolerance: DEFAULT_TOLERANCE,
            chunk_size_bytes: DEFAULT_CHUNK_SIZE,
        }
    }
}

const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8787/analyze";

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".evicase").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's directory
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".evicase");

    let config_file = find_config_file();
    let parsed = match config_file {
        Some(ref path) => Some(load_config_file(path)?),
        None => None,
    };

    let home = if let Ok(env_home) = std::env::var("EVICASE_HOME") {
        PathBuf::from(env_home)
    } else if let Some(home_path) = parsed.as_ref().and_then(|c| c.paths.home.as_ref()) {
        let base = config_file
            .as_ref()
            .and_then(|p| p.parent())
            .unwrap_or(Path::new("."));
        resolve_path(base, home_path)
    } else {
        default_home
    };

    let file_inference = parsed.as_ref().and_then(|c| c.inference.clone());
    let inference = InferenceSettings {
        endpoint: std::env::var("EVICASE_INFERENCE_URL")
            .ok()
            .or_else(|| file_inference.as_ref().and_then(|i| i.endpoint.clone()))
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
        model: std::env::var("EVICASE_MODEL")
            .ok()
            .or_else(|| file_inference.as_ref().and_then(|i| i.model.clone())),
        api_key: std::env::var("EVICASE_API_KEY")
            .ok()
            .or_else(|| file_inference.as_ref().and_then(|i| i.api_key.clone())),
    };

    let file_engine = parsed.as_ref().and_then(|c| c.engine.clone());
    let engine = EngineSettings {
        match_tolerance: file_engine
            .as_ref()
            .and_then(|e| e.match_tolerance)
            .unwrap_or(DEFAULT_TOLERANCE),
        chunk_size_bytes: file_engine
            .as_ref()
            .and_then(|e| e.chunk_size_bytes)
            .unwrap_or(DEFAULT_CHUNK_SIZE),
    };

    Ok(ResolvedConfig {
        home,
        inference,
        engine,
        config_file,
    })
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}

/// Get the case store root ($EVICASE_HOME/cases)
pub fn cases_dir() -> Result<PathBuf> {
    Ok(config()?.home.join("cases"))
}

/// Get the object store root ($EVICASE_HOME/objects)
pub fn objects_dir() -> Result<PathBuf> {
    Ok(config()?.home.join("objects"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let evicase_dir = temp.path().join(".evicase");
        std::fs::create_dir_all(&evicase_dir).unwrap();

        let config_path = evicase_dir.join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(
            file,
            r#"
version: "1.0"
paths:
  home: ./
inference:
  endpoint: http://analysis.internal:9000/v1/video
  model: findings-large
engine:
  match_tolerance: 0.25
  chunk_size_bytes: 1048576
"#
        )
        .unwrap();

        let parsed = load_config_file(&config_path).unwrap();
        assert_eq!(parsed.version, "1.0");

        let inference = parsed.inference.unwrap();
        assert_eq!(
            inference.endpoint.as_deref(),
            Some("http://analysis.internal:9000/v1/video")
        );
        assert_eq!(inference.model.as_deref(), Some("findings-large"));

        let engine = parsed.engine.unwrap();
        assert_eq!(engine.match_tolerance, Some(0.25));
        assert_eq!(engine.chunk_size_bytes, Some(1_048_576));
    }

    #[test]
    fn test_engine_settings_defaults() {
        let settings = EngineSettings::default();
        assert_eq!(settings.match_tolerance, DEFAULT_TOLERANCE);
        assert_eq!(settings.chunk_size_bytes, DEFAULT_CHUNK_SIZE);
    }
}
