//! TOML configuration.
//!
//! Every section and key is optional. A missing file falls back to
//! [`Config::minimal`], so `bp` works without any setup.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub shell: ShellConfig,
    #[serde(default)]
    pub view: ViewConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ShellConfig {
    #[serde(default = "default_program")]
    pub program: String,
    #[serde(default = "default_args")]
    pub args: Vec<String>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
        }
    }
}

fn default_program() -> String {
    "sh".to_string()
}
fn default_args() -> Vec<String> {
    vec!["-c".to_string()]
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ViewConfig {
    #[serde(default = "default_max_visible")]
    pub max_visible: usize,
    #[serde(default = "default_name_max_len")]
    pub name_max_len: usize,
    #[serde(default = "default_preview_lines")]
    pub preview_lines: usize,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            max_visible: default_max_visible(),
            name_max_len: default_name_max_len(),
            preview_lines: default_preview_lines(),
        }
    }
}

fn default_max_visible() -> usize {
    3
}
fn default_name_max_len() -> usize {
    50
}
fn default_preview_lines() -> usize {
    20
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LogConfig {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "warn".to_string()
}

impl Config {
    /// Built-in defaults, used when no config file exists.
    pub fn minimal() -> Self {
        Self::default()
    }
}

/// Read and validate a config file. A missing file yields the defaults;
/// an unreadable or invalid one is an error.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::minimal());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.shell.program.trim().is_empty() {
        anyhow::bail!("shell.program must not be empty");
    }

    if config.view.max_visible == 0 {
        anyhow::bail!("view.max_visible must be >= 1");
    }

    if config.view.name_max_len < 4 {
        anyhow::bail!("view.name_max_len must be >= 4");
    }

    EnvFilter::try_new(&config.log.level)
        .with_context(|| format!("Invalid log.level: '{}'", config.log.level))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_config(body: &str) -> (TempDir, std::path::PathBuf) {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bufpipe.toml");
        fs::write(&path, body).unwrap();
        (tmp, path)
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let cfg = load_config(&tmp.path().join("nope.toml")).unwrap();
        assert_eq!(cfg.shell.program, "sh");
        assert_eq!(cfg.shell.args, vec!["-c"]);
        assert_eq!(cfg.view.max_visible, 3);
        assert_eq!(cfg.view.name_max_len, 50);
        assert_eq!(cfg.log.level, "warn");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let (_tmp, path) = write_config("[view]\nmax_visible = 5\n");
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.view.max_visible, 5);
        assert_eq!(cfg.view.preview_lines, 20);
        assert_eq!(cfg.shell.program, "sh");
    }

    #[test]
    fn test_rejects_zero_visible() {
        let (_tmp, path) = write_config("[view]\nmax_visible = 0\n");
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("max_visible"));
    }

    #[test]
    fn test_rejects_empty_program() {
        let (_tmp, path) = write_config("[shell]\nprogram = \"  \"\n");
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_rejects_bad_log_level() {
        let (_tmp, path) = write_config("[log]\nlevel = \"bufpipe=loud\"\n");
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_rejects_malformed_toml() {
        let (_tmp, path) = write_config("[view\n");
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("parse"));
    }
}
