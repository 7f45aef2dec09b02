//! Session configuration.

use projenv_tools_release::ReleaseSource;
use serde::{Deserialize, Serialize};

/// Default installer configuration file, relative to the workspace.
pub const DEFAULT_CONFIG_FILE: &str = "project-env.toml";

/// Optional stages of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageFlags {
    /// Use an installer already on the search path instead of downloading.
    pub probe_search_path: bool,
    /// Wrap the Maven launcher when a user settings file is declared.
    pub wrap_maven_settings: bool,
}

impl Default for StageFlags {
    fn default() -> Self {
        Self {
            probe_search_path: true,
            wrap_maven_settings: true,
        }
    }
}

/// Everything a session needs besides its execution context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Installer version to download; latest release when unset.
    pub cli_version: Option<String>,
    /// Pass `--debug` to the installer.
    pub cli_debug: bool,
    /// Installer configuration file.
    pub config_file: String,
    /// Where installer releases are published.
    pub release: ReleaseSource,
    /// Optional stages.
    pub features: StageFlags,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cli_version: None,
            cli_debug: false,
            config_file: DEFAULT_CONFIG_FILE.to_string(),
            release: ReleaseSource::default(),
            features: StageFlags::default(),
        }
    }
}

impl SessionConfig {
    /// Arguments passed to the installer after its executable.
    #[must_use]
    pub fn installer_args(&self) -> Vec<String> {
        let mut args = vec![format!("--config-file={}", self.config_file)];
        if self.cli_debug {
            args.push("--debug".to_string());
        }
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.config_file, "project-env.toml");
        assert!(config.cli_version.is_none());
        assert!(config.features.probe_search_path);
        assert!(config.features.wrap_maven_settings);
    }

    #[test]
    fn test_installer_args() {
        let mut config = SessionConfig::default();
        assert_eq!(config.installer_args(), vec!["--config-file=project-env.toml"]);

        config.cli_debug = true;
        config.config_file = "etc/project-env.toml".to_string();
        assert_eq!(
            config.installer_args(),
            vec!["--config-file=etc/project-env.toml", "--debug"]
        );
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: SessionConfig = serde_json::from_str(r#"{"cli_version": "3.4.1"}"#).unwrap();
        assert_eq!(config.cli_version.as_deref(), Some("3.4.1"));
        assert_eq!(config.config_file, DEFAULT_CONFIG_FILE);
    }
}
