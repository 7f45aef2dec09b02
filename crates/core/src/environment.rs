//! Environment composition from a tool manifest.
//!
//! Every path element of every tool becomes a `PATH+<TOOL>_<index>` entry and
//! every declared variable is copied verbatim. The host merges `PATH+` entries
//! into `PATH` (see [`EnvironmentMutation::apply_to`]) and lets plain entries
//! override the inherited environment.

use indexmap::IndexMap;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

use crate::manifest::{ToolManifest, ToolRecord};
use crate::platform::PlatformInfo;
use crate::wrapper;
use crate::{Error, Result};

/// Prefix marking an entry that is prepended to `PATH` instead of set.
pub const PATH_PREFIX: &str = "PATH+";

/// Tool whose launcher gets a settings-file wrapper.
pub const MAVEN_TOOL: &str = "maven";

/// Unhandled resource key naming the Maven user settings file.
pub const MAVEN_USER_SETTINGS_FILE: &str = "userSettingsFile";

/// Ordered set of environment entries to apply for the body.
///
/// Writing a key twice keeps its original position and replaces the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentMutation {
    entries: IndexMap<String, String>,
}

impl EnvironmentMutation {
    /// Create an empty mutation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Key for the `index`-th path element of `tool`.
    #[must_use]
    pub fn path_key(tool: &str, index: usize) -> String {
        format!("{PATH_PREFIX}{}_{index}", tool.to_uppercase())
    }

    /// Set a plain variable, returning the previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    /// Add a `PATH+<name>` entry.
    pub fn prepend_path(&mut self, name: &str, value: impl Into<String>) {
        self.entries
            .insert(format!("{PATH_PREFIX}{}", name.to_uppercase()), value.into());
    }

    /// Value of an entry.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// All entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `PATH+` entries in precedence order.
    pub fn path_entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter().filter(|(k, _)| k.starts_with(PATH_PREFIX))
    }

    /// Plain variable entries.
    pub fn variables(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter().filter(|(k, _)| !k.starts_with(PATH_PREFIX))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is to be applied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge into an inherited environment.
    ///
    /// Plain entries override `base`. `PATH+` entries are prepended to `PATH`
    /// so that earlier entries take precedence over later ones and over the
    /// inherited search path.
    #[must_use]
    pub fn apply_to(
        &self,
        base: &HashMap<String, String>,
        platform: &PlatformInfo,
    ) -> HashMap<String, String> {
        let mut env = base.clone();
        for (key, value) in self.variables() {
            env.insert(key.to_string(), value.to_string());
        }

        let prefixes: Vec<&str> = self.path_entries().map(|(_, v)| v).collect();
        if prefixes.is_empty() {
            return env;
        }

        // Windows environments may spell the variable `Path`.
        let path_key = if platform.os.is_windows() {
            env.keys()
                .find(|k| k.eq_ignore_ascii_case("PATH"))
                .cloned()
                .unwrap_or_else(|| "PATH".to_string())
        } else {
            "PATH".to_string()
        };

        let separator = platform.path_separator().to_string();
        let mut path = prefixes.join(&separator);
        if let Some(inherited) = env.get(&path_key).filter(|p| !p.is_empty()) {
            path.push_str(&separator);
            path.push_str(inherited);
        }
        env.insert(path_key, path);
        env
    }
}

impl<'a> IntoIterator for &'a EnvironmentMutation {
    type Item = (&'a String, &'a String);
    type IntoIter = indexmap::map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Optional composition stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComposeOptions {
    /// Wrap the Maven launcher when a user settings file is declared.
    pub wrap_maven_settings: bool,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            wrap_maven_settings: true,
        }
    }
}

/// Turn a manifest into environment entries.
///
/// Apart from writing wrapper scripts this is a pure function of its inputs.
/// When two tools set the same plain variable the later tool in document
/// order wins and a warning is logged. Path indices restart for every record
/// of a tool, so a later record replaces the same indices of an earlier one.
pub fn compose(
    manifest: &ToolManifest,
    platform: &PlatformInfo,
    options: ComposeOptions,
) -> Result<EnvironmentMutation> {
    let mut mutation = EnvironmentMutation::new();
    let mut owners: HashMap<&str, &str> = HashMap::new();

    for (tool, records) in manifest.iter() {
        for record in records {
            for (index, element) in record.path_elements.iter().enumerate() {
                mutation.set(EnvironmentMutation::path_key(tool, index), element.as_str());
            }

            for (key, value) in &record.environment_variables {
                if let Some(previous) = owners.insert(key.as_str(), tool)
                    && previous != tool
                {
                    warn!(
                        %key,
                        first = %previous,
                        second = %tool,
                        "Environment variable set by more than one tool, last one wins"
                    );
                }
                mutation.set(key.as_str(), value.as_str());
            }

            if options.wrap_maven_settings {
                post_process(tool, record, platform)?;
            }
        }
    }

    debug!(entries = mutation.len(), tools = manifest.len(), "Composed environment");
    Ok(mutation)
}

fn post_process(tool: &str, record: &ToolRecord, platform: &PlatformInfo) -> Result<()> {
    if tool != MAVEN_TOOL {
        return Ok(());
    }
    let Some(settings) = record.unhandled_resources.get(MAVEN_USER_SETTINGS_FILE) else {
        return Ok(());
    };
    if !wrapper::supports_wrappers(platform) {
        debug!(%tool, %platform, "Skipping settings wrapper on this platform");
        return Ok(());
    }

    let executable = record.primary_executable.as_deref().ok_or_else(|| {
        Error::wrapper_generation(tool, "no primary executable to wrap")
    })?;
    wrap_maven(executable, settings, platform)
}

fn wrap_maven(executable: &Path, settings: &str, platform: &PlatformInfo) -> Result<()> {
    wrapper::wrap_executable(MAVEN_TOOL, executable, &["-s", settings], platform)?;
    Ok(())
}
