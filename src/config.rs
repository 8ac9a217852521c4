use serde::{Deserialize, Serialize};
use std::{
    fs::{create_dir_all, read_to_string, write},
    path::{Path, PathBuf},
};

use crate::error::LanguoidError;

/// Name of the optional configuration file at the repository root.
pub const CONFIG_FILE: &str = "languoids.toml";

/// Where a repository keeps its texts and its tree, relative to the repository root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoConfig {
    pub classification: PathBuf,
    pub dialects: PathBuf,
    pub tree: PathBuf,
}

impl Default for RepoConfig {
    fn default() -> Self {
        RepoConfig {
            classification: PathBuf::from("build/lff.txt"),
            dialects: PathBuf::from("build/dff.txt"),
            tree: PathBuf::from("languoids/tree"),
        }
    }
}

impl RepoConfig {
    /// Read `languoids.toml` below `root`, falling back to the defaults when there is none.
    pub fn load<P: AsRef<Path>>(root: P) -> Result<Self, LanguoidError> {
        let path = root.as_ref().join(CONFIG_FILE);
        tracing::debug!("Attempting to read configuration from: {:?}", &path);
        if !path.exists() {
            tracing::debug!("Config file not found, using default layout.");
            return Ok(RepoConfig::default());
        }
        let content = get_content(&path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save<P: AsRef<Path>>(&self, root: P) -> Result<(), LanguoidError> {
        let path = root.as_ref().join(CONFIG_FILE);
        tracing::debug!("Attempting to write configuration to: {:?}", &path);
        set_content(path, toml::to_string(self)?)
    }
}

pub fn get_content<P: AsRef<Path>>(path: P) -> Result<String, LanguoidError> {
    tracing::debug!("Reading {:?}", path.as_ref());
    Ok(read_to_string(path)?)
}

/// Write `text` to `path`, creating missing parent directories.
pub fn set_content<P: AsRef<Path>>(path: P, text: String) -> Result<(), LanguoidError> {
    if let Some(parent) = path.as_ref().parent() {
        create_dir_all(parent)?;
    }
    Ok(write(path, text)?)
}
