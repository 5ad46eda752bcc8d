// TOML persistence for the relayer configuration
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use super::Config;
use crate::error::{Error, Result};

/// Directory under the home directory that Hermes reads its config from
pub const CONFIG_DIR: &str = ".hermes";
pub const CONFIG_FILE: &str = "config.toml";

/// `<home>/.hermes/config.toml`
pub fn config_path() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(CONFIG_DIR).join(CONFIG_FILE))
        .ok_or(Error::NoHomeDirectory)
}

impl Config {
    /// Save to the Hermes default location, see [`config_path`]
    pub fn save(&self) -> Result<PathBuf> {
        let path = config_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Write the full document to `path`, creating parent directories and truncating any existing file
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = self.to_toml()?;
        fs::write(path, content)?;

        info!("Saved relayer config with {} chain(s) to {}", self.chains.len(), path.display());
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Decode a TOML document.
    ///
    /// Unknown keys are ignored and missing keys take the zero value of their
    /// type, not the defaults from [`Config::new`].
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes).map_err(|e| Error::Parse(e.to_string()))?;
        toml::from_str(text).map_err(|e| Error::Parse(e.to_string()))
    }

    /// Read and decode the document at `path`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = fs::read(path)?;
        Self::parse(&bytes)
    }
}
