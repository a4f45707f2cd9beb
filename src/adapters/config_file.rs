//! JSON configuration file adapter.
//!
//! Implements [`ConfigPort`].  A missing file means "use defaults"; a file
//! that exists but does not parse or validate is an error, never silently
//! replaced.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::app::ports::ConfigPort;
use crate::config::ControllerConfig;
use crate::error::ConfigError;

pub struct JsonConfigFile {
    path: PathBuf,
}

impl JsonConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigPort for JsonConfigFile {
    fn load(&self) -> Result<ControllerConfig, ConfigError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("config: {} not found, using defaults", self.path.display());
                return Ok(ControllerConfig::default());
            }
            Err(e) => {
                warn!("config: reading {} failed: {e}", self.path.display());
                return Err(ConfigError::IoError);
            }
        };

        let config: ControllerConfig = serde_json::from_str(&text).map_err(|e| {
            warn!("config: {} is not valid: {e}", self.path.display());
            ConfigError::Corrupted
        })?;
        config.validate()?;
        info!("config: loaded {}", self.path.display());
        Ok(config)
    }
}
