//! Locates the harness configuration file.
//!
//! An explicit path from [`CONFIG_PATH_ENV`] wins when it names an existing
//! file. A set but dangling path is logged and ignored. Otherwise the first
//! existing file among the working directory, `~/.lumen`, `~/.config/lumen`,
//! and `/etc` is used.

use std::env;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Environment variable naming an explicit configuration file.
pub const CONFIG_PATH_ENV: &str = "LUMEN_CONFIG_PATH";

/// File name searched for in each candidate directory.
pub const CONFIG_FILE_NAME: &str = "lumen_config.yml";

const DISCOVERY_TARGET: &str = "lumen_config::discovery";

/// Search order for the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDiscovery {
    explicit: Option<PathBuf>,
    working_dir: Option<PathBuf>,
    home_dir: Option<PathBuf>,
    system_dir: Option<PathBuf>,
}

impl ConfigDiscovery {
    /// Creates a discovery with no locations; add them with the builders.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a discovery from the process environment.
    ///
    /// Reads [`CONFIG_PATH_ENV`], the current directory, and the user's home
    /// directory. An empty [`CONFIG_PATH_ENV`] counts as unset.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            explicit: env::var_os(CONFIG_PATH_ENV)
                .filter(|value| !value.is_empty())
                .map(PathBuf::from),
            working_dir: env::current_dir().ok(),
            home_dir: dirs::home_dir(),
            system_dir: Some(PathBuf::from("/etc")),
        }
    }

    /// Sets the explicit configuration path.
    #[must_use]
    pub fn with_explicit_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit = Some(path.into());
        self
    }

    /// Sets the directory searched first.
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Sets the home directory whose `.lumen` and `.config/lumen`
    /// subdirectories are searched.
    #[must_use]
    pub fn with_home_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.home_dir = Some(dir.into());
        self
    }

    /// Sets the system-wide directory searched last.
    #[must_use]
    pub fn with_system_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.system_dir = Some(dir.into());
        self
    }

    /// Explicit configuration path, if one was given.
    #[must_use]
    pub fn explicit_path(&self) -> Option<&Path> {
        self.explicit.as_deref()
    }

    /// Search locations in priority order, excluding the explicit path.
    #[must_use]
    pub fn candidates(&self) -> Vec<PathBuf> {
        let mut candidates = Vec::with_capacity(4);
        if let Some(dir) = &self.working_dir {
            candidates.push(dir.join(CONFIG_FILE_NAME));
        }
        if let Some(home) = &self.home_dir {
            candidates.push(home.join(".lumen").join(CONFIG_FILE_NAME));
            candidates.push(home.join(".config").join("lumen").join(CONFIG_FILE_NAME));
        }
        if let Some(dir) = &self.system_dir {
            candidates.push(dir.join(CONFIG_FILE_NAME));
        }
        candidates
    }

    /// Returns the configuration file to load, if any exists.
    #[must_use]
    pub fn locate(&self) -> Option<PathBuf> {
        if let Some(explicit) = &self.explicit {
            if explicit.is_file() {
                debug!(
                    target: DISCOVERY_TARGET,
                    path = %explicit.display(),
                    "using configuration named by {CONFIG_PATH_ENV}"
                );
                return Some(explicit.clone());
            }
            warn!(
                target: DISCOVERY_TARGET,
                path = %explicit.display(),
                "{CONFIG_PATH_ENV} names no file; ignoring it"
            );
        }
        self.candidates().into_iter().find(|path| path.is_file())
    }
}
