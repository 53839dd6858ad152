use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::staging::StagingMode;

/// Installer configuration. Every name and directory the pipeline touches
/// lives here; the defaults are what the shipped agent expects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    pub artifacts: ArtifactConfig,
    pub systemd: SystemdConfig,
    pub task: TaskConfig,
}

/// Names shared by both platform families.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    /// Binary name next to the running installer
    pub binary: String,
    /// Binary name inside the install directory
    pub installed_binary: String,
    /// Install subdirectory under the home/profile directory
    pub install_dir: String,
    /// Where the binary and descriptors are picked up from. Defaults to the
    /// directory of the running executable.
    pub source_dir: Option<PathBuf>,
    pub staging: StagingMode,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        let binary = if cfg!(windows) { "aura.exe" } else { "aura" };
        Self {
            binary: binary.to_string(),
            installed_binary: binary.to_string(),
            install_dir: ".aura".to_string(),
            source_dir: None,
            staging: StagingMode::default(),
        }
    }
}

/// First platform family: systemd units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemdConfig {
    /// Home directory used for the install directory when running as root
    pub root_home: String,
    /// Installed service unit name (also the user-scope source name)
    pub service: String,
    /// Source name of the system-scope service unit, installed as `service`
    pub system_service: String,
    pub timer: String,
    /// User unit directory, relative to `$HOME`
    pub user_unit_dir: String,
    pub system_unit_dir: String,
}

impl Default for SystemdConfig {
    fn default() -> Self {
        Self {
            root_home: "/root".to_string(),
            service: "aura.service".to_string(),
            system_service: "aura-system.service".to_string(),
            timer: "aura.timer".to_string(),
            user_unit_dir: ".config/systemd/user".to_string(),
            system_unit_dir: "/etc/systemd/system".to_string(),
        }
    }
}

/// Second platform family: Windows Task Scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    pub admin_install_dir: String,
    pub name: String,
    /// `/sc` schedule frequency
    pub frequency: String,
    /// `/mo` modifier for the frequency
    pub modifier: String,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            admin_install_dir: r"C:\Program Files\Aura".to_string(),
            name: "AuraClient".to_string(),
            frequency: "HOURLY".to_string(),
            modifier: "1".to_string(),
        }
    }
}

impl InstallConfig {
    /// Parse a TOML document; missing keys fall back to defaults.
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("Failed to parse installer config")
    }

    /// Load the config from `path`, or from the per-user default location
    /// when it exists, or fall back to built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) if path.exists() => path,
                _ => {
                    log::debug!("No installer config found, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_toml(&raw)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        log::info!("Using config from: {}", path.display());
        Ok(config)
    }

    /// `<config dir>/aura/install.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("aura").join("install.toml"))
    }

    /// Directory the artifacts are staged from.
    pub fn source_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.artifacts.source_dir {
            return Ok(dir.clone());
        }
        let exe = std::env::current_exe().context("Could not locate the running executable")?;
        exe.parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| anyhow::anyhow!("Executable {} has no parent directory", exe.display()))
    }
}
