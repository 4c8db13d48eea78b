use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the production install root.
pub const INSTALL_ROOT_ENV: &str = "EXIF_BRIDGE_HOME";

/// Default wait bound for one tool invocation, in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Describes the external exiftool command: its file name, where it is
/// installed, and how long one invocation may run.
///
/// A `ToolConfig` is built once at startup and stays immutable for the
/// rest of the process; every operation borrows it read-only, so
/// concurrent calls need no locking.
///
/// # Loading
///
/// ```rust,no_run
/// use exif_bridge::config::ToolConfig;
///
/// // From a JSON file
/// let config = ToolConfig::load(Some("exif-bridge.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut config = ToolConfig::default();
/// config.program = "exiftool-13.10".into();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    /// File name of the exiftool executable.
    pub program: String,
    /// Explicit install directory. `None` resolves the directory from the
    /// environment (see [`ToolConfig::install_dir`]).
    pub install_dir: Option<PathBuf>,
    /// Upper bound for one invocation, in seconds. A tool that runs past
    /// this is killed and the call reports failure.
    pub timeout_secs: u64,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            program: default_program_name(),
            install_dir: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

fn default_program_name() -> String {
    if cfg!(windows) {
        "exiftool.exe".to_string()
    } else {
        "exiftool".to_string()
    }
}

impl ToolConfig {
    /// Resolve the config file path — same directory as the executable.
    pub fn config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("Failed to get executable path")?;
        let exe_dir = exe_path
            .parent()
            .context("Failed to get executable directory")?;
        Ok(exe_dir.join("exif-bridge.json"))
    }

    /// Load config from the given path, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            log::warn!(
                "Config file not found at {}. Using defaults.",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config: ToolConfig =
            serde_json::from_str(&contents).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Save config to the given path, or to the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, contents).context("Failed to write config file")?;
        log::info!("Config saved to {}", config_path.display());
        Ok(())
    }

    /// The directory the tool is installed into.
    ///
    /// Resolution order:
    /// 1. An explicit `install_dir` from the config.
    /// 2. Development mode — when the working directory holds a `Cargo.toml`
    ///    and a `src/` tree, the tool lives under `target/exiftool`.
    /// 3. `$EXIF_BRIDGE_HOME` if set, else the user's home directory, with
    ///    an `.exiftool` subdirectory.
    pub fn install_dir(&self) -> PathBuf {
        if let Some(ref dir) = self.install_dir {
            return dir.clone();
        }

        if Path::new("Cargo.toml").exists() && Path::new("src").exists() {
            return PathBuf::from("target").join("exiftool");
        }

        let root = std::env::var_os(INSTALL_ROOT_ENV)
            .map(PathBuf::from)
            .or_else(home_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        root.join(".exiftool")
    }

    /// Full path of the installed executable.
    pub fn executable(&self) -> PathBuf {
        self.install_dir().join(&self.program)
    }

    /// The bundled tool payload — a file named like the program, shipped
    /// next to the running executable.
    pub fn bundled_payload(&self) -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("Failed to get executable path")?;
        let exe_dir = exe_path
            .parent()
            .context("Failed to get executable directory")?;
        Ok(exe_dir.join(&self.program))
    }

    /// Wait bound for one invocation.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn home_dir() -> Option<PathBuf> {
    let var = if cfg!(windows) { "USERPROFILE" } else { "HOME" };
    std::env::var_os(var).map(PathBuf::from)
}
