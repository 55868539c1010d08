use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::job::JobSpec;

/// Prefix used for all XDG directories (`~/.config/keeper`, `~/.local/share/keeper`, ...).
pub const XDG_PREFIX: &str = "keeper";

const DEFAULT_LOG_LEVEL: &str = "info";

/// Global configuration loaded from `~/.config/keeper/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeeperConfig {
    /// Directory for `keeper.log`. Empty means the XDG state directory.
    #[serde(default)]
    pub log_dir: String,
    /// Default tracing level when `RUST_LOG` is not set.
    #[serde(default)]
    pub log_level: String,
    #[serde(default)]
    pub jobs: Vec<JobSpec>,
}

impl Default for KeeperConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            jobs: Vec::new(),
        }
    }
}

impl KeeperConfig {
    /// Fill in defaults for fields left empty in the file.
    fn apply_defaults(&mut self) {
        if self.log_dir.is_empty() {
            self.log_dir = default_log_dir();
        }
        if self.log_level.is_empty() {
            self.log_level = DEFAULT_LOG_LEVEL.to_string();
        }
    }

    pub fn find_job(&self, name: &str) -> Option<&JobSpec> {
        self.jobs.iter().find(|j| j.name == name)
    }

    pub fn add_job(&mut self, job: JobSpec) -> Result<()> {
        if self.find_job(&job.name).is_some() {
            bail!("job {:?} already exists", job.name);
        }
        self.jobs.push(job);
        Ok(())
    }

    pub fn remove_job(&mut self, name: &str) -> Result<JobSpec> {
        let Some(idx) = self.jobs.iter().position(|j| j.name == name) else {
            bail!("job {:?} not found", name);
        };
        Ok(self.jobs.remove(idx))
    }

    /// Validate every job and check that names are unique.
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for job in &self.jobs {
            job.validate()?;
            if !seen.insert(job.name.as_str()) {
                bail!("duplicate job name {:?}", job.name);
            }
        }
        Ok(())
    }
}

fn default_log_dir() -> String {
    state_dir()
        .map(|p| p.join("logs").to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn base_dirs() -> Result<xdg::BaseDirectories> {
    Ok(xdg::BaseDirectories::with_prefix(XDG_PREFIX)?)
}

pub fn config_path() -> Result<PathBuf> {
    Ok(base_dirs()?.place_config_file("config.toml")?)
}

/// `~/.local/share/keeper`: history and the daemon PID file live here.
pub fn data_dir() -> Result<PathBuf> {
    Ok(base_dirs()?.get_data_home())
}

/// `~/.local/state/keeper`: default log location.
pub fn state_dir() -> Result<PathBuf> {
    Ok(base_dirs()?.get_state_home())
}

/// Expand `~` or a leading `~/` to the user's home directory. Other forms
/// such as `~user/x` are returned unchanged.
pub fn expand_path(path: &str) -> PathBuf {
    let rest = match path.strip_prefix('~') {
        Some("") => "",
        Some(rest) => match rest.strip_prefix('/') {
            Some(rest) => rest,
            None => return PathBuf::from(path),
        },
        None => return PathBuf::from(path),
    };
    match std::env::var_os("HOME") {
        Some(home) if rest.is_empty() => PathBuf::from(home),
        Some(home) => PathBuf::from(home).join(rest),
        None => PathBuf::from(path),
    }
}

/// Load configuration from the default path. A missing file is an error,
/// since there are no jobs to run without one.
pub fn load() -> Result<KeeperConfig> {
    let path = config_path()?;
    if !path.exists() {
        bail!(
            "config not found at {} (run `keeper init` first)",
            path.display()
        );
    }
    load_from(&path)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<KeeperConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = KeeperConfig::default();
        save_to(&default_cfg, &path)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from(&path)
}

pub fn load_from(path: &Path) -> Result<KeeperConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("read config: {}", path.display()))?;
    let mut cfg: KeeperConfig =
        toml::from_str(&data).with_context(|| format!("parse config: {}", path.display()))?;
    cfg.apply_defaults();
    Ok(cfg)
}

pub fn save_to(cfg: &KeeperConfig, path: &Path) -> Result<()> {
    let toml = toml::to_string_pretty(cfg).context("serialize config")?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create dir: {}", parent.display()))?;
    }
    fs::write(path, toml).with_context(|| format!("write config: {}", path.display()))?;
    Ok(())
}
