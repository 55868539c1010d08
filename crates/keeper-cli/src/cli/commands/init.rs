//! `keeper init` – write a default config file.

use anyhow::{Context, Result};
use keeper_core::config::{self, KeeperConfig};

const EXAMPLE_JOB: &str = r#"
# Example job:
#
# [[jobs]]
# name = "documents"
# schedule = "0 3 * * *"
# compress = true
# sources = [{ path = "~/Documents", exclude = ["*.tmp"] }]
#
# [jobs.destination]
# host = "nas.local"
# user = "backup"
# path = "/srv/backups/documents"
"#;

pub fn run_init() -> Result<()> {
    let path = config::config_path()?;
    if path.exists() {
        println!("Configuration already exists at {}", path.display());
        return Ok(());
    }

    config::save_to(&KeeperConfig::default(), &path)?;
    let mut text = std::fs::read_to_string(&path)
        .with_context(|| format!("read config: {}", path.display()))?;
    text.push_str(EXAMPLE_JOB);
    std::fs::write(&path, text).with_context(|| format!("write config: {}", path.display()))?;

    let data_dir = config::data_dir()?;
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("create data dir: {}", data_dir.display()))?;

    println!("Config saved to {}", path.display());
    println!("Edit it to add jobs, then run `keeper doctor`.");
    Ok(())
}
