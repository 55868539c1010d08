//! `keeper remove <job>` – delete a job from the config. History is kept.

use anyhow::Result;
use keeper_core::config;
use std::io::{BufRead, Write};

fn confirm(name: &str) -> Result<bool> {
    print!("Remove job {name:?}? [y/N] ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

pub fn run_remove(name: &str, yes: bool) -> Result<()> {
    let path = config::config_path()?;
    let mut cfg = config::load_from(&path)?;
    if cfg.find_job(name).is_none() {
        anyhow::bail!("job {name:?} not found");
    }
    if !yes && !confirm(name)? {
        println!("Cancelled");
        return Ok(());
    }
    cfg.remove_job(name)?;
    config::save_to(&cfg, &path)?;
    println!("Removed job {name:?}");
    Ok(())
}
