//! `keeper doctor` – check tools, config, and destination reachability.

use anyhow::Result;
use keeper_core::config;
use keeper_core::job::DEFAULT_SSH_PORT;
use std::collections::BTreeSet;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::process::Command;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

async fn rsync_version() -> Option<String> {
    let out = Command::new("rsync").arg("--version").output().await.ok()?;
    String::from_utf8_lossy(&out.stdout)
        .lines()
        .next()
        .map(str::to_string)
}

async fn check_reachable(addr: &str) -> Result<(), String> {
    match tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(addr)).await {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(format!("timed out after {}s", CONNECT_TIMEOUT.as_secs())),
    }
}

pub async fn run_doctor() -> Result<()> {
    let mut ok = true;

    println!("System");
    match which::which("rsync") {
        Ok(path) => {
            println!("  [ok]   rsync found: {}", path.display());
            if let Some(v) = rsync_version().await {
                println!("         {v}");
            }
        }
        Err(_) => {
            println!("  [fail] rsync not found in PATH (install it with your package manager)");
            ok = false;
        }
    }
    match which::which("ssh") {
        Ok(path) => println!("  [ok]   ssh found: {}", path.display()),
        Err(_) => {
            println!("  [fail] ssh not found in PATH");
            ok = false;
        }
    }

    println!("\nConfiguration");
    match config::load() {
        Err(e) => {
            println!("  [fail] {e:#}");
            ok = false;
        }
        Ok(cfg) => {
            println!("  [ok]   config loaded: {} job(s)", cfg.jobs.len());
            match cfg.validate() {
                Ok(()) => println!("  [ok]   validation passed"),
                Err(e) => {
                    println!("  [fail] validation: {e:#}");
                    ok = false;
                }
            }

            let targets: BTreeSet<(String, u16)> = cfg
                .jobs
                .iter()
                .filter(|j| !j.destination.host.is_empty())
                .map(|j| {
                    let port = match j.destination.port {
                        0 => DEFAULT_SSH_PORT,
                        p => p,
                    };
                    (j.destination.host.clone(), port)
                })
                .collect();
            if !targets.is_empty() {
                println!("\nConnectivity");
            }
            for (host, port) in targets {
                let addr = format!("{host}:{port}");
                match check_reachable(&addr).await {
                    Ok(()) => println!("  [ok]   {addr} reachable"),
                    Err(e) => {
                        println!("  [fail] {addr} connection failed: {e}");
                        ok = false;
                    }
                }
            }
        }
    }

    println!("\nStorage");
    let data_dir = config::data_dir()?;
    if data_dir.is_dir() {
        println!("  [ok]   data directory: {}", data_dir.display());
    } else if data_dir.exists() {
        println!("  [fail] {} exists but is not a directory", data_dir.display());
        ok = false;
    } else {
        println!("  [warn] data directory missing: {} (created on first run)", data_dir.display());
    }

    println!();
    if ok {
        println!("All checks passed.");
        Ok(())
    } else {
        anyhow::bail!("some checks failed, see above")
    }
}
