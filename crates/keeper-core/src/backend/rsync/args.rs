//! rsync command-line construction.

use crate::config::expand_path;
use crate::job::{Destination, JobSpec, Source, DEFAULT_SSH_PORT};

/// Archive + stats + human-readable output are always on; the stats block
/// is what [`super::classify`] parses.
const BASE_ARGS: [&str; 3] = ["-av", "--stats", "--human-readable"];

/// Options for one source, excluding the source and destination operands.
pub fn build_args(job: &JobSpec, source: &Source, dry_run: bool) -> Vec<String> {
    let mut args: Vec<String> = BASE_ARGS.iter().map(|s| s.to_string()).collect();

    if job.compress {
        args.push("-z".to_string());
    }
    if dry_run {
        args.push("--dry-run".to_string());
    }
    if job.delete {
        args.push("--delete".to_string());
    }
    if !job.bandwidth.is_empty() && job.bandwidth != "0" {
        args.push(format!("--bwlimit={}", job.bandwidth));
    }

    args.push("-e".to_string());
    args.push(remote_shell(&job.destination));

    // Includes must precede excludes: rsync applies the first matching rule.
    args.extend(source.include.iter().map(|p| format!("--include={p}")));
    args.extend(source.exclude.iter().map(|p| format!("--exclude={p}")));

    args.extend(job.extra_args.iter().cloned());
    args
}

/// The `-e` argument: `ssh` plus identity file and non-default port.
pub fn remote_shell(dest: &Destination) -> String {
    let mut cmd = String::from("ssh");
    if let Some(key) = dest.ssh_key.as_deref() {
        let key = expand_path(&key.to_string_lossy());
        cmd.push_str(" -i ");
        cmd.push_str(&key.to_string_lossy());
    }
    if dest.port != 0 && dest.port != DEFAULT_SSH_PORT {
        cmd.push_str(&format!(" -p {}", dest.port));
    }
    cmd
}

/// `user@host:path`, or `host:path` without a user.
pub fn build_destination(dest: &Destination) -> String {
    if dest.user.is_empty() {
        format!("{}:{}", dest.host, dest.path)
    } else {
        format!("{}@{}:{}", dest.user, dest.host, dest.path)
    }
}

/// Source operand, always with a trailing slash so rsync copies the
/// directory's contents rather than nesting the directory itself.
pub fn source_arg(source: &Source) -> String {
    let mut path = expand_path(&source.path).to_string_lossy().into_owned();
    if !path.ends_with('/') {
        path.push('/');
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn job_with(f: impl FnOnce(&mut JobSpec)) -> JobSpec {
        let mut job = JobSpec {
            destination: Destination {
                port: 22,
                ..Destination::default()
            },
            ..JobSpec::default()
        };
        f(&mut job);
        job
    }

    fn strs(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn compression_adds_z() {
        let job = job_with(|j| j.compress = true);
        let args = build_args(&job, &Source::new("/home/user/Projects"), false);
        assert_eq!(
            args,
            strs(&["-av", "--stats", "--human-readable", "-z", "-e", "ssh"])
        );
    }

    #[test]
    fn dry_run_flag() {
        let job = job_with(|_| {});
        let args = build_args(&job, &Source::default(), true);
        assert_eq!(
            args,
            strs(&["-av", "--stats", "--human-readable", "--dry-run", "-e", "ssh"])
        );
    }

    #[test]
    fn delete_and_bandwidth() {
        let job = job_with(|j| {
            j.delete = true;
            j.bandwidth = "500k".to_string();
        });
        let args = build_args(&job, &Source::default(), false);
        assert_eq!(
            args,
            strs(&[
                "-av",
                "--stats",
                "--human-readable",
                "--delete",
                "--bwlimit=500k",
                "-e",
                "ssh"
            ])
        );
    }

    #[test]
    fn zero_or_empty_bandwidth_is_omitted() {
        for bw in ["", "0"] {
            let job = job_with(|j| j.bandwidth = bw.to_string());
            let args = build_args(&job, &Source::default(), false);
            assert!(!args.iter().any(|a| a.starts_with("--bwlimit")), "{bw:?}");
        }
    }

    #[test]
    fn ssh_key_and_port_share_one_shell_argument() {
        let job = job_with(|j| {
            j.destination.ssh_key = Some(PathBuf::from("/home/user/.ssh/backup_key"));
            j.destination.port = 2222;
        });
        let args = build_args(&job, &Source::default(), false);
        assert_eq!(
            args,
            strs(&[
                "-av",
                "--stats",
                "--human-readable",
                "-e",
                "ssh -i /home/user/.ssh/backup_key -p 2222"
            ])
        );
    }

    #[test]
    fn default_or_unset_port_is_plain_ssh() {
        for port in [0, 22] {
            let dest = Destination {
                port,
                ..Destination::default()
            };
            assert_eq!(remote_shell(&dest), "ssh");
        }
        let dest = Destination {
            port: 2222,
            ..Destination::default()
        };
        assert!(remote_shell(&dest).contains("-p 2222"));
    }

    #[test]
    fn includes_come_before_excludes_in_order() {
        let job = job_with(|_| {});
        let source = Source {
            path: "/src".to_string(),
            include: strs(&["**/*.go", "**/*.py"]),
            exclude: strs(&["node_modules/", ".git/"]),
        };
        let args = build_args(&job, &source, false);
        assert_eq!(
            &args[5..],
            &strs(&[
                "--include=**/*.go",
                "--include=**/*.py",
                "--exclude=node_modules/",
                "--exclude=.git/"
            ])[..]
        );
    }

    #[test]
    fn extra_args_are_appended_last() {
        let job = job_with(|j| j.extra_args = strs(&["--partial", "--checksum"]));
        let source = Source {
            path: "/src".to_string(),
            exclude: strs(&["tmp/"]),
            ..Source::default()
        };
        let args = build_args(&job, &source, false);
        assert_eq!(
            &args[args.len() - 3..],
            &strs(&["--exclude=tmp/", "--partial", "--checksum"])[..]
        );
    }

    #[test]
    fn destination_with_and_without_user() {
        let mut dest = Destination {
            user: "backup".to_string(),
            host: "server.com".to_string(),
            path: "/backups/test".to_string(),
            ..Destination::default()
        };
        assert_eq!(build_destination(&dest), "backup@server.com:/backups/test");
        dest.user.clear();
        assert_eq!(build_destination(&dest), "server.com:/backups/test");
    }

    #[test]
    fn source_always_ends_with_slash() {
        assert_eq!(source_arg(&Source::new("/home/user/docs")), "/home/user/docs/");
        assert_eq!(source_arg(&Source::new("/home/user/docs/")), "/home/user/docs/");
    }
}
