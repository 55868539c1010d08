//! rsync exit codes and their explanations (see `man rsync`, EXIT VALUES).

/// Exit code used when the process was killed by a signal and has no code.
pub const SIGNALLED: i32 = -1;

const EXIT_CODES: &[(i32, &str)] = &[
    (1, "syntax or usage error"),
    (2, "protocol incompatibility"),
    (3, "errors selecting input/output files/dirs"),
    (4, "requested action not supported"),
    (5, "error starting client-server protocol"),
    (6, "daemon unable to append to log file"),
    (10, "error in socket I/O"),
    (11, "error in file I/O"),
    (12, "error in rsync protocol data stream"),
    (13, "errors with program diagnostics"),
    (14, "error in IPC code"),
    (20, "received SIGUSR1 or SIGINT"),
    (21, "some error returned by waitpid()"),
    (22, "error allocating core memory buffers"),
    (
        23,
        "partial transfer: some files/attrs were not transferred (check permissions and paths)",
    ),
    (
        24,
        "partial transfer: vanished source files (files changed during transfer)",
    ),
    (25, "the --max-delete limit stopped deletions"),
    (30, "timeout in data send/receive"),
    (35, "timeout waiting for daemon connection"),
    (255, "SSH connection failed: check host, port, and SSH key"),
];

/// Human-readable explanation for an rsync exit code.
pub fn explain_exit_code(code: i32) -> &'static str {
    EXIT_CODES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, msg)| *msg)
        .unwrap_or("unknown error")
}

/// Error lines for a failed invocation: the coded explanation first, then
/// stderr lines (minus rsync's own redundant "rsync error:" banner).
pub fn describe_failure(code: i32, stderr: &str) -> Vec<String> {
    let mut parts = vec![format!(
        "rsync exited with code {code}: {}",
        explain_exit_code(code)
    )];
    parts.extend(
        stderr
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with("rsync error:"))
            .map(str::to_string),
    );
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_transfer_codes_are_distinguished() {
        let perms = explain_exit_code(23);
        assert!(perms.contains("partial transfer"));
        assert!(perms.contains("permissions"));
        let vanished = explain_exit_code(24);
        assert!(vanished.contains("vanished"));
    }

    #[test]
    fn ssh_failure_and_timeouts_differ() {
        assert!(explain_exit_code(255).contains("SSH connection failed"));
        assert!(explain_exit_code(30).contains("timeout"));
        assert!(!explain_exit_code(30).contains("SSH"));
    }

    #[test]
    fn unknown_codes() {
        assert_eq!(explain_exit_code(99), "unknown error");
        assert_eq!(explain_exit_code(SIGNALLED), "unknown error");
    }

    #[test]
    fn failure_description_skips_banner() {
        let stderr = "rsync: [sender] link_stat \"/nope\" failed: No such file or directory (2)\n\
                      rsync error: some files/attrs were not transferred (see previous errors) (code 23)\n\n";
        let parts = describe_failure(23, stderr);
        assert_eq!(parts.len(), 2);
        assert!(parts[0].starts_with("rsync exited with code 23: partial transfer"));
        assert!(parts[1].contains("link_stat"));
    }
}
