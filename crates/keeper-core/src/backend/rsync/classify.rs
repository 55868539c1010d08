//! Line classification for rsync `-v --stats` output.
//!
//! Every stdout line is one of: a summary statistic, a file being
//! transferred, or noise. Both the statistic patterns and the noise prefixes
//! are plain tables so they can be tested on their own.

use regex::Regex;
use std::sync::LazyLock;

use crate::backend::TransferResult;

/// Which summary counter a statistics line carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatKind {
    FilesTotal,
    FilesTransferred,
    BytesTotal,
    BytesTransferred,
}

/// Result of classifying one output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Stat(StatKind, u64),
    FileTransfer,
    Ignorable,
}

/// Statistic patterns, tested in order. Capture group 1 is the value.
const STAT_RULES: &[(StatKind, &str)] = &[
    // "Number of files: 1,234 (reg: 1,100, dir: 134)"
    (StatKind::FilesTotal, r"^Number of files: ([\d,]+)"),
    // "Number of regular files transferred: 56"
    (
        StatKind::FilesTransferred,
        r"^Number of (?:regular )?files transferred: ([\d,]+)",
    ),
    // "Total file size: 1.23G bytes" / "Total file size: 1,234,567 bytes"
    (StatKind::BytesTotal, r"^Total file size: ([\d,.]+[KMGT]?)"),
    // "Total transferred file size: 456,789 bytes"
    (
        StatKind::BytesTransferred,
        r"^Total transferred file size: ([\d,.]+[KMGT]?)",
    ),
];

/// Informational lines that never name a transferred file.
pub const IGNORED_PREFIXES: &[&str] = &[
    "Number of",
    "Total file",
    "Total transferred",
    "Total bytes",
    "Literal data",
    "Matched data",
    "File list",
    "sent ",
    "total size",
    "sending incremental",
    "building file list",
    "created directory",
    "Speedup is",
    "rsync error",
];

static STAT_PATTERNS: LazyLock<Vec<(StatKind, Regex)>> = LazyLock::new(|| {
    STAT_RULES
        .iter()
        .map(|(kind, pattern)| (*kind, Regex::new(pattern).expect("valid stat pattern")))
        .collect()
});

/// Classify one line of rsync stdout.
pub fn classify(line: &str) -> LineKind {
    let line = line.trim_end_matches(['\r', '\n']);
    for (kind, re) in STAT_PATTERNS.iter() {
        if let Some(caps) = re.captures(line) {
            let raw = &caps[1];
            let value = match kind {
                StatKind::FilesTotal | StatKind::FilesTransferred => parse_count(raw),
                StatKind::BytesTotal | StatKind::BytesTransferred => parse_size(raw),
            };
            return LineKind::Stat(*kind, value);
        }
    }
    if line.trim().is_empty() || IGNORED_PREFIXES.iter().any(|p| line.starts_with(p)) {
        return LineKind::Ignorable;
    }
    LineKind::FileTransfer
}

/// Store a parsed statistic on the result. Later sources overwrite earlier
/// ones, matching what rsync reports for the last invocation.
pub fn apply_stat(result: &mut TransferResult, kind: StatKind, value: u64) {
    match kind {
        StatKind::FilesTotal => result.files_total = value,
        StatKind::FilesTransferred => result.files_transferred = value,
        StatKind::BytesTotal => result.bytes_total = value,
        StatKind::BytesTransferred => result.bytes_transferred = value,
    }
}

/// "1,234" -> 1234. Unparseable input yields 0.
pub fn parse_count(s: &str) -> u64 {
    s.trim().replace(',', "").parse().unwrap_or(0)
}

/// "1,234" -> 1234, "1K" -> 1024, "1.5M" -> 1572864. Suffixes are binary.
pub fn parse_size(s: &str) -> u64 {
    let s = s.trim().replace(',', "");
    let (digits, multiplier) = match s.chars().last() {
        Some('K') => (&s[..s.len() - 1], 1u64 << 10),
        Some('M') => (&s[..s.len() - 1], 1u64 << 20),
        Some('G') => (&s[..s.len() - 1], 1u64 << 30),
        Some('T') => (&s[..s.len() - 1], 1u64 << 40),
        _ => (s.as_str(), 1),
    };
    if let Ok(n) = digits.parse::<u64>() {
        return n.saturating_mul(multiplier);
    }
    match digits.parse::<f64>() {
        Ok(f) if f.is_finite() && f >= 0.0 => (f * multiplier as f64) as u64,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stat_lines_are_parsed() {
        assert_eq!(
            classify("Number of files: 1,234"),
            LineKind::Stat(StatKind::FilesTotal, 1234)
        );
        assert_eq!(
            classify("Number of files: 1,234 (reg: 1,100, dir: 134)"),
            LineKind::Stat(StatKind::FilesTotal, 1234)
        );
        assert_eq!(
            classify("Number of regular files transferred: 56"),
            LineKind::Stat(StatKind::FilesTransferred, 56)
        );
        assert_eq!(
            classify("Number of files transferred: 7"),
            LineKind::Stat(StatKind::FilesTransferred, 7)
        );
        assert_eq!(
            classify("Total file size: 1,234,567"),
            LineKind::Stat(StatKind::BytesTotal, 1_234_567)
        );
        assert_eq!(
            classify("Total file size: 1.50G bytes"),
            LineKind::Stat(StatKind::BytesTotal, 1_610_612_736)
        );
        assert_eq!(
            classify("Total transferred file size: 456,789 "),
            LineKind::Stat(StatKind::BytesTransferred, 456_789)
        );
    }

    #[test]
    fn banners_and_blanks_are_ignorable() {
        for line in [
            "",
            "   ",
            "sending incremental file list",
            "building file list ... done",
            "created directory /backups/docs",
            "sent 1.23K bytes  received 35 bytes  2.53K bytes/sec",
            "total size is 1.02M  speedup is 812.34",
            "Speedup is 1.00",
            "Literal data: 0 bytes",
            "Matched data: 0 bytes",
            "File list size: 0",
            "File list generation time: 0.001 seconds",
            "Number of created files: 3",
            "Number of deleted files: 0",
            "Total bytes sent: 1.23K",
            "rsync error: some files/attrs were not transferred (code 23)",
        ] {
            assert_eq!(classify(line), LineKind::Ignorable, "{line:?}");
        }
    }

    #[test]
    fn other_lines_are_file_transfers() {
        assert_eq!(classify("photos/2024/img_0001.jpg"), LineKind::FileTransfer);
        assert_eq!(classify("./"), LineKind::FileTransfer);
        assert_eq!(classify("deleting old/report.pdf"), LineKind::FileTransfer);
    }

    #[test]
    fn apply_stat_updates_matching_counter() {
        let mut r = TransferResult::started();
        apply_stat(&mut r, StatKind::FilesTotal, 10);
        apply_stat(&mut r, StatKind::FilesTransferred, 4);
        apply_stat(&mut r, StatKind::BytesTotal, 4096);
        apply_stat(&mut r, StatKind::BytesTransferred, 1024);
        assert_eq!(
            (r.files_total, r.files_transferred, r.bytes_total, r.bytes_transferred),
            (10, 4, 4096, 1024)
        );
    }

    #[test]
    fn parse_count_strips_separators() {
        assert_eq!(parse_count("1234"), 1234);
        assert_eq!(parse_count("1,234"), 1234);
        assert_eq!(parse_count("1,234,567"), 1_234_567);
        assert_eq!(parse_count("0"), 0);
        assert_eq!(parse_count("n/a"), 0);
    }

    #[test]
    fn parse_size_handles_suffixes() {
        assert_eq!(parse_size("1024"), 1024);
        assert_eq!(parse_size("1K"), 1024);
        assert_eq!(parse_size("1M"), 1_048_576);
        assert_eq!(parse_size("1G"), 1_073_741_824);
        assert_eq!(parse_size("1,234"), 1234);
        assert_eq!(parse_size("1.5K"), 1536);
        assert_eq!(parse_size(""), 0);
    }
}
