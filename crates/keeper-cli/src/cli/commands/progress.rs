//! Single-line spinner for live rsync progress.

use keeper_core::backend::{Phase, ProgressEvent};
use std::io::Write;

const SPINNER: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];
const FILE_WIDTH: usize = 50;

#[derive(Debug, Default)]
pub(super) struct ProgressLine {
    tick: usize,
    last_len: usize,
}

impl ProgressLine {
    pub(super) fn update(&mut self, job: &str, ev: &ProgressEvent) {
        if ev.phase == Phase::Done {
            return;
        }
        self.tick = (self.tick + 1) % SPINNER.len();
        let line = format!(
            "{} [{job}] {} files | {}",
            SPINNER[self.tick],
            ev.files_count,
            tail(&ev.current_file, FILE_WIDTH)
        );
        let len = line.chars().count();
        let pad = self.last_len.saturating_sub(len);
        self.last_len = len;
        let mut out = std::io::stdout().lock();
        let _ = write!(out, "\r{line}{}", " ".repeat(pad));
        let _ = out.flush();
    }

    pub(super) fn clear(&mut self) {
        if self.last_len > 0 {
            let mut out = std::io::stdout().lock();
            let _ = write!(out, "\r{}\r", " ".repeat(self.last_len));
            let _ = out.flush();
            self.last_len = 0;
        }
    }
}

/// Keep the end of a long path, which is the informative part.
fn tail(s: &str, max: usize) -> String {
    let count = s.chars().count();
    if count <= max {
        return s.to_string();
    }
    let rest: String = s.chars().skip(count - (max - 3)).collect();
    format!("...{rest}")
}
