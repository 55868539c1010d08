use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::backend::TransferResult;

/// One persisted run. Field names are the on-disk JSON keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub job_name: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub success: bool,
    #[serde(default)]
    pub files_total: u64,
    #[serde(default)]
    pub files_transferred: u64,
    #[serde(default)]
    pub bytes_total: u64,
    #[serde(default)]
    pub bytes_transferred: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(default)]
    pub dry_run: bool,
}

impl RunRecord {
    pub fn from_result(job_name: &str, result: &TransferResult, dry_run: bool) -> Self {
        Self {
            job_name: job_name.to_string(),
            started_at: result.started_at,
            completed_at: result.completed_at,
            success: result.success,
            files_total: result.files_total,
            files_transferred: result.files_transferred,
            bytes_total: result.bytes_total,
            bytes_transferred: result.bytes_transferred,
            errors: result.errors.clone(),
            dry_run,
        }
    }

    /// Wall-clock span of the run; zero if the clock went backwards.
    pub fn duration(&self) -> std::time::Duration {
        (self.completed_at - self.started_at)
            .to_std()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_errors_are_omitted() {
        let mut result = TransferResult::started();
        result.finish();
        let rec = RunRecord::from_result("docs", &result, true);
        let json = serde_json::to_string(&rec).unwrap();
        assert!(!json.contains("\"errors\""));
        assert!(json.contains("\"dry_run\":true"));
        assert!(json.contains("\"job_name\":\"docs\""));
    }

    #[test]
    fn decodes_record_without_optional_fields() {
        let line = r#"{"job_name":"docs","started_at":"2024-05-01T03:00:00Z","completed_at":"2024-05-01T03:02:00Z","success":true}"#;
        let rec: RunRecord = serde_json::from_str(line).unwrap();
        assert_eq!(rec.job_name, "docs");
        assert!(rec.errors.is_empty());
        assert!(!rec.dry_run);
        assert_eq!(rec.duration(), std::time::Duration::from_secs(120));
    }
}
