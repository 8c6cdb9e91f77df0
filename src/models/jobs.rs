use chrono::{DateTime, Utc};
use serde::Serialize;

/// Report text used when the playbook fails without writing to stderr
pub const NON_ZERO_EXIT_MESSAGE: &str = "Playbook exited with non-zero return code";

/// JobOutcome is what one external action run produced
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobOutcome {
    /// Exit code; `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl JobOutcome {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code: Some(exit_code),
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Failure diagnostic: stderr if anything was written, otherwise a fixed message
    pub fn diagnostic(&self) -> String {
        if self.stderr.is_empty() {
            NON_ZERO_EXIT_MESSAGE.to_string()
        } else {
            self.stderr.clone()
        }
    }
}

/// Output of one device, already prefixed with its header
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceReport {
    pub identity: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceFailure {
    pub identity: String,
    pub text: String,
}

/// BatchResult collects the per-device reports and failures of one submission
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub batch_id: String,
    pub reports: Vec<DeviceReport>,
    pub failures: Vec<DeviceFailure>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl BatchResult {
    pub fn new(batch_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            batch_id: batch_id.into(),
            reports: Vec::new(),
            failures: Vec::new(),
            started_at: now,
            completed_at: now,
        }
    }

    /// All reports separated by a blank line, or `None` when nothing ran
    pub fn combined_report(&self) -> Option<String> {
        if self.reports.is_empty() {
            return None;
        }
        Some(
            self.reports
                .iter()
                .map(|r| r.text.as_str())
                .collect::<Vec<_>>()
                .join("\n\n"),
        )
    }

    /// One `[identity] text` line per failure, or `None` when every device succeeded
    pub fn combined_failures(&self) -> Option<String> {
        if self.failures.is_empty() {
            return None;
        }
        Some(
            self.failures
                .iter()
                .map(|f| format!("[{}] {}", f.identity, f.text))
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }
}
