//! Log analysis: look for anomalies and signs of compromise in pasted logs.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::prompt::{push_optional, quoted_block};
use super::validate::{optional_text, required_text};
use super::{Flow, Severity};
use crate::error::FlowError;

pub const LOGS_MIN: usize = 20;
pub const LOGS_MAX: usize = 100_000;
pub const SOURCE_MAX: usize = 100;

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LogInput {
    pub logs: String,
    /// e.g. "auth.log", "Windows Security", "CloudTrail".
    #[serde(default)]
    pub log_source: Option<String>,
}

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Anomaly {
    #[schemars(length(min = 1))]
    pub description: String,
    pub severity: Severity,
    /// The log lines (or excerpts) that show the anomaly.
    pub evidence: Vec<String>,
}

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LogReport {
    pub overall_severity: Severity,
    pub anomalies: Vec<Anomaly>,
    #[schemars(length(min = 1))]
    pub summary: String,
    pub recommended_actions: Vec<String>,
}

pub struct LogAnalysis;

impl Flow for LogAnalysis {
    const NAME: &'static str = "log-analysis";
    const TITLE: &'static str = "Log Analyzer";
    const DESCRIPTION: &'static str =
        "Finds anomalies and signs of compromise in system or application logs.";

    type Input = LogInput;
    type Output = LogReport;

    fn validate(input: &LogInput) -> Result<(), FlowError> {
        required_text("logs", &input.logs, LOGS_MIN, LOGS_MAX)?;
        optional_text("logSource", input.log_source.as_deref(), SOURCE_MAX)
    }

    fn prompt(input: &LogInput) -> String {
        let mut prompt = String::from(
            "Review these logs for anomalies: brute force, privilege escalation, \
             unusual logins, lateral movement, data exfiltration, and tampering.\n",
        );
        push_optional(&mut prompt, "Log source", input.log_source.as_deref());
        prompt.push_str(&quoted_block("logs", &input.logs));
        prompt.push_str(
            "\n\nFor each anomaly quote the supporting lines as evidence. Rate the \
             overall severity as info if nothing suspicious is present.",
        );
        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Jan 10 03:12:01 host sshd[811]: Failed password for root from 198.51.100.4";

    #[test]
    fn accepts_sample() {
        let input = LogInput {
            logs: SAMPLE.into(),
            log_source: Some("auth.log".into()),
        };
        assert!(LogAnalysis::validate(&input).is_ok());
        let prompt = LogAnalysis::prompt(&input);
        assert!(prompt.contains("Log source: auth.log"));
        assert!(prompt.contains("198.51.100.4"));
    }

    #[test]
    fn rejects_long_source() {
        let input = LogInput {
            logs: SAMPLE.into(),
            log_source: Some("s".repeat(SOURCE_MAX + 1)),
        };
        let err = LogAnalysis::validate(&input).unwrap_err();
        assert!(matches!(err, FlowError::Validation { ref field, .. } if field == "logSource"));
    }
}
