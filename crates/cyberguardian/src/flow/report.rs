//! Report summarization: condense a long security report for a chosen
//! audience.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::Flow;
use super::prompt::quoted_block;
use super::validate::required_text;
use crate::error::FlowError;

pub const REPORT_MIN: usize = 50;
pub const REPORT_MAX: usize = 100_000;

#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    Executive,
    #[default]
    Technical,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ReportInput {
    pub report: String,
    #[serde(default)]
    pub audience: Audience,
}

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ReportDigest {
    #[schemars(length(min = 1))]
    pub summary: String,
    #[schemars(length(min = 1))]
    pub key_findings: Vec<String>,
    pub critical_issues: Vec<String>,
    pub recommendations: Vec<String>,
}

pub struct ReportSummary;

impl Flow for ReportSummary {
    const NAME: &'static str = "report-summary";
    const TITLE: &'static str = "Report Summarizer";
    const DESCRIPTION: &'static str =
        "Summarizes a security report into key findings, critical issues and recommendations.";

    type Input = ReportInput;
    type Output = ReportDigest;

    fn validate(input: &ReportInput) -> Result<(), FlowError> {
        required_text("report", &input.report, REPORT_MIN, REPORT_MAX)
    }

    fn prompt(input: &ReportInput) -> String {
        let style = match input.audience {
            Audience::Executive => {
                "Write for executives: plain language, business impact and risk, \
                 no jargon or tool output."
            }
            Audience::Technical => {
                "Write for security engineers: keep affected hosts, identifiers \
                 and technical detail."
            }
        };
        format!(
            "Summarize the following security report.\n{style}\n{}\n\n\
             Give a short summary, the key findings, any issues needing immediate \
             attention, and prioritized recommendations.",
            quoted_block("report", &input.report),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audience_defaults_to_technical() {
        let input: ReportInput =
            serde_json::from_value(serde_json::json!({"report": "r"})).unwrap();
        assert_eq!(input.audience, Audience::Technical);
    }

    #[test]
    fn executive_prompt_avoids_jargon() {
        let input = ReportInput {
            report: "Quarterly penetration test found 3 critical issues in the VPN gateway.".into(),
            audience: Audience::Executive,
        };
        assert!(ReportSummary::validate(&input).is_ok());
        assert!(ReportSummary::prompt(&input).contains("Write for executives"));
    }

    #[test]
    fn short_reports_are_rejected() {
        let input = ReportInput {
            report: "too short".into(),
            audience: Audience::Technical,
        };
        assert!(ReportSummary::validate(&input).is_err());
    }
}
