//! Configuration audit: review a system or service configuration for
//! insecure settings.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::prompt::quoted_block;
use super::validate::required_text;
use super::{Flow, Severity};
use crate::error::FlowError;

pub const CONFIG_MIN: usize = 10;
pub const CONFIG_MAX: usize = 50_000;
pub const SYSTEM_TYPE_MIN: usize = 2;
pub const SYSTEM_TYPE_MAX: usize = 100;

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConfigAuditInput {
    pub config: String,
    /// What the configuration belongs to, e.g. "nginx", "sshd", "AWS IAM policy".
    pub system_type: String,
}

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFinding {
    #[schemars(length(min = 1))]
    pub title: String,
    pub severity: Severity,
    pub description: String,
    pub recommendation: String,
}

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ConfigAuditReport {
    /// 100 means no weaknesses found.
    #[schemars(range(min = 0, max = 100))]
    pub security_score: u8,
    pub findings: Vec<ConfigFinding>,
    #[schemars(length(min = 1))]
    pub summary: String,
}

pub struct ConfigAudit;

impl Flow for ConfigAudit {
    const NAME: &'static str = "config-audit";
    const TITLE: &'static str = "Config Auditor";
    const DESCRIPTION: &'static str =
        "Reviews a system configuration for insecure settings and suggests fixes.";

    type Input = ConfigAuditInput;
    type Output = ConfigAuditReport;

    fn validate(input: &ConfigAuditInput) -> Result<(), FlowError> {
        required_text("systemType", &input.system_type, SYSTEM_TYPE_MIN, SYSTEM_TYPE_MAX)?;
        required_text("config", &input.config, CONFIG_MIN, CONFIG_MAX)
    }

    fn prompt(input: &ConfigAuditInput) -> String {
        format!(
            "Audit this {} configuration against current hardening guidance \
             (CIS benchmarks and vendor recommendations where applicable).\n{}\n\n\
             Report each weakness as a finding with a severity and a concrete \
             configuration change. Score overall security from 0 to 100 and \
             summarize the most important changes first.",
            input.system_type.trim(),
            quoted_block("configuration", &input.config),
        )
    }
}
