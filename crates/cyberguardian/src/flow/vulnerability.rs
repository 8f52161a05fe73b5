//! Vulnerability assessment from a CVE identifier or a free-text
//! description.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::Flow;
use super::prompt::quoted_block;
use super::validate::{optional_text, required_text};
use crate::error::FlowError;

pub const VULNERABILITY_MIN: usize = 5;
pub const VULNERABILITY_MAX: usize = 20_000;
pub const ENVIRONMENT_MAX: usize = 4_000;

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VulnerabilityInput {
    pub vulnerability: String,
    /// The user's environment, so the assessment can be made specific.
    #[serde(default)]
    pub environment: Option<String>,
}

impl VulnerabilityInput {
    /// Whether the input is a bare CVE identifier such as `CVE-2021-44228`.
    pub fn is_cve_id(&self) -> bool {
        let v = self.vulnerability.trim();
        let Some(rest) = v
            .strip_prefix("CVE-")
            .or_else(|| v.strip_prefix("cve-"))
        else {
            return false;
        };
        match rest.split_once('-') {
            Some((year, seq)) => {
                year.len() == 4
                    && year.chars().all(|c| c.is_ascii_digit())
                    && seq.len() >= 4
                    && seq.chars().all(|c| c.is_ascii_digit())
            }
            None => false,
        }
    }
}

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct VulnerabilityReport {
    /// Estimated CVSS v3 base score.
    #[schemars(range(min = 0, max = 10))]
    pub cvss_estimate: f32,
    #[schemars(length(min = 1))]
    pub summary: String,
    pub affected_components: Vec<String>,
    /// How easily and how actively the flaw is exploited.
    pub exploitability: String,
    #[schemars(length(min = 1))]
    pub remediation: Vec<String>,
}

pub struct VulnerabilityAssessment;

impl Flow for VulnerabilityAssessment {
    const NAME: &'static str = "vulnerability-assessment";
    const TITLE: &'static str = "Vulnerability Assessment";
    const DESCRIPTION: &'static str =
        "Explains a vulnerability, estimates its severity and lists remediation steps.";

    type Input = VulnerabilityInput;
    type Output = VulnerabilityReport;

    fn validate(input: &VulnerabilityInput) -> Result<(), FlowError> {
        required_text(
            "vulnerability",
            &input.vulnerability,
            VULNERABILITY_MIN,
            VULNERABILITY_MAX,
        )?;
        optional_text("environment", input.environment.as_deref(), ENVIRONMENT_MAX)
    }

    fn prompt(input: &VulnerabilityInput) -> String {
        let subject = if input.is_cve_id() {
            format!(
                "Assess {}. If you do not recognize this identifier, say so in \
                 the summary rather than guessing its details.",
                input.vulnerability.trim().to_uppercase()
            )
        } else {
            format!(
                "Assess the vulnerability described below.\n{}",
                quoted_block("vulnerability", &input.vulnerability)
            )
        };

        let mut prompt = subject;
        if let Some(env) = input.environment.as_deref().filter(|e| !e.trim().is_empty()) {
            prompt.push('\n');
            prompt.push_str(&quoted_block("environment", env));
        }
        prompt.push_str(
            "\n\nEstimate a CVSS v3 base score, name the affected components, \
             describe exploitability, and give remediation steps in priority order.",
        );
        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(v: &str) -> VulnerabilityInput {
        VulnerabilityInput {
            vulnerability: v.into(),
            environment: None,
        }
    }

    #[test]
    fn recognizes_cve_ids() {
        assert!(input("CVE-2021-44228").is_cve_id());
        assert!(input(" cve-2014-0160 ").is_cve_id());
        assert!(!input("CVE-21-44228").is_cve_id());
        assert!(!input("SQL injection in the login form").is_cve_id());
    }

    #[test]
    fn cve_prompt_is_normalized() {
        let prompt = VulnerabilityAssessment::prompt(&input("cve-2021-44228"));
        assert!(prompt.starts_with("Assess CVE-2021-44228."));
        assert!(!prompt.contains("BEGIN VULNERABILITY"));
    }

    #[test]
    fn description_prompt_quotes_input() {
        let mut i = input("SQL injection in the login form");
        i.environment = Some("PHP 7.4 behind nginx".into());
        let prompt = VulnerabilityAssessment::prompt(&i);
        assert!(prompt.contains("--- BEGIN VULNERABILITY ---"));
        assert!(prompt.contains("--- BEGIN ENVIRONMENT ---"));
    }

    #[test]
    fn too_short_is_rejected() {
        assert!(VulnerabilityAssessment::validate(&input("xss")).is_err());
    }
}
