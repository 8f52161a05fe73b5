//! Incident response planning.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::prompt::quoted_block;
use super::validate::required_text;
use super::{Flow, Severity};
use crate::error::FlowError;

pub const DESCRIPTION_MIN: usize = 20;
pub const DESCRIPTION_MAX: usize = 20_000;

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct IncidentInput {
    pub description: String,
    /// Reporter's initial estimate. `info` is not accepted for incidents.
    pub severity: Severity,
}

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ResponsePlan {
    /// 1 is the most urgent.
    #[schemars(range(min = 1, max = 5))]
    pub priority: u8,
    #[schemars(length(min = 1))]
    pub containment: Vec<String>,
    pub investigation: Vec<String>,
    pub recovery: Vec<String>,
    /// Who to notify and what to tell them.
    pub communication: String,
}

pub struct IncidentResponse;

impl Flow for IncidentResponse {
    const NAME: &'static str = "incident-response";
    const TITLE: &'static str = "Incident Response";
    const DESCRIPTION: &'static str =
        "Drafts a containment, investigation and recovery plan for a security incident.";

    type Input = IncidentInput;
    type Output = ResponsePlan;

    fn validate(input: &IncidentInput) -> Result<(), FlowError> {
        required_text("description", &input.description, DESCRIPTION_MIN, DESCRIPTION_MAX)?;
        if input.severity == Severity::Info {
            return Err(FlowError::validation(
                "severity",
                "must be low, medium, high or critical",
            ));
        }
        Ok(())
    }

    fn prompt(input: &IncidentInput) -> String {
        format!(
            "A security incident has been reported with initial severity {}.\n{}\n\n\
             Produce an ordered response plan following the NIST incident \
             handling lifecycle: immediate containment steps, investigation \
             steps, recovery steps, and a communication plan. Assign a priority \
             from 1 (drop everything) to 5 (routine).",
            input.severity,
            quoted_block("incident", &input.description),
        )
    }
}
