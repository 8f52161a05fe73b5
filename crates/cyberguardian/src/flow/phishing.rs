//! Phishing analysis: score a suspicious email or message.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::Flow;
use super::prompt::{push_optional, quoted_block};
use super::validate::{optional_text, required_text};
use crate::error::FlowError;

pub const CONTENT_MIN: usize = 10;
pub const CONTENT_MAX: usize = 20_000;
/// RFC 5321 path limit.
pub const SENDER_MAX: usize = 320;
pub const SUBJECT_MAX: usize = 500;

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PhishingInput {
    /// Message body, headers included if the user pasted them.
    pub content: String,
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
}

#[derive(Serialize, Deserialize, JsonSchema, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Safe,
    Suspicious,
    Phishing,
}

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PhishingReport {
    /// 0 means certainly legitimate, 100 means certainly malicious.
    #[schemars(range(min = 0, max = 100))]
    pub risk_score: u8,
    pub verdict: Verdict,
    /// Concrete indicators found in the message. Empty for safe messages.
    pub threats_identified: Vec<String>,
    #[schemars(length(min = 1))]
    pub explanation: String,
    pub recommended_actions: Vec<String>,
}

pub struct PhishingAnalysis;

impl Flow for PhishingAnalysis {
    const NAME: &'static str = "phishing-analysis";
    const TITLE: &'static str = "Phishing Analyzer";
    const DESCRIPTION: &'static str =
        "Scores an email or message for phishing risk and lists the indicators found.";

    type Input = PhishingInput;
    type Output = PhishingReport;

    fn validate(input: &PhishingInput) -> Result<(), FlowError> {
        required_text("content", &input.content, CONTENT_MIN, CONTENT_MAX)?;
        optional_text("sender", input.sender.as_deref(), SENDER_MAX)?;
        optional_text("subject", input.subject.as_deref(), SUBJECT_MAX)
    }

    fn prompt(input: &PhishingInput) -> String {
        let mut prompt = String::from(
            "Analyze the following message for phishing, social engineering and \
             malicious links or attachments.\n",
        );
        push_optional(&mut prompt, "Sender", input.sender.as_deref());
        push_optional(&mut prompt, "Subject", input.subject.as_deref());
        prompt.push_str(&quoted_block("message", &input.content));
        prompt.push_str(
            "\n\nAssign a riskScore from 0 to 100 and a verdict. List each \
             indicator you relied on in threatsIdentified, explain your reasoning \
             for a non-expert reader, and give concrete next steps.",
        );
        prompt
    }
}
