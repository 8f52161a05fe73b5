//! Free-text security questions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::Flow;
use super::prompt::quoted_block;
use super::validate::required_text;
use crate::error::FlowError;

pub const QUESTION_MIN: usize = 3;
pub const QUESTION_MAX: usize = 4_000;

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct QueryInput {
    pub question: String,
}

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct QueryAnswer {
    #[schemars(length(min = 1))]
    pub answer: String,
    pub key_points: Vec<String>,
    pub related_topics: Vec<String>,
}

pub struct SecurityQuery;

impl Flow for SecurityQuery {
    const NAME: &'static str = "security-query";
    const TITLE: &'static str = "Security Assistant";
    const DESCRIPTION: &'static str = "Answers a free-text cybersecurity question.";

    type Input = QueryInput;
    type Output = QueryAnswer;

    fn validate(input: &QueryInput) -> Result<(), FlowError> {
        required_text("question", &input.question, QUESTION_MIN, QUESTION_MAX)
    }

    fn prompt(input: &QueryInput) -> String {
        format!(
            "Answer this cybersecurity question accurately and practically. \
             Decline anything that asks for help attacking systems the user does \
             not own.\n{}\n\nList the key points and a few related topics worth \
             reading about.",
            quoted_block("question", &input.question),
        )
    }
}
