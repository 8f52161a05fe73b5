//! Threat intelligence lookup for a single indicator (IP, domain, URL, file
//! hash or email address).
//!
//! The indicator is checked for the right shape before it is sent, so a
//! mistyped hash or an IP with a stray character is caught locally.

use std::net::IpAddr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::Flow;
use super::prompt::quoted_block;
use super::validate::{optional_text, required_text};
use crate::error::FlowError;

pub const INDICATOR_MIN: usize = 3;
pub const INDICATOR_MAX: usize = 2_048;
pub const CONTEXT_MAX: usize = 4_000;

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorType {
    Ip,
    Domain,
    Url,
    Hash,
    Email,
}

impl IndicatorType {
    fn label(self) -> &'static str {
        match self {
            IndicatorType::Ip => "IP address",
            IndicatorType::Domain => "domain",
            IndicatorType::Url => "URL",
            IndicatorType::Hash => "file hash",
            IndicatorType::Email => "email address",
        }
    }

    /// Whether `value` has the shape this indicator type requires.
    pub fn accepts(self, value: &str) -> bool {
        match self {
            IndicatorType::Ip => value.parse::<IpAddr>().is_ok(),
            IndicatorType::Domain => {
                value.contains('.')
                    && !value.starts_with('.')
                    && !value.ends_with('.')
                    && value
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
            }
            IndicatorType::Url => {
                (value.starts_with("http://") || value.starts_with("https://"))
                    && !value.chars().any(char::is_whitespace)
            }
            // MD5, SHA-1, SHA-256.
            IndicatorType::Hash => {
                matches!(value.len(), 32 | 40 | 64) && value.chars().all(|c| c.is_ascii_hexdigit())
            }
            IndicatorType::Email => match value.split_once('@') {
                Some((local, domain)) => {
                    !local.is_empty() && IndicatorType::Domain.accepts(domain)
                }
                None => false,
            },
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ThreatIntelInput {
    pub indicator: String,
    pub indicator_type: IndicatorType,
    /// Where the indicator was seen.
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Serialize, Deserialize, JsonSchema, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ThreatLevel {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ThreatAssessment {
    pub threat_level: ThreatLevel,
    /// e.g. "command-and-control", "phishing infrastructure", "benign".
    #[schemars(length(min = 1))]
    pub classification: String,
    #[schemars(length(min = 1))]
    pub description: String,
    pub indicators_of_compromise: Vec<String>,
    pub mitigations: Vec<String>,
}

pub struct ThreatIntel;

impl Flow for ThreatIntel {
    const NAME: &'static str = "threat-intel";
    const TITLE: &'static str = "Threat Intelligence";
    const DESCRIPTION: &'static str =
        "Assesses an IP, domain, URL, hash or email address as a threat indicator.";

    type Input = ThreatIntelInput;
    type Output = ThreatAssessment;

    fn validate(input: &ThreatIntelInput) -> Result<(), FlowError> {
        required_text("indicator", &input.indicator, INDICATOR_MIN, INDICATOR_MAX)?;
        if !input.indicator_type.accepts(input.indicator.trim()) {
            return Err(FlowError::validation(
                "indicator",
                format!("is not a valid {}", input.indicator_type.label()),
            ));
        }
        optional_text("context", input.context.as_deref(), CONTEXT_MAX)
    }

    fn prompt(input: &ThreatIntelInput) -> String {
        let mut prompt = format!(
            "Assess the following {} as a threat indicator. Use what is publicly \
             known about it and about similar infrastructure; do not invent \
             specific reports or feed hits.\n{}",
            input.indicator_type.label(),
            quoted_block("indicator", &input.indicator),
        );
        if let Some(context) = input.context.as_deref().filter(|c| !c.trim().is_empty()) {
            prompt.push('\n');
            prompt.push_str(&quoted_block("context", context));
        }
        prompt.push_str(
            "\n\nClassify it, rate the threat level, list related indicators of \
             compromise to hunt for, and recommend mitigations.",
        );
        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(indicator: &str, indicator_type: IndicatorType) -> ThreatIntelInput {
        ThreatIntelInput {
            indicator: indicator.into(),
            indicator_type,
            context: None,
        }
    }

    #[test]
    fn indicator_shapes() {
        assert!(IndicatorType::Ip.accepts("203.0.113.7"));
        assert!(IndicatorType::Ip.accepts("2001:db8::1"));
        assert!(!IndicatorType::Ip.accepts("203.0.113.300"));

        assert!(IndicatorType::Domain.accepts("login-examp1e.com"));
        assert!(!IndicatorType::Domain.accepts("localhost"));
        assert!(!IndicatorType::Domain.accepts("bad domain.com"));

        assert!(IndicatorType::Url.accepts("https://evil.example/a?b=c"));
        assert!(!IndicatorType::Url.accepts("ftp://evil.example"));

        assert!(IndicatorType::Hash.accepts("d41d8cd98f00b204e9800998ecf8427e"));
        assert!(!IndicatorType::Hash.accepts("xyz41d8cd98f00b204e9800998ecf842"));

        assert!(IndicatorType::Email.accepts("ceo@examp1e.com"));
        assert!(!IndicatorType::Email.accepts("@examp1e.com"));
    }

    #[test]
    fn mismatched_type_is_rejected() {
        let err = ThreatIntel::validate(&input("evil.example", IndicatorType::Ip)).unwrap_err();
        match err {
            FlowError::Validation { field, message } => {
                assert_eq!(field, "indicator");
                assert_eq!(message, "is not a valid IP address");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn surrounding_whitespace_is_tolerated() {
        assert!(ThreatIntel::validate(&input("  203.0.113.7 ", IndicatorType::Ip)).is_ok());
    }

    #[test]
    fn prompt_includes_context_block() {
        let mut i = input("203.0.113.7", IndicatorType::Ip);
        i.context = Some("Seen in outbound firewall logs at 03:00".into());
        let prompt = ThreatIntel::prompt(&i);
        assert!(prompt.contains("following IP address"));
        assert!(prompt.contains("--- BEGIN CONTEXT ---"));
    }

    #[test]
    fn indicator_type_deserializes_lowercase() {
        let i: ThreatIntelInput = serde_json::from_value(serde_json::json!({
            "indicator": "d41d8cd98f00b204e9800998ecf8427e",
            "indicatorType": "hash"
        }))
        .unwrap();
        assert_eq!(i.indicator_type, IndicatorType::Hash);
    }
}
