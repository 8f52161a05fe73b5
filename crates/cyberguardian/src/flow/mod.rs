//! The prompt-flow pattern and the dashboard's flows.
//!
//! A flow is four steps: validate the user's input, template it into a
//! natural-language prompt, send that prompt to the model, and validate the
//! model's JSON reply against the flow's output schema. The [`Flow`] trait
//! describes one flow's input, prompt and output types; [`FlowRunner`] runs
//! the four steps for any of them.
//!
//! Flows are independent. Nothing is cached, ordered or retried between runs.
//!
//! | Flow | Module |
//! |------|--------|
//! | `phishing-analysis` | [`phishing`] |
//! | `config-audit` | [`config_audit`] |
//! | `report-summary` | [`report`] |
//! | `security-query` | [`query`] |
//! | `threat-intel` | [`threat_intel`] |
//! | `log-analysis` | [`logs`] |
//! | `incident-response` | [`incident`] |
//! | `vulnerability-assessment` | [`vulnerability`] |

pub mod config_audit;
pub mod incident;
pub mod logs;
pub mod output;
pub mod phishing;
pub mod prompt;
pub mod query;
pub mod report;
pub mod threat_intel;
pub mod validate;
pub mod vulnerability;

use std::fmt;
use std::time::Instant;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::FlowError;
use crate::trace::generate_trace_id;
use crate::{
    ChatRequest, CompletionModel, DEFAULT_MAX_TOKENS, DEFAULT_MODEL, Message, ResponseFormat,
    UsageInfo, json_schema_for,
};

// ── Flow trait ─────────────────────────────────────────────────────

/// One dashboard feature expressed as a prompt flow.
///
/// Implementors are zero-sized marker types; all behavior is associated
/// functions over the input type.
pub trait Flow {
    /// Kebab-case identifier used in URLs and on the command line.
    const NAME: &'static str;
    /// Human-readable title for the dashboard tab.
    const TITLE: &'static str;
    /// One-sentence description of what the flow does.
    const DESCRIPTION: &'static str;

    /// User-supplied fields.
    type Input: DeserializeOwned + Send + Sync;
    /// Structured reply; its JSON Schema is the contract the model must meet.
    type Output: DeserializeOwned + Serialize + JsonSchema + Send;

    /// Check every input field against its bounds.
    fn validate(input: &Self::Input) -> Result<(), FlowError>;

    /// Template validated input into the user prompt.
    fn prompt(input: &Self::Input) -> String;
}

/// Static description of a flow, as listed by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FlowInfo {
    pub name: &'static str,
    pub title: &'static str,
    pub description: &'static str,
}

impl FlowInfo {
    pub fn of<F: Flow>() -> Self {
        Self {
            name: F::NAME,
            title: F::TITLE,
            description: F::DESCRIPTION,
        }
    }
}

// ── Shared vocabulary ──────────────────────────────────────────────

/// Severity scale shared by findings across flows.
#[derive(Serialize, Deserialize, JsonSchema, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        };
        f.write_str(s)
    }
}

// ── Runner ─────────────────────────────────────────────────────────

/// Model parameters applied to every flow request.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: 0.2,
        }
    }
}

/// Result of a successful flow run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowOutcome<T> {
    pub flow: &'static str,
    pub trace_id: String,
    pub model: String,
    #[serde(rename = "result")]
    pub output: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageInfo>,
}

/// Runs flows against a [`CompletionModel`].
pub struct FlowRunner<'a> {
    model: &'a dyn CompletionModel,
    settings: &'a ModelSettings,
}

impl<'a> FlowRunner<'a> {
    pub fn new(model: &'a dyn CompletionModel, settings: &'a ModelSettings) -> Self {
        Self { model, settings }
    }

    /// Build the chat request for already-validated input.
    pub fn build_request<F: Flow>(&self, input: &F::Input) -> ChatRequest {
        let schema = json_schema_for::<F::Output>();
        ChatRequest {
            model: self.settings.model.clone(),
            messages: vec![
                Message::system(prompt::system_prompt(&schema)),
                Message::user(F::prompt(input)),
            ],
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            response_format: Some(ResponseFormat::json_object()),
        }
    }

    /// Validate, prompt, call the model once, and check the reply.
    pub async fn run<F: Flow>(&self, input: &F::Input) -> Result<FlowOutcome<F::Output>, FlowError> {
        let trace_id = generate_trace_id(F::NAME);
        let start = Instant::now();

        let result = self.execute::<F>(input).await;
        match &result {
            Ok((_, usage)) => info!(
                "[{}] {} completed in {:.1}s ({} tokens)",
                trace_id,
                F::NAME,
                start.elapsed().as_secs_f64(),
                usage
                    .as_ref()
                    .and_then(|u| u.total_tokens)
                    .unwrap_or_default(),
            ),
            Err(e) if e.is_client_error() => debug!("[{trace_id}] {} rejected input: {e}", F::NAME),
            Err(e) => warn!("[{trace_id}] {} failed: {e}", F::NAME),
        }

        let (output, usage) = result?;
        Ok(FlowOutcome {
            flow: F::NAME,
            trace_id,
            model: self.settings.model.clone(),
            output,
            usage,
        })
    }

    async fn execute<F: Flow>(
        &self,
        input: &F::Input,
    ) -> Result<(F::Output, Option<UsageInfo>), FlowError> {
        F::validate(input)?;

        let request = self.build_request::<F>(input);
        let completion = self.model.complete(&request).await?;

        let text = completion
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or(FlowError::EmptyResponse)?;
        let schema = json_schema_for::<F::Output>();
        let output = output::parse_output::<F::Output>(&text, &schema)?;
        Ok((output, completion.usage))
    }

    /// Deserialize untyped input, run the flow, and return untyped output.
    pub async fn run_value<F: Flow>(
        &self,
        input: serde_json::Value,
    ) -> Result<FlowOutcome<serde_json::Value>, FlowError> {
        let typed: F::Input =
            serde_json::from_value(input).map_err(|e| FlowError::InvalidInput(e.to_string()))?;
        let outcome = self.run::<F>(&typed).await?;
        let output = serde_json::to_value(&outcome.output)
            .map_err(|e| FlowError::MalformedOutput(e.to_string()))?;
        Ok(FlowOutcome {
            flow: outcome.flow,
            trace_id: outcome.trace_id,
            model: outcome.model,
            output,
            usage: outcome.usage,
        })
    }
}

// ── Registry ───────────────────────────────────────────────────────

/// Every flow the dashboard offers, for dispatch by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowKind {
    PhishingAnalysis,
    ConfigAudit,
    ReportSummary,
    SecurityQuery,
    ThreatIntel,
    LogAnalysis,
    IncidentResponse,
    VulnerabilityAssessment,
}

impl FlowKind {
    pub const ALL: [FlowKind; 8] = [
        FlowKind::PhishingAnalysis,
        FlowKind::ConfigAudit,
        FlowKind::ReportSummary,
        FlowKind::SecurityQuery,
        FlowKind::ThreatIntel,
        FlowKind::LogAnalysis,
        FlowKind::IncidentResponse,
        FlowKind::VulnerabilityAssessment,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    pub fn info(self) -> FlowInfo {
        match self {
            FlowKind::PhishingAnalysis => FlowInfo::of::<phishing::PhishingAnalysis>(),
            FlowKind::ConfigAudit => FlowInfo::of::<config_audit::ConfigAudit>(),
            FlowKind::ReportSummary => FlowInfo::of::<report::ReportSummary>(),
            FlowKind::SecurityQuery => FlowInfo::of::<query::SecurityQuery>(),
            FlowKind::ThreatIntel => FlowInfo::of::<threat_intel::ThreatIntel>(),
            FlowKind::LogAnalysis => FlowInfo::of::<logs::LogAnalysis>(),
            FlowKind::IncidentResponse => FlowInfo::of::<incident::IncidentResponse>(),
            FlowKind::VulnerabilityAssessment => {
                FlowInfo::of::<vulnerability::VulnerabilityAssessment>()
            }
        }
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }

    /// JSON Schema the model's reply must satisfy.
    pub fn output_schema(self) -> serde_json::Value {
        match self {
            FlowKind::PhishingAnalysis => json_schema_for::<phishing::PhishingReport>(),
            FlowKind::ConfigAudit => json_schema_for::<config_audit::ConfigAuditReport>(),
            FlowKind::ReportSummary => json_schema_for::<report::ReportDigest>(),
            FlowKind::SecurityQuery => json_schema_for::<query::QueryAnswer>(),
            FlowKind::ThreatIntel => json_schema_for::<threat_intel::ThreatAssessment>(),
            FlowKind::LogAnalysis => json_schema_for::<logs::LogReport>(),
            FlowKind::IncidentResponse => json_schema_for::<incident::ResponsePlan>(),
            FlowKind::VulnerabilityAssessment => {
                json_schema_for::<vulnerability::VulnerabilityReport>()
            }
        }
    }

    /// Run this flow with untyped JSON input.
    pub async fn run_json(
        self,
        runner: &FlowRunner<'_>,
        input: serde_json::Value,
    ) -> Result<FlowOutcome<serde_json::Value>, FlowError> {
        match self {
            FlowKind::PhishingAnalysis => runner.run_value::<phishing::PhishingAnalysis>(input).await,
            FlowKind::ConfigAudit => runner.run_value::<config_audit::ConfigAudit>(input).await,
            FlowKind::ReportSummary => runner.run_value::<report::ReportSummary>(input).await,
            FlowKind::SecurityQuery => runner.run_value::<query::SecurityQuery>(input).await,
            FlowKind::ThreatIntel => runner.run_value::<threat_intel::ThreatIntel>(input).await,
            FlowKind::LogAnalysis => runner.run_value::<logs::LogAnalysis>(input).await,
            FlowKind::IncidentResponse => {
                runner.run_value::<incident::IncidentResponse>(input).await
            }
            FlowKind::VulnerabilityAssessment => {
                runner
                    .run_value::<vulnerability::VulnerabilityAssessment>(input)
                    .await
            }
        }
    }
}

impl std::str::FromStr for FlowKind {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, FlowError> {
        Self::from_name(s).ok_or_else(|| FlowError::UnknownFlow(s.to_string()))
    }
}

impl fmt::Display for FlowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use crate::{ChatCompletion, ChatRequest, CompletionFuture, CompletionModel, UsageInfo};

    /// A model that replies with a fixed string and records what it was sent.
    pub struct ScriptedModel {
        reply: Option<String>,
        pub requests: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedModel {
        pub fn replying(reply: impl Into<String>) -> Self {
            Self {
                reply: Some(reply.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn silent() -> Self {
            Self {
                reply: None,
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    impl CompletionModel for ScriptedModel {
        fn complete<'a>(&'a self, request: &'a ChatRequest) -> CompletionFuture<'a> {
            self.requests.lock().unwrap().push(request.clone());
            let content = self.reply.clone();
            Box::pin(async move {
                Ok(ChatCompletion {
                    content,
                    usage: Some(UsageInfo {
                        prompt_tokens: Some(100),
                        completion_tokens: Some(20),
                        total_tokens: Some(120),
                    }),
                    finish_reason: Some("stop".into()),
                })
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedModel;
    use super::*;
    use crate::MessageRole;
    use crate::flow::phishing::{PhishingAnalysis, PhishingInput, Verdict};

    const PHISHING_REPLY: &str = r#"{
        "riskScore": 91,
        "verdict": "phishing",
        "threatsIdentified": ["credential harvesting link", "spoofed sender domain"],
        "explanation": "The message imitates IT support and links to a look-alike domain.",
        "recommendedActions": ["Do not click the link", "Report to the security team"]
    }"#;

    fn phishing_input() -> PhishingInput {
        PhishingInput {
            content: "Your mailbox is full. Verify your password at http://examp1e.com/login"
                .into(),
            sender: Some("it-support@examp1e.com".into()),
            subject: Some("Action required".into()),
        }
    }

    #[tokio::test]
    async fn run_returns_typed_output() {
        let model = ScriptedModel::replying(PHISHING_REPLY);
        let settings = ModelSettings::default();
        let runner = FlowRunner::new(&model, &settings);

        let outcome = runner
            .run::<PhishingAnalysis>(&phishing_input())
            .await
            .unwrap();
        assert_eq!(outcome.flow, "phishing-analysis");
        assert_eq!(outcome.output.risk_score, 91);
        assert_eq!(outcome.output.verdict, Verdict::Phishing);
        assert_eq!(outcome.output.threats_identified.len(), 2);
        assert_eq!(outcome.usage.unwrap().total_tokens, Some(120));
        assert!(outcome.trace_id.starts_with("tr-phishing-analysis-"));
    }

    #[tokio::test]
    async fn request_carries_schema_and_settings() {
        let model = ScriptedModel::replying(PHISHING_REPLY);
        let settings = ModelSettings {
            model: "test/model".into(),
            max_tokens: 512,
            temperature: 0.1,
        };
        let runner = FlowRunner::new(&model, &settings);
        runner
            .run::<PhishingAnalysis>(&phishing_input())
            .await
            .unwrap();

        let requests = model.requests.lock().unwrap();
        let req = &requests[0];
        assert_eq!(req.model, "test/model");
        assert_eq!(req.max_tokens, 512);
        assert!(req.response_format.is_some());
        assert_eq!(req.messages.len(), 2);
        assert_eq!(req.messages[0].role, MessageRole::System);
        assert!(req.messages[0].content.contains("riskScore"));
        assert!(req.messages[1].content.contains("examp1e.com"));
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_the_model() {
        let model = ScriptedModel::replying(PHISHING_REPLY);
        let settings = ModelSettings::default();
        let runner = FlowRunner::new(&model, &settings);

        let input = PhishingInput {
            content: "   ".into(),
            sender: None,
            subject: None,
        };
        let err = runner.run::<PhishingAnalysis>(&input).await.unwrap_err();
        assert!(matches!(err, FlowError::Validation { ref field, .. } if field == "content"));
        assert_eq!(model.request_count(), 0);
    }

    #[tokio::test]
    async fn empty_reply_is_an_error() {
        let model = ScriptedModel::silent();
        let settings = ModelSettings::default();
        let runner = FlowRunner::new(&model, &settings);
        let err = runner
            .run::<PhishingAnalysis>(&phishing_input())
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::EmptyResponse));
    }

    #[tokio::test]
    async fn out_of_contract_reply_is_rejected() {
        let model = ScriptedModel::replying(
            r#"{"riskScore": 250, "verdict": "phishing", "threatsIdentified": [],
                "explanation": "x", "recommendedActions": []}"#,
        );
        let settings = ModelSettings::default();
        let runner = FlowRunner::new(&model, &settings);
        let err = runner
            .run::<PhishingAnalysis>(&phishing_input())
            .await
            .unwrap_err();
        match err {
            FlowError::SchemaViolation(errors) => {
                assert!(errors.iter().any(|e| e.contains("riskScore")), "{errors:?}")
            }
            other => panic!("expected schema violation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn run_json_dispatches_by_name() {
        let model = ScriptedModel::replying(PHISHING_REPLY);
        let settings = ModelSettings::default();
        let runner = FlowRunner::new(&model, &settings);

        let kind = FlowKind::from_name("phishing-analysis").unwrap();
        let outcome = kind
            .run_json(
                &runner,
                serde_json::json!({"content": "Click here to claim your prize before midnight!"}),
            )
            .await
            .unwrap();
        assert_eq!(outcome.output["riskScore"], 91);

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["flow"], "phishing-analysis");
        assert!(json["traceId"].is_string());
        assert_eq!(json["result"]["verdict"], "phishing");
    }

    #[tokio::test]
    async fn run_json_rejects_unknown_fields() {
        let model = ScriptedModel::replying(PHISHING_REPLY);
        let settings = ModelSettings::default();
        let runner = FlowRunner::new(&model, &settings);

        let err = FlowKind::PhishingAnalysis
            .run_json(&runner, serde_json::json!({"body": "hello"}))
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::InvalidInput(_)));
        assert_eq!(model.request_count(), 0);
    }

    #[test]
    fn registry_names_are_unique_and_round_trip() {
        let mut names: Vec<&str> = FlowKind::ALL.iter().map(|k| k.name()).collect();
        for kind in FlowKind::ALL {
            assert_eq!(FlowKind::from_name(kind.name()), Some(kind));
            assert!(!kind.info().title.is_empty());
            assert_eq!(kind.output_schema()["type"], "object");
        }
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), FlowKind::ALL.len());
        assert_eq!(FlowKind::from_name("port-scan"), None);
    }

    #[test]
    fn parsing_an_unknown_name_is_an_unknown_flow() {
        assert_eq!(
            "log-analysis".parse::<FlowKind>().unwrap(),
            FlowKind::LogAnalysis
        );
        let err = "port-scan".parse::<FlowKind>().unwrap_err();
        assert!(matches!(&err, FlowError::UnknownFlow(name) if name == "port-scan"));
        assert!(err.is_client_error());
    }

    #[test]
    fn severity_orders_by_impact() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::Low > Severity::Info);
        assert_eq!(Severity::Medium.to_string(), "medium");
    }
}
