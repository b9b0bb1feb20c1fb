//! Query responder
//!
//! Answers a chat query by calling the analysis service and, when that call
//! fails, by substituting the canned response from the keyword table. The
//! substitution is a policy choice: with [`FallbackPolicy::Surface`] the
//! remote error is handed back to the caller instead.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::agent::Agent;
use crate::api::{AnalysisService, AnalyzeRequest, AnalyzeResponse};
use crate::error::RemoteError;
use crate::fallback::{self, ResponseCandidate};
use crate::state::{Message, MessageData, Role};

/// Content used when the service answers without a summary.
pub const DEFAULT_SUMMARY: &str = "Here is your analysis.";

/// What to do when the analysis service call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackPolicy {
    /// Answer from the keyword table.
    #[default]
    Substitute,
    /// Return the remote error.
    Surface,
}

impl FallbackPolicy {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "substitute" => Some(FallbackPolicy::Substitute),
            "surface" => Some(FallbackPolicy::Surface),
            _ => None,
        }
    }
}

/// Where a response came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseOrigin {
    Remote,
    /// Canned answer; `reason` is the remote failure it replaced.
    Fallback { reason: String },
}

/// A responder answer, ready to become an assistant message.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub content: String,
    pub data: Option<Vec<MessageData>>,
    pub needs_clarification: Option<bool>,
    pub clarification_options: Option<Vec<String>>,
    pub pdf_path: Option<String>,
    /// Agents the content is attributed to; only canned answers name them.
    pub sources: Vec<Agent>,
    pub origin: ResponseOrigin,
}

impl Response {
    /// Build a response from a successful service reply.
    ///
    /// Clarification fields stay empty on this path.
    pub fn from_remote(reply: AnalyzeResponse) -> Self {
        let content = reply
            .summary
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SUMMARY.to_string());
        Self {
            content,
            data: reply.data,
            needs_clarification: None,
            clarification_options: None,
            pdf_path: reply.pdf_filename,
            sources: Vec::new(),
            origin: ResponseOrigin::Remote,
        }
    }

    pub fn from_candidate(candidate: ResponseCandidate, reason: String) -> Self {
        let (needs_clarification, clarification_options) = match candidate.clarification {
            Some(c) => (Some(c.needed), Some(c.options)),
            None => (None, None),
        };
        Self {
            sources: candidate.topic.agents(),
            content: candidate.content,
            data: candidate.data,
            needs_clarification,
            clarification_options,
            pdf_path: None,
            origin: ResponseOrigin::Fallback { reason },
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.origin, ResponseOrigin::Fallback { .. })
    }

    pub fn into_message(self, id: u64) -> Message {
        let fallback = self.is_fallback();
        Message {
            id,
            role: Role::Assistant,
            content: self.content,
            timestamp: Utc::now(),
            data: self.data,
            needs_clarification: self.needs_clarification,
            clarification_options: self.clarification_options,
            pdf_path: self.pdf_path,
            fallback,
            sources: self.sources,
        }
    }
}

/// Answers chat queries. Cheap to clone; clones share the service.
#[derive(Clone)]
pub struct Responder {
    service: Arc<dyn AnalysisService>,
    policy: FallbackPolicy,
}

impl Responder {
    pub fn new(service: Arc<dyn AnalysisService>) -> Self {
        Self {
            service,
            policy: FallbackPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: FallbackPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> FallbackPolicy {
        self.policy
    }

    /// Answer `query`, optionally with extra context for the service.
    ///
    /// Under the default policy this never returns `Err`.
    pub async fn respond(&self, query: &str, context: Option<&str>) -> Result<Response, RemoteError> {
        let request = AnalyzeRequest::new(query).with_context(context);
        match self.service.analyze(&request).await {
            Ok(reply) => {
                debug!("analysis service answered");
                Ok(Response::from_remote(reply))
            }
            Err(err) => match self.policy {
                FallbackPolicy::Surface => Err(err),
                FallbackPolicy::Substitute => {
                    let candidate = fallback::lookup(query);
                    warn!(
                        error = %err,
                        topic = candidate.topic.label(),
                        "analysis service failed, using canned response"
                    );
                    Ok(Response::from_candidate(candidate, err.to_string()))
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback::GENERAL_OPTIONS;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Mutex;

    /// Test double that replays a fixed outcome and records requests.
    struct ScriptedService {
        reply: Option<AnalyzeResponse>,
        seen: Mutex<Vec<AnalyzeRequest>>,
    }

    impl ScriptedService {
        fn ok(reply: AnalyzeResponse) -> Arc<Self> {
            Arc::new(Self {
                reply: Some(reply),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: None,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl AnalysisService for ScriptedService {
        async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalyzeResponse, RemoteError> {
            self.seen.lock().unwrap().push(request.clone());
            match &self.reply {
                Some(reply) => Ok(reply.clone()),
                None => Err(RemoteError::Status {
                    status: 502,
                    body: "bad gateway".to_string(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn remote_success_maps_summary_data_and_pdf() {
        let data: Vec<MessageData> = serde_json::from_value(json!([
            { "type": "text", "title": "Note", "content": "HER2+ is crowded" }
        ]))
        .unwrap();
        let service = ScriptedService::ok(AnalyzeResponse {
            summary: Some("X".to_string()),
            data: Some(data.clone()),
            pdf_filename: Some("r.pdf".to_string()),
        });
        let responder = Responder::new(service.clone());

        let response = responder.respond("oncology", Some("EU5")).await.unwrap();
        assert_eq!(response.content, "X");
        assert_eq!(response.data, Some(data));
        assert_eq!(response.pdf_path.as_deref(), Some("r.pdf"));
        assert_eq!(response.needs_clarification, None);
        assert_eq!(response.origin, ResponseOrigin::Remote);

        let seen = service.seen.lock().unwrap();
        assert_eq!(seen.as_slice(), &[AnalyzeRequest::new("oncology").with_context(Some("EU5"))]);
    }

    #[tokio::test]
    async fn missing_or_empty_summary_uses_default_text() {
        for summary in [None, Some(String::new())] {
            let responder = Responder::new(ScriptedService::ok(AnalyzeResponse {
                summary,
                ..Default::default()
            }));
            let response = responder.respond("anything", None).await.unwrap();
            assert_eq!(response.content, "Here is your analysis.");
        }
    }

    #[tokio::test]
    async fn failure_substitutes_oncology_payload() {
        let responder = Responder::new(ScriptedService::failing());
        let response = responder
            .respond("Where is the UNMET NEED?", None)
            .await
            .unwrap();

        assert!(response.is_fallback());
        assert_eq!(response.needs_clarification, Some(true));
        assert_eq!(
            response.clarification_options,
            Some(vec![
                "By Region".to_string(),
                "By Mechanism of Action".to_string(),
                "By Treatment Line".to_string(),
                "By Patient Population".to_string(),
            ])
        );
        assert_eq!(response.pdf_path, None);
    }

    #[tokio::test]
    async fn failure_without_keyword_uses_default_payload() {
        let responder = Responder::new(ScriptedService::failing());
        let response = responder.respond("hello there", None).await.unwrap();
        assert!(response.content.starts_with("I understand your query."));
        assert_eq!(response.needs_clarification, Some(true));
        assert_eq!(
            response.clarification_options,
            Some(GENERAL_OPTIONS.map(String::from).to_vec())
        );
    }

    #[tokio::test]
    async fn failure_records_reason() {
        let responder = Responder::new(ScriptedService::failing());
        let response = responder.respond("patent cliff", None).await.unwrap();
        match response.origin {
            ResponseOrigin::Fallback { reason } => {
                assert_eq!(reason, "analysis service returned 502: bad gateway")
            }
            other => panic!("expected fallback, got {:?}", other),
        }
        assert_eq!(response.needs_clarification, None);
    }

    #[tokio::test]
    async fn surface_policy_returns_the_error() {
        let responder =
            Responder::new(ScriptedService::failing()).with_policy(FallbackPolicy::Surface);
        let err = responder.respond("oncology", None).await.unwrap_err();
        assert_eq!(err.status(), Some(502));
    }

    #[test]
    fn fallback_message_is_marked() {
        let candidate = fallback::lookup("biosimilar");
        let message = Response::from_candidate(candidate, "down".to_string()).into_message(7);
        assert_eq!(message.id, 7);
        assert_eq!(message.role, Role::Assistant);
        assert!(message.fallback);
        assert_eq!(message.data.as_ref().map(Vec::len), Some(2));
        assert_eq!(message.sources, vec![Agent::Iqvia, Agent::Patent]);
    }

    #[tokio::test]
    async fn remote_answers_name_no_sources() {
        let responder = Responder::new(ScriptedService::ok(AnalyzeResponse::default()));
        let response = responder.respond("patents", None).await.unwrap();
        assert!(response.sources.is_empty());

        let fallback = Responder::new(ScriptedService::failing())
            .respond("phase III trials", None)
            .await
            .unwrap();
        assert_eq!(fallback.sources, vec![Agent::ClinicalTrials]);
    }

    #[test]
    fn policy_parses_config_strings() {
        assert_eq!(FallbackPolicy::from_str("Surface"), Some(FallbackPolicy::Surface));
        assert_eq!(FallbackPolicy::from_str("substitute"), Some(FallbackPolicy::Substitute));
        assert_eq!(FallbackPolicy::from_str("retry"), None);
    }

    #[test]
    fn responder_reports_its_policy() {
        let responder = Responder::new(ScriptedService::failing());
        assert_eq!(responder.policy(), FallbackPolicy::Substitute);
        let responder = responder.with_policy(FallbackPolicy::Surface);
        assert_eq!(responder.policy(), FallbackPolicy::Surface);
    }
}
