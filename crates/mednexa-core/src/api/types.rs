use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::state::MessageData;

/// Body of `POST /analyze`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyzeRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl AnalyzeRequest {
    pub fn new(query: &str) -> Self {
        Self {
            query: query.to_string(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: Option<&str>) -> Self {
        self.context = context.map(str::to_string);
        self
    }
}

/// Reply of `POST /analyze`. Every field is optional; the service only
/// guarantees a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    #[serde(default, deserialize_with = "loose_string")]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "loose_data")]
    pub data: Option<Vec<MessageData>>,
    #[serde(default, deserialize_with = "loose_string")]
    pub pdf_filename: Option<String>,
}

/// A string field; any other JSON value reads as absent.
fn loose_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}

/// An attachment array; entries that are not attachment objects are dropped.
fn loose_data<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Vec<MessageData>>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => Some(
            items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
        ),
        _ => None,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Completed,
    Processing,
    Failed,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Completed => "completed",
            ReportStatus::Processing => "processing",
            ReportStatus::Failed => "failed",
        }
    }
}

/// A generated report as listed by `GET /api/reports`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: String,
    pub title: String,
    pub query: String,
    pub created_at: String,
    pub status: ReportStatus,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub pdf_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PdfLink {
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Success,
    Error,
    Pending,
}

/// Per-agent result of `GET /api/results/{query_id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    pub agent: String,
    #[serde(default)]
    pub data: serde_json::Map<String, Value>,
    pub status: AgentStatus,
    pub timestamp: String,
}

impl AgentResponse {
    pub fn known_agent(&self) -> Option<crate::agent::Agent> {
        crate::agent::Agent::from_str(&self.agent)
    }
}

/// `GET /api/stats`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_queries: u64,
    pub reports_generated: u64,
    pub active_agents: u32,
    pub avg_response_time: f64,
}

/// `POST /api/upload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub id: String,
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_omits_missing_context() {
        let body = serde_json::to_value(AnalyzeRequest::new("oncology")).unwrap();
        assert_eq!(body, json!({ "query": "oncology" }));

        let body =
            serde_json::to_value(AnalyzeRequest::new("oncology").with_context(Some("EU"))).unwrap();
        assert_eq!(body, json!({ "query": "oncology", "context": "EU" }));
    }

    #[test]
    fn response_tolerates_missing_fields() {
        let parsed: AnalyzeResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(parsed, AnalyzeResponse::default());

        let parsed: AnalyzeResponse =
            serde_json::from_value(json!({ "summary": "X", "pdfFilename": "r.pdf", "extra": 1 }))
                .unwrap();
        assert_eq!(parsed.summary.as_deref(), Some("X"));
        assert_eq!(parsed.pdf_filename.as_deref(), Some("r.pdf"));
    }

    #[test]
    fn response_keeps_summary_despite_odd_fields() {
        let parsed: AnalyzeResponse = serde_json::from_value(json!({
            "summary": "Oncology outlook",
            "data": [
                { "type": "image", "content": "https://cdn/plot.png" },
                { "type": "text", "content": "NSCLC leads" },
                "not an attachment"
            ],
            "pdfFilename": 17
        }))
        .unwrap();
        assert_eq!(parsed.summary.as_deref(), Some("Oncology outlook"));
        assert_eq!(parsed.pdf_filename, None);
        let data = parsed.data.unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0].kind, crate::state::DataKind::Unknown);
        assert_eq!(data[0].body(), None);

        let parsed: AnalyzeResponse =
            serde_json::from_value(json!({ "summary": ["x"], "data": "none" })).unwrap();
        assert_eq!(parsed, AnalyzeResponse::default());
    }

    #[test]
    fn stats_use_camel_case() {
        let stats: DashboardStats = serde_json::from_value(json!({
            "totalQueries": 1247,
            "reportsGenerated": 89,
            "activeAgents": 6,
            "avgResponseTime": 2.3
        }))
        .unwrap();
        assert_eq!(stats.total_queries, 1247);
        assert_eq!(stats.active_agents, 6);
    }
}
