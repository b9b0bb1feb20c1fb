use std::path::Path;

use async_trait::async_trait;
use reqwest::{multipart, Client, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::types::{
    AgentResponse, AnalyzeRequest, AnalyzeResponse, DashboardStats, PdfLink, Report,
    UploadReceipt,
};
use super::AnalysisService;
use crate::error::RemoteError;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";

/// A downloaded report file.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfDownload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// HTTP client for the Mednexa analysis backend.
#[derive(Clone)]
pub struct AnalysisClient {
    client: Client,
    base_url: String,
}

impl AnalysisClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get_reports(&self) -> Result<Vec<Report>, RemoteError> {
        self.get_json("/api/reports").await
    }

    pub async fn get_report(&self, report_id: &str) -> Result<Report, RemoteError> {
        self.get_json(&format!("/api/reports/{}", report_id)).await
    }

    /// Ask the service to render a report and return the PDF URL.
    pub async fn generate_pdf(&self, report_id: &str) -> Result<String, RemoteError> {
        let link: PdfLink = self
            .get_json(&format!("/api/reports/{}/pdf", report_id))
            .await?;
        Ok(link.url)
    }

    pub async fn get_agent_results(&self, query_id: &str) -> Result<Vec<AgentResponse>, RemoteError> {
        self.get_json(&format!("/api/results/{}", query_id)).await
    }

    pub async fn get_dashboard_stats(&self) -> Result<DashboardStats, RemoteError> {
        self.get_json("/api/stats").await
    }

    /// Fetch a generated report by the filename the analysis call returned.
    pub async fn download_pdf(&self, filename: &str) -> Result<PdfDownload, RemoteError> {
        let url = format!("{}/download-pdf", self.base_url);
        debug!(%url, filename, "downloading report");

        let response = self
            .client
            .get(&url)
            .query(&[("filename", filename)])
            .send()
            .await?;
        let response = check_status(response).await?;
        let bytes = response.bytes().await?;

        Ok(PdfDownload {
            filename: crate::report::download_name(filename),
            bytes: bytes.to_vec(),
        })
    }

    pub async fn upload_document(&self, path: &Path) -> Result<UploadReceipt, RemoteError> {
        let url = format!("{}/api/upload", self.base_url);
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        let bytes = tokio::fs::read(path).await?;
        debug!(%url, %file_name, size = bytes.len(), "uploading document");

        let form = multipart::Form::new()
            .part("file", multipart::Part::bytes(bytes).file_name(file_name));
        let response = self.client.post(&url).multipart(form).send().await?;
        decode(check_status(response).await?).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, RemoteError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "GET");
        let response = self.client.get(&url).send().await?;
        decode(check_status(response).await?).await
    }
}

#[async_trait]
impl AnalysisService for AnalysisClient {
    async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalyzeResponse, RemoteError> {
        let url = format!("{}/analyze", self.base_url);
        debug!(%url, query = %request.query, "POST");

        let response = self.client.post(&url).json(request).send().await?;
        decode(check_status(response).await?).await
    }
}

async fn check_status(response: Response) -> Result<Response, RemoteError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(RemoteError::Status { status, body })
}

/// Read the whole body before parsing so a bad payload is reported as a
/// decode error rather than a transport error.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, RemoteError> {
    let text = response.text().await?;
    Ok(serde_json::from_str(&text)?)
}
