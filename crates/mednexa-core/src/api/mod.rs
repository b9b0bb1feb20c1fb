//! Client for the remote analysis service
//!
//! [`AnalysisService`] is the one seam the responder depends on; the HTTP
//! implementation lives in [`AnalysisClient`], which also covers the
//! report, stats and upload endpoints used by the front ends.

pub mod client;
pub mod types;

use async_trait::async_trait;

use crate::error::RemoteError;

pub use client::{AnalysisClient, PdfDownload, DEFAULT_API_URL};
pub use types::{
    AgentResponse, AgentStatus, AnalyzeRequest, AnalyzeResponse, DashboardStats, Report,
    ReportStatus, UploadReceipt,
};

/// Something that can answer an analysis query.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Send the query and wait for the complete analysis.
    async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalyzeResponse, RemoteError>;
}
