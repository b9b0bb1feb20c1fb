pub mod agent;
pub mod api;
pub mod config;
pub mod error;
pub mod fallback;
pub mod report;
pub mod responder;
pub mod state;

// Re-export main types for convenience
pub use agent::Agent;
pub use api::{AnalysisClient, AnalysisService, PdfDownload, Report, ReportStatus};
pub use config::Config;
pub use error::RemoteError;
pub use fallback::{ResponseCandidate, Topic};
pub use responder::{FallbackPolicy, Responder, Response, ResponseOrigin};
pub use state::{ChatSession, DataBody, DataKind, Message, MessageData, QueryTicket, Role};
