//! UI-agnostic chat state
//!
//! This module contains the conversation types shared by every front end
//! (the TUI and the one-shot CLI) and the [`ChatSession`] that owns them.
//! Messages are append-only: the session hands out shared references and the
//! only way to change the transcript is through the session's transitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::agent::Agent;
use crate::responder::Response;

/// Greeting shown as the first message of every session.
pub const WELCOME_MESSAGE: &str = "Welcome to Mednexa! I'm your AI-powered pharma intelligence assistant. I can help you with:\n\n\
• Market analysis and unmet needs\n\
• Clinical trial landscapes\n\
• Patent intelligence\n\
• Trade data and EXIM analysis\n\
• Competitive intelligence\n\n\
Try asking: \"Where is the unmet need in oncology?\"";

/// Prefix of the synthetic query sent when a clarification option is picked.
pub const CLARIFICATION_PREFIX: &str = "I'd like to focus on: ";

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// Kind tag of a [`MessageData`] attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataKind {
    Table,
    Chart,
    Link,
    Pdf,
    Text,
    /// Any type this client does not know how to display.
    #[serde(other)]
    Unknown,
}

/// Display-only payload attached to an assistant message.
///
/// `content` is kept as raw JSON because its shape depends on `kind`; use
/// [`MessageData::body`] for a typed view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageData {
    #[serde(rename = "type")]
    pub kind: DataKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Value,
}

/// One bar of a chart attachment.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartPoint {
    pub name: String,
    pub value: f64,
}

/// Typed view over a [`MessageData`] content value.
#[derive(Debug, Clone, PartialEq)]
pub enum DataBody<'a> {
    Table {
        columns: Vec<&'a str>,
        rows: Vec<&'a Map<String, Value>>,
    },
    Chart(Vec<ChartPoint>),
    Link(&'a str),
    Pdf(&'a str),
    Text(&'a str),
}

impl MessageData {
    pub fn new(kind: DataKind, title: Option<&str>, content: Value) -> Self {
        Self {
            kind,
            title: title.map(str::to_string),
            content,
        }
    }

    /// Decode `content` according to `kind`.
    ///
    /// Returns `None` when the content does not have the shape its kind
    /// promises (a table that is not an array of objects, a link that is not
    /// a string, ...).
    pub fn body(&self) -> Option<DataBody<'_>> {
        match self.kind {
            DataKind::Table => {
                let rows = self
                    .content
                    .as_array()?
                    .iter()
                    .map(Value::as_object)
                    .collect::<Option<Vec<_>>>()?;
                // Column order follows the first row
                let columns = rows
                    .first()
                    .copied()
                    .map(|row| row.keys().map(String::as_str).collect())
                    .unwrap_or_default();
                Some(DataBody::Table { columns, rows })
            }
            DataKind::Chart => {
                let points = self
                    .content
                    .as_array()?
                    .iter()
                    .map(|row| {
                        let name = match row.get("name")? {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        let value = row.get("value")?.as_f64()?;
                        Some(ChartPoint { name, value })
                    })
                    .collect::<Option<Vec<_>>>()?;
                Some(DataBody::Chart(points))
            }
            DataKind::Link => self.content.as_str().map(DataBody::Link),
            DataKind::Pdf => self.content.as_str().map(DataBody::Pdf),
            DataKind::Text => self.content.as_str().map(DataBody::Text),
            DataKind::Unknown => None,
        }
    }
}

/// Render a table cell the way a browser would stringify it.
pub fn cell_text(value: Option<&Value>) -> String {
    match value {
        None => "undefined".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) => "null".to_string(),
        Some(other) => other.to_string(),
    }
}

/// A chat message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: u64,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<MessageData>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub needs_clarification: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clarification_options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_path: Option<String>,
    /// Set when the content came from the local keyword table instead of
    /// the analysis service.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub fallback: bool,
    /// Agents a canned answer is attributed to.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<Agent>,
}

impl Message {
    pub fn new(id: u64, role: Role, content: impl Into<String>) -> Self {
        Self {
            id,
            role,
            content: content.into(),
            timestamp: Utc::now(),
            data: None,
            needs_clarification: None,
            clarification_options: None,
            pdf_path: None,
            fallback: false,
            sources: Vec::new(),
        }
    }

    /// Clarification options to offer, if this message asks for them.
    pub fn clarifications(&self) -> &[String] {
        match (self.needs_clarification, &self.clarification_options) {
            (Some(true), Some(options)) => options,
            _ => &[],
        }
    }
}

/// Handle for one outstanding responder call.
///
/// Only the ticket from the most recent `begin_query` can complete; any
/// older ticket is stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTicket {
    generation: u64,
    query: String,
}

impl QueryTicket {
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Conversation state for one chat session.
#[derive(Debug, Clone)]
pub struct ChatSession {
    messages: Vec<Message>,
    loading: bool,
    generation: u64,
    next_id: u64,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            messages: vec![Message::new(0, Role::Assistant, WELCOME_MESSAGE)],
            loading: false,
            generation: 0,
            next_id: 1,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Most recent assistant message that references a generated report.
    pub fn latest_report(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .filter(|m| m.role == Role::Assistant)
            .find_map(|m| m.pdf_path.as_deref())
    }

    /// Append the user's message and start a new query generation.
    pub fn begin_query(&mut self, text: impl Into<String>) -> QueryTicket {
        let text = text.into();
        let id = self.allocate_id();
        self.messages.push(Message::new(id, Role::User, text.clone()));
        self.loading = true;
        self.generation += 1;
        debug!(generation = self.generation, "query started");
        QueryTicket {
            generation: self.generation,
            query: text,
        }
    }

    /// Start a query for a picked clarification option.
    pub fn clarify(&mut self, option: &str) -> QueryTicket {
        self.begin_query(format!("{}{}", CLARIFICATION_PREFIX, option))
    }

    /// Append the assistant reply for `ticket`.
    ///
    /// Returns `false` and leaves the session untouched when the ticket is
    /// stale (a newer query started or the session was cleared).
    pub fn complete(&mut self, ticket: &QueryTicket, response: Response) -> bool {
        if ticket.generation != self.generation {
            debug!(
                ticket = ticket.generation,
                current = self.generation,
                "discarding stale response"
            );
            return false;
        }
        let id = self.allocate_id();
        self.messages.push(response.into_message(id));
        self.loading = false;
        true
    }

    /// End the loading state for `ticket` without appending a reply.
    pub fn fail(&mut self, ticket: &QueryTicket) -> bool {
        if ticket.generation != self.generation {
            return false;
        }
        self.loading = false;
        true
    }

    /// Reset the transcript to the welcome message.
    pub fn clear(&mut self) {
        self.messages.truncate(1);
        self.loading = false;
        // Outstanding tickets must not land in the fresh conversation
        self.generation += 1;
        info!("conversation cleared");
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}
