use std::path::PathBuf;

use mednexa_core::api::{AnalysisClient, Report};
use mednexa_core::report::save_download;
use mednexa_core::{ChatSession, QueryTicket, RemoteError, Responder, Response};
use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Chat,
    Reports,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Transcript,
    Clarifications,
    Input,
}

/// One-line message shown above the footer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub text: String,
    pub is_error: bool,
}

/// The responder call for the newest query.
pub struct PendingQuery {
    pub ticket: QueryTicket,
    pub task: JoinHandle<Result<Response, RemoteError>>,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub screen: Screen,
    pub input_mode: InputMode,
    pub focus: FocusPane,

    // Chat state
    pub session: ChatSession,
    pub query_input: String,
    pub query_cursor: usize, // cursor position in query_input, in chars
    pub pending: Option<PendingQuery>,
    pub chat_scroll: u16,
    pub chat_height: u16, // inner height of the transcript, set during render
    pub follow_tail: bool,
    pub clarification_state: ListState,

    // Layout areas for mouse hit testing (set during render)
    pub transcript_area: Option<Rect>,
    pub list_area: Option<Rect>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Reports state
    pub reports: Vec<Report>,
    pub reports_state: ListState,
    pub reports_task: Option<JoinHandle<Result<Vec<Report>, RemoteError>>>,
    pub pdf_link_task: Option<JoinHandle<Result<String, RemoteError>>>,

    pub download_task: Option<JoinHandle<anyhow::Result<PathBuf>>>,
    pub status: Option<StatusLine>,

    // Services
    pub responder: Responder,
    pub client: AnalysisClient,
    pub download_dir: PathBuf,
}

impl App {
    pub fn new(client: AnalysisClient, responder: Responder, download_dir: PathBuf) -> Self {
        Self {
            should_quit: false,
            screen: Screen::Chat,
            input_mode: InputMode::Editing,
            focus: FocusPane::Input,

            session: ChatSession::new(),
            query_input: String::new(),
            query_cursor: 0,
            pending: None,
            chat_scroll: 0,
            chat_height: 0,
            follow_tail: true,
            clarification_state: ListState::default(),

            transcript_area: None,
            list_area: None,

            animation_frame: 0,

            reports: Vec::new(),
            reports_state: ListState::default(),
            reports_task: None,
            pdf_link_task: None,

            download_task: None,
            status: None,

            responder,
            client,
            download_dir,
        }
    }

    /// Clarification options offered by the newest message.
    pub fn clarification_options(&self) -> &[String] {
        self.session
            .last_message()
            .map(|m| m.clarifications())
            .unwrap_or(&[])
    }

    /// Send the input box contents. Refused while a query is in flight.
    pub fn submit_query(&mut self) -> bool {
        let text = self.query_input.trim().to_string();
        if text.is_empty() || self.session.is_loading() {
            return false;
        }
        self.query_input.clear();
        self.query_cursor = 0;
        let ticket = self.session.begin_query(text);
        self.start_query(ticket);
        true
    }

    /// Send the highlighted clarification option as a new query.
    pub fn select_clarification(&mut self) -> bool {
        let Some(option) = self
            .clarification_state
            .selected()
            .and_then(|i| self.clarification_options().get(i).cloned())
        else {
            return false;
        };
        let ticket = self.session.clarify(&option);
        self.start_query(ticket);
        self.focus = FocusPane::Input;
        self.input_mode = InputMode::Editing;
        true
    }

    fn start_query(&mut self, ticket: QueryTicket) {
        // A newer ticket makes the old one stale; stop waiting for it
        if let Some(previous) = self.pending.take() {
            previous.task.abort();
        }
        info!(generation = ticket.generation(), "sending query");
        let responder = self.responder.clone();
        let query = ticket.query().to_string();
        let task = tokio::spawn(async move { responder.respond(&query, None).await });
        self.pending = Some(PendingQuery { ticket, task });
        self.clarification_state.select(None);
        self.follow_tail = true;
    }

    /// Collect results of finished background tasks.
    pub async fn poll_tasks(&mut self) {
        if self.pending.as_ref().is_some_and(|p| p.task.is_finished()) {
            if let Some(PendingQuery { ticket, task }) = self.pending.take() {
                match task.await {
                    Ok(Ok(response)) => {
                        if self.session.complete(&ticket, response) {
                            self.follow_tail = true;
                            if !self.clarification_options().is_empty() {
                                self.clarification_state.select(Some(0));
                            }
                        }
                    }
                    Ok(Err(err)) => {
                        warn!(error = %err, "query failed");
                        self.session.fail(&ticket);
                        self.set_error(format!("Analysis failed: {}", err));
                    }
                    Err(err) => {
                        warn!(error = %err, "query task ended abnormally");
                        self.session.fail(&ticket);
                        self.set_error("Analysis task stopped unexpectedly".to_string());
                    }
                }
            }
        }

        if self.reports_task.as_ref().is_some_and(|t| t.is_finished()) {
            if let Some(task) = self.reports_task.take() {
                match task.await {
                    Ok(Ok(reports)) => {
                        self.set_info(format!("{} reports", reports.len()));
                        self.reports = reports;
                        self.reports_state
                            .select(if self.reports.is_empty() { None } else { Some(0) });
                    }
                    Ok(Err(err)) => self.set_error(format!("Could not load reports: {}", err)),
                    Err(_) => self.set_error("Report loading stopped unexpectedly".to_string()),
                }
            }
        }

        if self.pdf_link_task.as_ref().is_some_and(|t| t.is_finished()) {
            if let Some(task) = self.pdf_link_task.take() {
                match task.await {
                    Ok(Ok(url)) => self.set_info(format!("PDF ready: {}", url)),
                    Ok(Err(err)) => self.set_error(format!("Could not generate PDF: {}", err)),
                    Err(_) => self.set_error("PDF generation stopped unexpectedly".to_string()),
                }
            }
        }

        if self.download_task.as_ref().is_some_and(|t| t.is_finished()) {
            if let Some(task) = self.download_task.take() {
                match task.await {
                    Ok(Ok(path)) => self.set_info(format!("Saved {}", path.display())),
                    Ok(Err(err)) => self.set_error(format!("Download failed: {:#}", err)),
                    Err(_) => self.set_error("Download stopped unexpectedly".to_string()),
                }
            }
        }
    }

    /// Reset the conversation to the welcome message.
    pub fn clear_chat(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.task.abort();
        }
        self.session.clear();
        self.chat_scroll = 0;
        self.follow_tail = true;
        self.clarification_state.select(None);
        self.status = None;
        if self.focus == FocusPane::Clarifications {
            self.focus = FocusPane::Transcript;
        }
    }

    /// Download the report referenced by the newest assistant message.
    pub fn download_latest_report(&mut self) {
        let Some(filename) = self.session.latest_report().map(str::to_string) else {
            self.set_error("No report to download yet".to_string());
            return;
        };
        if self.download_task.is_some() {
            return;
        }
        let client = self.client.clone();
        let dir = self.download_dir.clone();
        self.set_info(format!("Downloading {}...", filename));
        self.download_task = Some(tokio::spawn(async move {
            let download = client.download_pdf(&filename).await?;
            save_download(&dir, &download)
        }));
    }

    pub fn open_reports(&mut self) {
        self.screen = Screen::Reports;
        self.input_mode = InputMode::Normal;
        self.refresh_reports();
    }

    pub fn refresh_reports(&mut self) {
        if self.reports_task.is_some() {
            return;
        }
        let client = self.client.clone();
        self.set_info("Loading reports...".to_string());
        self.reports_task = Some(tokio::spawn(async move { client.get_reports().await }));
    }

    pub fn selected_report(&self) -> Option<&Report> {
        self.reports_state.selected().and_then(|i| self.reports.get(i))
    }

    /// Ask the service for a PDF link to the selected report.
    pub fn request_report_pdf(&mut self) {
        if self.pdf_link_task.is_some() {
            return;
        }
        let Some(id) = self.selected_report().map(|r| r.id.clone()) else {
            return;
        };
        let client = self.client.clone();
        self.set_info("Generating PDF...".to_string());
        self.pdf_link_task = Some(tokio::spawn(async move { client.generate_pdf(&id).await }));
    }

    pub fn back_to_chat(&mut self) {
        self.screen = Screen::Chat;
        self.focus = FocusPane::Input;
        self.input_mode = InputMode::Editing;
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.session.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.follow_tail = false;
        self.chat_scroll = self.chat_scroll.saturating_add(lines);
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.follow_tail = false;
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn clarification_nav_down(&mut self) {
        let len = self.clarification_options().len();
        if len > 0 {
            let i = self.clarification_state.selected().map_or(0, |i| (i + 1).min(len - 1));
            self.clarification_state.select(Some(i));
        }
    }

    pub fn clarification_nav_up(&mut self) {
        let i = self.clarification_state.selected().unwrap_or(0);
        self.clarification_state.select(Some(i.saturating_sub(1)));
    }

    pub fn reports_nav_down(&mut self) {
        let len = self.reports.len();
        if len > 0 {
            let i = self.reports_state.selected().map_or(0, |i| (i + 1).min(len - 1));
            self.reports_state.select(Some(i));
        }
    }

    pub fn reports_nav_up(&mut self) {
        let i = self.reports_state.selected().unwrap_or(0);
        self.reports_state.select(Some(i.saturating_sub(1)));
    }

    fn set_info(&mut self, text: String) {
        self.status = Some(StatusLine { text, is_error: false });
    }

    fn set_error(&mut self, text: String) {
        self.status = Some(StatusLine { text, is_error: true });
    }
}
