use mednexa_core::state::{DataBody, Message, MessageData, Role};
use mednexa_core::{Agent, ReportStatus};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, FocusPane, InputMode, Screen};
use crate::format::{chart_lines, sources_line, table_lines};

/// Width of the longest chart bar, in cells.
const CHART_BAR_WIDTH: usize = 24;

/// Split a line on `**` markers, alternating plain and bold spans.
///
/// An unmatched trailing marker is kept as literal text.
fn styled_line(text: &str) -> Line<'static> {
    let parts: Vec<&str> = text.split("**").collect();
    let balanced = parts.len() % 2 == 1;
    let mut spans = Vec::with_capacity(parts.len());

    for (i, part) in parts.iter().enumerate() {
        let is_last = i == parts.len() - 1;
        if i % 2 == 1 && (balanced || !is_last) {
            if !part.is_empty() {
                spans.push(Span::styled(part.to_string(), Style::default().add_modifier(Modifier::BOLD)));
            }
        } else if i % 2 == 1 {
            spans.push(Span::raw(format!("**{}", part)));
        } else if !part.is_empty() {
            spans.push(Span::raw(part.to_string()));
        }
    }

    Line::from(spans)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, status, footer
    let [header_area, body_area, status_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    match app.screen {
        Screen::Chat => render_chat_screen(app, frame, body_area),
        Screen::Reports => render_reports_screen(app, frame, body_area),
    }

    render_status(app, frame, status_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" Mednexa Chat ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("[{} Agents Active] ", Agent::all().len()),
            Style::default().fg(Color::Green),
        ),
        Span::styled(app.client.base_url().to_string(), Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_status(app: &App, frame: &mut Frame, area: Rect) {
    let Some(status) = &app.status else {
        return;
    };
    let color = if status.is_error { Color::Red } else { Color::Green };
    let line = Paragraph::new(Span::styled(format!(" {}", status.text), Style::default().fg(color)));
    frame.render_widget(line, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };

    let mode_text = match app.screen {
        Screen::Chat => " CHAT ",
        Screen::Reports => " REPORTS ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);
    let hint = |key: &'static str, label: &'static str| {
        [Span::styled(key, key_style), Span::styled(label, label_style)]
    };

    let hints: Vec<Span> = match (app.screen, app.input_mode) {
        (Screen::Chat, InputMode::Editing) => [
            hint(" Enter ", " send "),
            hint(" Tab ", " focus "),
            hint(" ^L ", " clear "),
            hint(" Esc ", " stop typing "),
        ]
        .concat(),
        (Screen::Chat, InputMode::Normal) => {
            let mut hints = hint(" Tab ", " focus ").to_vec();
            if app.focus == FocusPane::Clarifications {
                hints.extend(hint(" j/k ", " option "));
                hints.extend(hint(" Enter ", " choose "));
            } else {
                hints.extend(hint(" j/k ", " scroll "));
            }
            if app.session.latest_report().is_some() {
                hints.extend(hint(" d ", " download "));
            }
            hints.extend(hint(" R ", " reports "));
            hints.extend(hint(" C ", " clear "));
            hints.extend(hint(" i ", " type "));
            hints.extend(hint(" q ", " quit "));
            hints
        }
        (Screen::Reports, _) => [
            hint(" j/k ", " nav "),
            hint(" Enter ", " pdf "),
            hint(" r ", " refresh "),
            hint(" Esc ", " chat "),
            hint(" q ", " quit "),
        ]
        .concat(),
    };

    let footer_content = Line::from(
        vec![Span::styled(mode_text, mode_style), Span::styled(" ", label_style)]
            .into_iter()
            .chain(hints)
            .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_chat_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let options_height = match app.clarification_options().len() {
        0 => 0,
        n => n as u16 + 2,
    };

    let [chat_area, options_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(options_height),
        Constraint::Length(3),
    ])
    .areas(area);

    app.transcript_area = Some(chat_area);
    app.list_area = (options_height > 0).then_some(options_area);

    render_transcript(app, frame, chat_area);
    if options_height > 0 {
        render_clarifications(app, frame, options_area);
    }
    render_input(app, frame, input_area);
}

fn render_transcript(app: &mut App, frame: &mut Frame, area: Rect) {
    let inner_width = area.width.saturating_sub(2);
    app.chat_height = area.height.saturating_sub(2);

    let mut lines: Vec<Line> = Vec::new();
    for message in app.session.messages() {
        push_message(&mut lines, message);
    }

    if app.session.is_loading() {
        lines.push(Line::from(Span::styled(
            "Mednexa:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat(app.animation_frame as usize + 1);
        lines.push(Line::from(Span::styled(
            format!("Agents are analyzing your query{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    // Measured without the block so the count matches the wrapped inner area
    let chat = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false });
    let total = u16::try_from(chat.line_count(inner_width)).unwrap_or(u16::MAX);
    let max_scroll = total.saturating_sub(app.chat_height);
    if app.follow_tail || app.chat_scroll >= max_scroll {
        app.chat_scroll = max_scroll;
        app.follow_tail = true;
    }

    let border_color = if app.focus == FocusPane::Transcript {
        Color::Cyan
    } else {
        Color::DarkGray
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Conversation ");

    let chat = chat.block(block).scroll((app.chat_scroll, 0));
    frame.render_widget(chat, area);
}

fn push_message(lines: &mut Vec<Line<'static>>, message: &Message) {
    let (label, color) = match message.role {
        Role::User => ("You:", Color::Cyan),
        Role::Assistant => ("Mednexa:", Color::Yellow),
        Role::System => ("System:", Color::Magenta),
    };
    let mut heading = vec![
        Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)),
        Span::styled(
            format!(" {}", message.timestamp.format("%H:%M")),
            Style::default().fg(Color::DarkGray),
        ),
    ];
    if message.fallback {
        heading.push(Span::styled(" (fallback)", Style::default().fg(Color::DarkGray)));
    }
    lines.push(Line::from(heading));

    for line in message.content.lines() {
        lines.push(styled_line(line));
    }
    if let Some(sources) = sources_line(&message.sources) {
        lines.push(Line::styled(sources, Style::default().fg(Color::DarkGray)));
    }

    for data in message.data.iter().flatten() {
        push_attachment(lines, data);
    }

    if let Some(path) = &message.pdf_path {
        lines.push(Line::from(vec![
            Span::styled("Report: ", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
            Span::raw(path.clone()),
            Span::styled("  (d to download)", Style::default().fg(Color::DarkGray)),
        ]));
    }

    lines.push(Line::default());
}

fn push_attachment(lines: &mut Vec<Line<'static>>, data: &MessageData) {
    lines.push(Line::default());
    if let Some(title) = &data.title {
        lines.push(Line::from(Span::styled(
            title.clone(),
            Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
        )));
    }

    let muted = Style::default().fg(Color::Gray);
    match data.body() {
        Some(DataBody::Table { columns, rows }) => {
            lines.extend(table_lines(&columns, &rows).into_iter().map(|l| Line::styled(l, muted)));
        }
        Some(DataBody::Chart(points)) => {
            lines.extend(
                chart_lines(&points, CHART_BAR_WIDTH)
                    .into_iter()
                    .map(|l| Line::styled(l, Style::default().fg(Color::Blue))),
            );
        }
        Some(DataBody::Link(url)) => {
            lines.push(Line::from(Span::styled(
                url.to_string(),
                Style::default().fg(Color::Blue).add_modifier(Modifier::UNDERLINED),
            )));
        }
        Some(DataBody::Pdf(path)) => {
            lines.push(Line::from(vec![
                Span::styled("PDF: ", Style::default().fg(Color::Green)),
                Span::raw(path.to_string()),
            ]));
        }
        Some(DataBody::Text(text)) => {
            lines.extend(text.lines().map(styled_line));
        }
        None => lines.push(Line::styled(data.content.to_string(), muted)),
    }
}

fn render_clarifications(app: &mut App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == FocusPane::Clarifications;
    let border_color = if focused { Color::Cyan } else { Color::Magenta };

    let items: Vec<ListItem> = app
        .clarification_options()
        .iter()
        .map(|option| ListItem::new(format!(" {} ", option)))
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border_color))
                .title(" Narrow the question (Tab, Enter) "),
        )
        .highlight_style(
            Style::default()
                .bg(Color::Magenta)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut app.clarification_state);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let border_color = if editing {
        Color::Yellow
    } else {
        Color::DarkGray
    };
    let title = if app.session.is_loading() {
        " Ask (waiting for agents) "
    } else {
        " Ask about markets, trials, patents or trade "
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Horizontal scroll keeps the cursor inside the box
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.query_cursor;
    let scroll_offset = if inner_width == 0 || cursor_pos < inner_width {
        0
    } else {
        cursor_pos - inner_width + 1
    };

    let visible_text: String = app
        .query_input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(block);
    frame.render_widget(input, area);

    if editing {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn status_color(status: ReportStatus) -> Color {
    match status {
        ReportStatus::Completed => Color::Green,
        ReportStatus::Processing => Color::Yellow,
        ReportStatus::Failed => Color::Red,
    }
}

fn render_reports_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let [list_area, detail_area] =
        Layout::horizontal([Constraint::Percentage(45), Constraint::Percentage(55)]).areas(area);
    app.transcript_area = None;
    app.list_area = Some(list_area);

    let items: Vec<ListItem> = app
        .reports
        .iter()
        .map(|report| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<10} ", report.status.as_str()),
                    Style::default().fg(status_color(report.status)),
                ),
                Span::raw(report.title.clone()),
            ]))
        })
        .collect();

    let title = if app.reports_task.is_some() {
        " Reports (loading...) ".to_string()
    } else {
        format!(" Reports ({}) ", app.reports.len())
    };

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(title),
        )
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, list_area, &mut app.reports_state);

    let label = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
    let detail = match app.selected_report() {
        Some(report) => {
            let mut lines = vec![
                Line::from(Span::styled(report.title.clone(), Style::default().bold())),
                Line::default(),
                Line::from(vec![Span::styled("Query: ", label), Span::raw(report.query.clone())]),
                Line::from(vec![Span::styled("Created: ", label), Span::raw(report.created_at.clone())]),
                Line::from(vec![
                    Span::styled("Status: ", label),
                    Span::styled(
                        report.status.as_str(),
                        Style::default().fg(status_color(report.status)),
                    ),
                ]),
            ];
            if let Some(summary) = &report.summary {
                lines.push(Line::default());
                lines.extend(summary.lines().map(styled_line));
            }
            if let Some(url) = &report.pdf_url {
                lines.push(Line::default());
                lines.push(Line::from(vec![Span::styled("PDF: ", label), Span::raw(url.clone())]));
            }
            Text::from(lines)
        }
        None => Text::from(Span::styled(
            "No report selected. Press r to refresh.",
            Style::default().fg(Color::DarkGray),
        )),
    };

    let detail = Paragraph::new(detail)
        .block(Block::default().borders(Borders::ALL).title(" Details "))
        .wrap(Wrap { trim: true });
    frame.render_widget(detail, detail_area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use mednexa_core::fallback::canned;
    use mednexa_core::{AnalysisClient, Responder, Response, Topic};
    use ratatui::{backend::TestBackend, Terminal};
    use std::sync::Arc;

    fn app() -> App {
        let client = AnalysisClient::new("http://127.0.0.1:9");
        let responder = Responder::new(Arc::new(client.clone()));
        App::new(client, responder, std::env::temp_dir())
    }

    fn screen_rows(app: &mut App, width: u16, height: u16) -> Vec<String> {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .chunks(width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect())
            .collect()
    }

    fn fill_with_fallback_replies(app: &mut App) {
        for _ in 0..3 {
            let ticket = app.session.begin_query("hello");
            let response = Response::from_candidate(canned(Topic::General), "down".to_string());
            app.session.complete(&ticket, response);
        }
    }

    fn span_texts(line: &Line) -> Vec<(String, bool)> {
        line.spans
            .iter()
            .map(|s| (s.content.to_string(), s.style.add_modifier.contains(Modifier::BOLD)))
            .collect()
    }

    #[test]
    fn bold_markers_become_bold_spans() {
        let line = styled_line("**Key Findings:** NSCLC leads");
        assert_eq!(
            span_texts(&line),
            vec![
                ("Key Findings:".to_string(), true),
                (" NSCLC leads".to_string(), false),
            ]
        );
    }

    #[test]
    fn unmatched_marker_stays_literal() {
        let line = styled_line("growth **not closed");
        assert_eq!(
            span_texts(&line),
            vec![
                ("growth ".to_string(), false),
                ("**not closed".to_string(), false),
            ]
        );
    }

    #[test]
    fn loading_line_stays_visible_at_any_width() {
        let mut app = app();
        fill_with_fallback_replies(&mut app);
        app.session.begin_query("last question");

        for width in 20..80 {
            app.follow_tail = true;
            let rows = screen_rows(&mut app, width, 30);
            let question = rows.iter().position(|r| r.contains("last question"));
            let loading = rows.iter().position(|r| r.contains("analyzing"));
            assert!(question.is_some(), "question scrolled away at width {}", width);
            assert!(loading.is_some(), "loading line clipped at width {}", width);
            assert!(question < loading);
        }
    }

    #[test]
    fn fallback_reply_lists_its_sources() {
        let mut app = app();
        let ticket = app.session.begin_query("biosimilar pipeline");
        let response = Response::from_candidate(canned(Topic::Biosimilars), "down".to_string());
        app.session.complete(&ticket, response);

        let rows = screen_rows(&mut app, 100, 60);
        assert!(rows.iter().any(|r| r.contains("Sources: IQVIA Agent, Patent Agent")));
    }
}
