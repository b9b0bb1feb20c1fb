//! One-shot subcommands that print to stdout instead of opening the TUI.

use std::path::Path;

use anyhow::{Context, Result};
use colored::*;
use mednexa_core::api::{AgentStatus, Report};
use mednexa_core::report::save_download;
use mednexa_core::state::DataBody;
use mednexa_core::{AnalysisClient, ReportStatus, Responder, Response};

use crate::format::{chart_lines, sources_line, table_lines};

const CHART_BAR_WIDTH: usize = 30;

pub async fn ask(responder: &Responder, query: &str, context: Option<&str>) -> Result<()> {
    println!("🔍 Asking Mednexa: {}", query.bold().cyan());
    if let Some(context) = context {
        println!("   with context: {}", context.dimmed());
    }

    let response = responder
        .respond(query, context)
        .await
        .context("Analysis service unavailable")?;
    print_response(&response);
    Ok(())
}

fn print_response(response: &Response) {
    if response.is_fallback() {
        println!(
            "\n{}",
            "⚠️  Analysis service unreachable, showing a built-in answer".yellow()
        );
    }

    println!("\n{}", "Response:".bold().green());
    println!("{}", response.content.replace("**", ""));
    if let Some(sources) = sources_line(&response.sources) {
        println!("{}", sources.dimmed());
    }

    for data in response.data.iter().flatten() {
        println!();
        if let Some(title) = &data.title {
            println!("{}", title.bold().magenta());
        }
        match data.body() {
            Some(DataBody::Table { columns, rows }) => {
                for line in table_lines(&columns, &rows) {
                    println!("  {}", line);
                }
            }
            Some(DataBody::Chart(points)) => {
                for line in chart_lines(&points, CHART_BAR_WIDTH) {
                    println!("  {}", line.blue());
                }
            }
            Some(DataBody::Link(url)) => println!("  🔗 {}", url.underline()),
            Some(DataBody::Pdf(path)) => println!("  📄 {}", path),
            Some(DataBody::Text(text)) => println!("  {}", text),
            None => println!("  {}", data.content.to_string().dimmed()),
        }
    }

    let options = response.clarification_options.as_deref().unwrap_or_default();
    if response.needs_clarification == Some(true) && !options.is_empty() {
        println!("\n{}", "Narrow the question:".bold().blue());
        for option in options {
            println!("  • {}", option);
        }
    }

    if let Some(path) = &response.pdf_path {
        println!(
            "\n{} {}  (mednexa download \"{}\")",
            "Report:".bold().green(),
            path,
            path
        );
    }
}

fn status_label(status: ReportStatus) -> ColoredString {
    match status {
        ReportStatus::Completed => status.as_str().green(),
        ReportStatus::Processing => status.as_str().yellow(),
        ReportStatus::Failed => status.as_str().red(),
    }
}

pub async fn list_reports(client: &AnalysisClient) -> Result<()> {
    let reports = client.get_reports().await.context("Could not load reports")?;

    println!("\n{}", "📚 Reports".bold().blue());
    println!("{}", "=".repeat(30).dimmed());

    if reports.is_empty() {
        println!("{}", "No reports yet".yellow());
        return Ok(());
    }

    for report in &reports {
        println!(
            "  {} {} {} {}",
            report.id.dimmed(),
            status_label(report.status),
            report.title.bold(),
            report.created_at.dimmed()
        );
    }
    println!("\n{} reports", reports.len().to_string().bold());
    Ok(())
}

pub async fn show_report(client: &AnalysisClient, id: &str) -> Result<()> {
    let report = client
        .get_report(id)
        .await
        .with_context(|| format!("Could not load report {}", id))?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &Report) {
    println!("\n{}", report.title.bold().green());
    println!("{}", "=".repeat(40).dimmed());
    println!("{} {}", "Query:".bold(), report.query);
    println!("{} {}", "Created:".bold(), report.created_at);
    println!("{} {}", "Status:".bold(), status_label(report.status));
    if let Some(summary) = &report.summary {
        println!("\n{}", summary.replace("**", ""));
    }
    if let Some(url) = &report.pdf_url {
        println!("\n{} {}", "PDF:".bold(), url.underline());
    }
}

pub async fn agent_results(client: &AnalysisClient, query_id: &str) -> Result<()> {
    let results = client
        .get_agent_results(query_id)
        .await
        .with_context(|| format!("Could not load results for {}", query_id))?;

    println!("\n{}", "🤖 Agent Results".bold().blue());
    println!("{}", "=".repeat(30).dimmed());

    for result in &results {
        let name = result
            .known_agent()
            .map(|a| a.display_name().to_string())
            .unwrap_or_else(|| result.agent.clone());
        let status = match result.status {
            AgentStatus::Success => "success".green(),
            AgentStatus::Pending => "pending".yellow(),
            AgentStatus::Error => "error".red(),
        };
        println!("\n{} {} {}", name.bold(), status, result.timestamp.dimmed());
        for (key, value) in &result.data {
            println!("  {}: {}", key.cyan(), value);
        }
    }
    Ok(())
}

pub async fn download(client: &AnalysisClient, filename: &str, out: &Path) -> Result<()> {
    println!("⬇️  Downloading {}", filename.bold().cyan());
    let download = client
        .download_pdf(filename)
        .await
        .with_context(|| format!("Could not download {}", filename))?;
    let path = save_download(out, &download)?;
    println!("Saved {}", path.display().to_string().green());
    Ok(())
}

pub async fn upload(client: &AnalysisClient, path: &Path) -> Result<()> {
    println!("⬆️  Uploading {}", path.display().to_string().bold().cyan());
    let receipt = client
        .upload_document(path)
        .await
        .with_context(|| format!("Could not upload {}", path.display()))?;
    println!("{} {} ({})", "Uploaded:".bold().green(), receipt.id, receipt.status);
    Ok(())
}

pub async fn stats(client: &AnalysisClient) -> Result<()> {
    let stats = client
        .get_dashboard_stats()
        .await
        .context("Could not load dashboard stats")?;

    println!("\n{}", "📊 Dashboard".bold().blue());
    println!("{}", "=".repeat(30).dimmed());
    println!("  Total queries:      {}", stats.total_queries.to_string().bold());
    println!("  Reports generated:  {}", stats.reports_generated.to_string().bold());
    println!("  Active agents:      {}", stats.active_agents.to_string().bold());
    println!("  Avg response time:  {}s", format!("{:.1}", stats.avg_response_time).bold());
    Ok(())
}
