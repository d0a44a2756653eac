//! Text and JSON rendering shared by the CLI and the shell.

use crate::error::Result;
use crate::gate::GateState;
use crate::location::LocationFix;
use crate::operations::{AttachmentInfo, DocumentInfo, InspectionReport};
use crate::status::ComplianceSummary;
use crate::utils::{describe_days, format_bytes, status_badge};
use colored::*;
use serde::Serialize;

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Print `value` as pretty JSON.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn expiry_text(doc: &DocumentInfo) -> String {
    match (doc.expires_on, doc.days_remaining) {
        (Some(date), Some(days)) => format!("{date} ({})", describe_days(days)),
        _ => "no expiration date".to_string(),
    }
}

pub fn print_dashboard(summary: &ComplianceSummary) {
    println!("{}", "Compliance Status".bold());
    println!("{}", "=".repeat(40));
    for line in &summary.lines {
        let when = match (line.expires_on, line.days_remaining) {
            (Some(date), Some(days)) => format!("{date}, {}", describe_days(days)),
            _ => "no date".to_string(),
        };
        println!(
            "  {:<34} {} ({})",
            line.title,
            status_badge(line.status),
            when.dimmed()
        );
    }
    println!("{}", "=".repeat(40));
    println!(
        "{} good, {} expiring soon, {} expired, {} unknown",
        summary.good.to_string().green(),
        summary.expiring_soon.to_string().yellow(),
        summary.expired.to_string().red(),
        summary.unknown
    );
    if summary.needs_attention() {
        println!("{}", "Some documents need attention.".yellow().bold());
    }
}

pub fn print_document_list(docs: &[DocumentInfo]) {
    if docs.is_empty() {
        println!("No documents found");
        return;
    }
    for doc in docs {
        let clip = if doc.attachment.is_some() { " [file]" } else { "" };
        let marker = if doc.allowlisted { "*" } else { " " };
        println!(
            "{} {:<14} {:<34} {}{}",
            marker,
            doc.id.cyan(),
            doc.title,
            status_badge(doc.status),
            clip.dimmed()
        );
    }
    println!("{}", "* = shown in inspection mode".dimmed());
}

pub fn print_document(doc: &DocumentInfo) {
    println!("{}", "=".repeat(40));
    println!("{}: {}", "Id".bold(), doc.id);
    println!("{}: {}", "Title".bold(), doc.title);
    println!("{}: {}", "Category".bold(), doc.category);
    if !doc.tags.is_empty() {
        println!("{}: {}", "Tags".bold(), doc.tags.join(", "));
    }
    println!("{}: {}", "Status".bold(), status_badge(doc.status));
    println!("{}: {}", "Expires".bold(), expiry_text(doc));
    println!(
        "{}: {}",
        "Inspection".bold(),
        if doc.allowlisted { "visible" } else { "hidden" }
    );
    match &doc.attachment {
        Some(a) => print_attachment_line(a),
        None => println!("{}: none", "Attachment".bold()),
    }
    println!("{}", "=".repeat(40));
}

fn print_attachment_line(a: &AttachmentInfo) {
    println!(
        "{}: {} ({}, {}, added {})",
        "Attachment".bold(),
        a.file_name,
        a.mime_type,
        format_bytes(a.size),
        a.attached_at.format("%Y-%m-%d %H:%M UTC")
    );
}

pub fn gate_label(state: GateState) -> ColoredString {
    match state {
        GateState::NoPinSet => "no PIN set".dimmed(),
        GateState::Locked => "locked".yellow(),
        GateState::Unlocked => "INSPECTION MODE".green().bold(),
    }
}

pub fn print_inspection(report: &InspectionReport) {
    match report.state {
        GateState::NoPinSet => {
            println!("Inspection mode is not set up. Set a PIN first.");
        }
        GateState::Locked => {
            println!("Inspection mode is {}. Enter the PIN to begin.", gate_label(report.state));
        }
        GateState::Unlocked => {
            println!("{}", gate_label(report.state));
            println!("{}", "=".repeat(40));
            if report.documents.is_empty() {
                println!("No documents are shared for inspection.");
            }
            for doc in &report.documents {
                println!("{}", doc.title.bold());
                println!("  {}: {}", "Status".bold(), status_badge(doc.status));
                println!("  {}: {}", "Expires".bold(), expiry_text(doc));
                if let Some(a) = &doc.attachment {
                    println!("  {}: {}", "File".bold(), a.file_name);
                }
            }
            println!("{}", "=".repeat(40));
        }
    }
}

pub fn print_location(fix: &LocationFix) {
    println!("{}: {:.6}", "Latitude".bold(), fix.latitude);
    println!("{}: {:.6}", "Longitude".bold(), fix.longitude);
    println!("{}: ±{:.0} m", "Accuracy".bold(), fix.accuracy_m);
}
