//! Output formatting helpers for the `desk` CLI.
//!
//! JSON output, simple aligned tables, and human-readable ticket display in
//! compact (one-liner) and detailed (multi-line) forms.

use std::io::{self, Write};

use chrono::{DateTime, Utc};
use serde::Serialize;

use desk_core::analytics::AnalyticsSnapshot;
use desk_core::duration::format_duration;
use desk_core::sla::SlaPolicy;
use desk_core::staff::StaffMember;
use desk_core::ticket::Ticket;

/// Print a value as pretty-printed JSON to stdout.
///
/// Terminates the process with exit code 1 if serialization fails.
pub fn output_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            // Ignore broken pipe errors (e.g., piped to `head`)
            let _ = writeln!(handle, "{}", json);
        }
        Err(e) => {
            eprintln!("Error: failed to serialize JSON: {}", e);
            std::process::exit(1);
        }
    }
}

/// Print a simple table with headers and rows.
///
/// Column widths are computed from the data for alignment.
pub fn output_table(headers: &[&str], rows: &[Vec<String>]) {
    if rows.is_empty() {
        return;
    }

    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.len());
            }
        }
    }

    let stdout = io::stdout();
    let mut handle = stdout.lock();

    write_row(&mut handle, &widths, headers.iter().copied());
    let rules: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    write_row(&mut handle, &widths, rules.iter().map(String::as_str));
    for row in rows {
        write_row(&mut handle, &widths, row.iter().map(String::as_str));
    }
}

fn write_row<'a>(handle: &mut impl Write, widths: &[usize], cells: impl Iterator<Item = &'a str>) {
    for (i, cell) in cells.enumerate() {
        if i > 0 {
            let _ = write!(handle, "  ");
        }
        match widths.get(i) {
            Some(width) => {
                let _ = write!(handle, "{:<width$}", cell, width = *width);
            }
            None => {
                let _ = write!(handle, "{}", cell);
            }
        }
    }
    let _ = writeln!(handle);
}

/// `2026-03-10 14:05` or `-`.
pub fn format_time(at: Option<DateTime<Utc>>) -> String {
    at.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn format_hours(hours: Option<f64>) -> String {
    hours
        .map(|h| format!("{:.1}h", h))
        .unwrap_or_else(|| "-".to_string())
}

/// Format a ticket as a compact one-line string.
///
/// Format: `{id} [{priority}] [{category}] {title} ({status}) @{assignee}`
pub fn format_ticket_compact(ticket: &Ticket) -> String {
    let assignee_part = match &ticket.assigned_to {
        Some(staff) => format!(" @{}", staff),
        None => String::new(),
    };
    let escalated_part = if ticket.is_escalated {
        format!(" !L{}", ticket.escalation_level)
    } else {
        String::new()
    };

    format!(
        "{} [{}] [{}] {} ({}){}{}",
        ticket.id,
        ticket.priority,
        ticket.category,
        ticket.title,
        ticket.status,
        assignee_part,
        escalated_part
    )
}

/// Print a ticket in the detailed multi-line form.
pub fn print_ticket_detail(ticket: &Ticket) {
    println!("{}: {}", ticket.id, ticket.title);
    println!("  Tenant:      {}", ticket.tenant_id);
    println!("  Status:      {}", ticket.status);
    println!("  Priority:    {}", ticket.priority);
    println!("  Category:    {}", ticket.category);
    println!(
        "  Assigned to: {}",
        ticket.assigned_to.as_deref().unwrap_or("-")
    );
    println!("  Created by:  {}", ticket.created_by);
    println!("  Created:     {}", format_time(Some(ticket.created_at)));
    println!("  Updated:     {}", format_time(Some(ticket.updated_at)));
    println!("  First reply: {}", format_time(ticket.first_response_time));
    println!("  Reply due:   {}", format_time(ticket.first_response_due_at));
    println!("  Resolve by:  {}", format_time(ticket.estimated_resolution_time));
    if ticket.resolved_at.is_some() {
        println!("  Resolved:    {}", format_time(ticket.resolved_at));
    }
    if ticket.actual_resolution_time.is_some() {
        println!("  Finalized:   {}", format_time(ticket.actual_resolution_time));
    }
    if ticket.escalation_level > 0 {
        println!(
            "  Escalation:  level {} ({})",
            ticket.escalation_level, ticket.escalation_reason
        );
    }
    if let Some(rating) = ticket.satisfaction_rating {
        println!("  Rating:      {}/5", rating);
    }
    if !ticket.tags.is_empty() {
        println!("  Tags:        {}", ticket.tags.join(", "));
    }
    if !ticket.description.is_empty() {
        println!();
        for line in ticket.description.lines() {
            println!("  {}", line);
        }
    }
    if !ticket.resolution_notes.is_empty() {
        println!();
        println!("  Resolution: {}", ticket.resolution_notes);
    }
    if !ticket.cancel_reason.is_empty() {
        println!();
        println!("  Cancelled: {}", ticket.cancel_reason);
    }
}

pub fn staff_rows(staff: &[StaffMember]) -> Vec<Vec<String>> {
    staff
        .iter()
        .map(|s| {
            vec![
                s.id.clone(),
                s.specialization.to_string(),
                s.level.to_string(),
                format!("{}/{}", s.current_ticket_count, s.max_concurrent_tickets),
                format!("{:.0}%", s.workload_percentage()),
                if s.is_available { "yes" } else { "no" }.to_string(),
                s.total_resolved.to_string(),
            ]
        })
        .collect()
}

pub const STAFF_HEADERS: &[&str] = &["ID", "SPEC", "LEVEL", "LOAD", "WORKLOAD", "AVAILABLE", "RESOLVED"];

pub fn policy_rows(policies: &[SlaPolicy]) -> Vec<Vec<String>> {
    policies
        .iter()
        .map(|p| {
            vec![
                p.priority.to_string(),
                p.category
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "*".to_string()),
                format_duration(p.first_response_target),
                format_duration(p.resolution_target),
                p.escalation_level.to_string(),
                if p.is_active { "yes" } else { "no" }.to_string(),
            ]
        })
        .collect()
}

pub const POLICY_HEADERS: &[&str] = &["PRIORITY", "CATEGORY", "FIRST RESPONSE", "RESOLUTION", "LEVEL", "ACTIVE"];

pub fn snapshot_rows(snapshots: &[AnalyticsSnapshot]) -> Vec<Vec<String>> {
    snapshots
        .iter()
        .map(|s| {
            vec![
                s.date.to_string(),
                s.total_tickets.to_string(),
                s.open_tickets.to_string(),
                s.resolved_tickets.to_string(),
                s.closed_tickets.to_string(),
                s.escalated_tickets.to_string(),
                format_hours(s.avg_response_time),
                format_hours(s.avg_resolution_time),
                s.satisfaction_avg
                    .map(|v| format!("{:.2}", v))
                    .unwrap_or_else(|| "-".to_string()),
                format!("{:.0}%", s.escalation_rate * 100.0),
            ]
        })
        .collect()
}

pub const SNAPSHOT_HEADERS: &[&str] = &[
    "DATE", "TOTAL", "OPEN", "RESOLVED", "CLOSED", "ESCALATED", "AVG REPLY", "AVG RESOLVE",
    "CSAT", "ESC RATE",
];

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use desk_core::enums::{Category, Priority};
    use desk_core::ticket::TicketDraft;

    #[test]
    fn compact_line() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap();
        let mut t = TicketDraft::new("t1", "Analyzer offline", "alice")
            .priority(Priority::High)
            .category(Category::Equipment)
            .into_ticket("tk-abc123", now);
        assert_eq!(
            format_ticket_compact(&t),
            "tk-abc123 [high] [equipment] Analyzer offline (open)"
        );

        t.assigned_to = Some("s1".into());
        t.is_escalated = true;
        t.escalation_level = 2;
        assert!(format_ticket_compact(&t).ends_with("(open) @s1 !L2"));
    }

    #[test]
    fn time_formatting() {
        assert_eq!(format_time(None), "-");
        let at = Utc.with_ymd_and_hms(2026, 3, 10, 14, 5, 0).unwrap();
        assert_eq!(format_time(Some(at)), "2026-03-10 14:05");
    }
}
