//! Output formatting utilities for the CLI.
//!
//! Every command result implements [`CommandOutput`] and is printed either as
//! a human-readable block or as pretty JSON. Tables use comfy-table.

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use serde::Serialize;
use std::env;

use crate::domain::models::StepStatus;
use crate::services::UrgencyIndicator;

pub trait CommandOutput: Serialize {
    fn to_human(&self) -> String;

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&result.to_json()).unwrap_or_default());
    } else {
        println!("{}", result.to_human());
    }
}

/// Table with bold headers and dynamic column widths.
pub fn base_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers.iter().map(|h| Cell::new(h).add_attribute(Attribute::Bold)));
    table
}

pub fn status_cell(status: StepStatus) -> Cell {
    let cell = Cell::new(status.as_str());
    if supports_color() {
        cell.fg(status_color(status))
    } else {
        cell
    }
}

pub fn urgency_cell(urgency: UrgencyIndicator) -> Cell {
    let color = match urgency {
        UrgencyIndicator::Overdue => Color::Red,
        UrgencyIndicator::DueSoon => Color::Yellow,
        UrgencyIndicator::Upcoming => Color::Cyan,
        UrgencyIndicator::None => return Cell::new("-"),
    };
    let cell = Cell::new(urgency.as_str());
    if supports_color() {
        cell.fg(color)
    } else {
        cell
    }
}

/// Check if color output is supported
fn supports_color() -> bool {
    if env::var("NO_COLOR").is_ok() {
        return false;
    }
    !matches!(env::var("TERM").as_deref(), Ok("dumb"))
}

fn status_color(status: StepStatus) -> Color {
    match status {
        StepStatus::Complete => Color::Green,
        StepStatus::InProgress => Color::Cyan,
        StepStatus::Ready => Color::Yellow,
        StepStatus::AwaitingEvidence => Color::Magenta,
        StepStatus::Blocked | StepStatus::Overdue => Color::Red,
        StepStatus::Skipped => Color::DarkGrey,
        StepStatus::NotStarted => Color::White,
    }
}

/// Truncate a string to a maximum number of characters, appending "..." if
/// truncated.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// First eight characters of an id, like a short git hash.
pub fn short_id(id: &uuid::Uuid) -> String {
    id.to_string()[..8].to_string()
}

pub fn or_dash<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}
