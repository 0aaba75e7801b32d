//! Output formatting module
//!
//! This module renders validation and replay results as JSON or text tables.

use crate::Result;
use crate::behavior::Severity;
use crate::event::{EventDescription, EventId};
use crate::state_machine::{ActionId, LoadReport, PatternReport};
use serde::Serialize;

/// Everything `validate` reports about one behavior file
#[derive(Debug, Serialize)]
pub struct ValidationOutput {
    pub load: LoadReport,
    pub events: Vec<EventDescription>,
    pub patterns: Vec<PatternReport>,
}

/// One replayed event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayStep {
    pub event_id: EventId,
    pub from: String,
    pub to: String,
    pub handled: bool,
    pub actions: Vec<ActionId>,
}

/// Result of a replay run
#[derive(Debug, Serialize)]
pub struct ReplayOutput {
    pub pattern: String,
    pub steps: Vec<ReplayStep>,
    pub final_state: String,
    pub undo_history: Vec<String>,
}

pub fn output_json(w: &mut impl std::io::Write, value: &impl Serialize) -> Result<()> {
    serde_json::to_writer_pretty(&mut *w, value)?;
    writeln!(w)?; // Add trailing newline
    Ok(())
}

/// Output a validation result as text table
pub fn output_validation_table(w: &mut impl std::io::Write, result: &ValidationOutput) -> Result<()> {
    writeln!(w, "Behavior Validation - {}", result.load.source_name)?;
    writeln!(w, "{}", "=".repeat(80))?;
    writeln!(w)?;

    writeln!(w, "Summary:")?;
    writeln!(w, "  Registered patterns: {}", result.load.registered.len())?;
    writeln!(w, "  Rejected patterns:   {}", result.load.rejected.len())?;
    writeln!(w, "  Event descriptions:  {}", result.events.len())?;
    writeln!(w)?;

    if !result.patterns.is_empty() {
        writeln!(w, "Patterns:")?;
        writeln!(w, "{:-<80}", "")?;
        writeln!(
            w,
            "{:<24} {:<16} {:>7} {:>7} {:>6} {:<12}",
            "Name", "Start", "States", "Trans.", "Depth", "Shape"
        )?;
        writeln!(w, "{:-<80}", "")?;
        for pattern in &result.patterns {
            writeln!(
                w,
                "{:<24} {:<16} {:>7} {:>7} {:>6} {:<12}",
                shorten(&pattern.name, 24),
                shorten(&pattern.start_state, 16),
                pattern.state_count,
                pattern.transition_count,
                pattern.max_depth,
                pattern.shape.display_name()
            )?;
            if !pattern.unreachable.is_empty() {
                writeln!(w, "    unreachable: {}", pattern.unreachable.join(", "))?;
            }
        }
        writeln!(w)?;
    }

    if !result.events.is_empty() {
        writeln!(w, "Events:")?;
        writeln!(w, "{:-<80}", "")?;
        writeln!(
            w,
            "{:<30} {:>6} {:>6} {:>8} {:>8} {:>8}",
            "Name", "Id", "Type", "Button", "State", "Key"
        )?;
        writeln!(w, "{:-<80}", "")?;
        for event in &result.events {
            writeln!(
                w,
                "{:<30} {:>6} {:>6} {:>#8x} {:>#8x} {:>#8x}",
                shorten(&event.name, 30),
                event.id,
                event.event_type,
                event.button,
                event.button_state,
                event.key
            )?;
        }
        writeln!(w)?;
    }

    if !result.load.diagnostics.is_empty() {
        writeln!(w, "Diagnostics:")?;
        for diagnostic in &result.load.diagnostics {
            let marker = match diagnostic.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
            };
            writeln!(w, "  {:<8} [{}] {}", marker, diagnostic.scope, diagnostic.message)?;
        }
        writeln!(w)?;
    }

    Ok(())
}

/// Output a replay result as text table
pub fn output_replay_table(w: &mut impl std::io::Write, result: &ReplayOutput) -> Result<()> {
    writeln!(w, "Replay of pattern '{}'", result.pattern)?;
    writeln!(w, "{:-<80}", "")?;
    writeln!(
        w,
        "{:>6} {:<20} {:<20} {:<8} {:<20}",
        "Event", "From", "To", "Handled", "Actions"
    )?;
    writeln!(w, "{:-<80}", "")?;
    for step in &result.steps {
        let actions: Vec<String> = step.actions.iter().map(|a| a.to_string()).collect();
        writeln!(
            w,
            "{:>6} {:<20} {:<20} {:<8} {:<20}",
            step.event_id,
            shorten(&step.from, 20),
            shorten(&step.to, 20),
            if step.handled { "yes" } else { "no" },
            actions.join(",")
        )?;
    }
    writeln!(w)?;
    writeln!(w, "Final state: {}", result.final_state)?;

    if !result.undo_history.is_empty() {
        writeln!(w)?;
        writeln!(w, "Undo history (newest first):")?;
        for entry in &result.undo_history {
            writeln!(w, "  {}", entry)?;
        }
    }
    Ok(())
}

fn shorten(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        let kept: String = text.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        text.to_string()
    }
}
