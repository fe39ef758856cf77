//! Diagnostic reports: a severity, a `$`-formatted primary message with a
//! source location, and a chain of notes.

use serde::{Deserialize, Serialize};

use crate::source::{SourceLocation, SourceManager};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub message: String,
    pub location: Option<SourceLocation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub severity: Severity,
    pub message: String,
    pub location: Option<SourceLocation>,
    pub notes: Vec<Note>,
}

impl Report {
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Render with the offending line and an underline:
    ///
    /// ```text
    /// error: resource used after move
    ///    3 | use(p.a);
    ///      |     ^^^
    ///    note: previously moved here
    /// ```
    pub fn render(&self, sources: &SourceManager) -> String {
        let label = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };

        let mut out = format!("{}: {}", label, self.message);

        if let Some(location) = self.location {
            out.push('\n');
            out.push_str(&render_snippet(sources, location));
        }

        for note in &self.notes {
            out.push_str(&format!("\n   note: {}", note.message));
            if let Some(location) = note.location {
                out.push('\n');
                out.push_str(&render_snippet(sources, location));
            }
        }

        out
    }
}

fn render_snippet(sources: &SourceManager, location: SourceLocation) -> String {
    let (line_num, line_start, line) = sources.line_at(location.file, location.range.start);
    let col = (location.range.start as usize).saturating_sub(line_start);
    let len = (location.range.len() as usize).max(1);
    let underline = format!("{}{}", " ".repeat(col), "^".repeat(len));

    format!("{:4} | {}\n     | {}", line_num, line, underline)
}

/// Substitute each `$` in `format` with the next argument, left to right.
/// Surplus placeholders are kept verbatim so a malformed call site stays
/// visible in the output.
pub fn format_message(format: &str, args: &[String]) -> String {
    let mut out = String::with_capacity(format.len());
    let mut next_arg = 0;

    for c in format.chars() {
        if c == '$' && next_arg < args.len() {
            out.push_str(&args[next_arg]);
            next_arg += 1;
        } else {
            out.push(c);
        }
    }

    out
}
