//! Terminal output for the worker commands

use std::fmt::Write as _;

use console::style;

/// Kind of a one-line status message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Idle,
    Failed,
}

/// Print a status line; failures go to stderr
pub fn status(kind: Status, message: &str) {
    match kind {
        Status::Ok => println!("{} {}", style("ok").green().bold(), message),
        Status::Idle => println!("{} {}", style("--").dim(), message),
        Status::Failed => eprintln!("{} {}", style("error").red().bold(), message),
    }
}

/// A titled block of aligned key/value rows
#[derive(Debug, Default)]
pub struct Section {
    title: String,
    rows: Vec<(String, String)>,
}

impl Section {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            rows: Vec::new(),
        }
    }

    pub fn row(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.rows.push((key.into(), value.to_string()));
        self
    }

    /// Render with keys padded to the widest one
    pub fn render(&self) -> String {
        let width = self.rows.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
        let mut out = format!("{}\n", style(&self.title).bold());
        for (key, value) in &self.rows {
            let _ = writeln!(out, "  {}  {}", style(format!("{:<width$}", key)).dim(), value);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_aligns_keys() {
        console::set_colors_enabled(false);
        let rendered = Section::new("Configuration")
            .row("file", "/etc/tileseed.yaml")
            .row("job manager", "http://jobs")
            .render();

        assert_eq!(
            rendered,
            "Configuration\n  file         /etc/tileseed.yaml\n  job manager  http://jobs\n"
        );
    }
}
