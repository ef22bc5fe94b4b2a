//! Terminal render target.

use std::fmt::Write as _;

use patchnotes_core::render::{Control, RenderTarget, View};

/// Keeps the most recent render and prints it once the page settles.
#[derive(Debug, Default)]
pub struct TerminalTarget {
    html: bool,
    view: Option<View>,
    stats: Option<String>,
    years: Vec<String>,
}

impl TerminalTarget {
    pub fn new(html: bool) -> Self {
        Self { html, ..Default::default() }
    }

    /// Text of the last render.
    pub fn output(&self) -> String {
        let Some(view) = &self.view else {
            return String::new();
        };
        if self.html {
            return format!("{}\n", view.to_html());
        }

        let mut out = String::new();
        if let Some(stats) = &self.stats {
            let _ = writeln!(out, "{stats}\n");
        }
        match view {
            View::Loading => out.push_str("Loading patches...\n"),
            View::Empty => out.push_str("No patches found\n"),
            View::Error { message, location, user_agent } => {
                let _ = writeln!(out, "Failed to load patch data: {message}");
                let _ = writeln!(out, "  page: {location}");
                let _ = writeln!(out, "  agent: {user_agent}");
                out.push_str("Run the command again to retry.\n");
            }
            View::List { items } => {
                for item in items {
                    let badge = if item.latest { "  [latest]" } else { "" };
                    let _ = writeln!(out, "{:<8} {:<20} {}{}", item.patch, item.date, item.link, badge);
                }
                if !self.years.is_empty() {
                    let _ = writeln!(out, "\nyears: {}", self.years.join(", "));
                }
            }
        }
        out
    }
}

impl RenderTarget for TerminalTarget {
    fn replace(&mut self, view: &View) {
        self.view = Some(view.clone());
    }

    fn has_control(&self, _control: Control) -> bool {
        true
    }

    fn set_year_options(&mut self, years: &[String]) {
        self.years = years.to_vec();
    }

    fn set_stats(&mut self, stats: Option<&str>) {
        self.stats = stats.map(str::to_string);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchnotes_core::render::ListItem;

    fn item(patch: &str, latest: bool) -> ListItem {
        ListItem {
            patch: patch.into(),
            link: format!("pages/balance/{patch}.html"),
            date: "August 21, 2025".into(),
            latest,
        }
    }

    #[test]
    fn test_list_output_marks_latest() {
        let mut target = TerminalTarget::new(false);
        target.replace(&View::List { items: vec![item("4758", true), item("4757", false)] });
        let out = target.output();
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].starts_with("4758") && lines[0].ends_with("[latest]"));
        assert!(!lines[1].contains("[latest]"));
    }

    #[test]
    fn test_only_last_view_printed() {
        let mut target = TerminalTarget::new(false);
        target.replace(&View::Loading);
        target.replace(&View::Empty);
        target.set_stats(Some("Showing 0 of 2 patches"));
        assert_eq!(target.output(), "Showing 0 of 2 patches\n\nNo patches found\n");
    }
}
