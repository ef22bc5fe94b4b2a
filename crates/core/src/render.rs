//! Pure render step for the patch list.
//!
//! `view` turns page state into a [`View`]; `View::to_html` produces the
//! markup a render target swaps into the list container wholesale.

use serde::Serialize;

use crate::page::{PageState, Phase};

/// Selector of the list container.
pub const LIST_CONTAINER: &str = ".BalanceJSONList";

/// Optional controls living next to the list container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    /// `#patch-search` text input.
    SearchInput,
    /// `#year-filter` select.
    YearSelector,
    /// `#clear-search` button.
    ClearButton,
}

impl Control {
    pub fn id(&self) -> &'static str {
        match self {
            Control::SearchInput => "patch-search",
            Control::YearSelector => "year-filter",
            Control::ClearButton => "clear-search",
        }
    }
}

/// One rendered list entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListItem {
    pub patch: String,
    pub link: String,
    pub date: String,
    pub latest: bool,
}

/// What the list container currently shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum View {
    Loading,
    Error { message: String, location: String, user_agent: String },
    Empty,
    List { items: Vec<ListItem> },
}

/// Collaborator that owns the list container and its sibling controls.
pub trait RenderTarget {
    /// Replace the container's children with `view`.
    fn replace(&mut self, view: &View);

    /// Whether an optional control is present. Absent controls disable
    /// their filter dimension.
    fn has_control(&self, control: Control) -> bool;

    /// Refill the year selector; the "All years" option is implied.
    fn set_year_options(&mut self, _years: &[String]) {}

    /// Show or remove the stats line above the list.
    fn set_stats(&mut self, _stats: Option<&str>) {}
}

/// Compute the view for the current state.
pub fn view(state: &PageState) -> View {
    match &state.phase {
        Phase::Loading => View::Loading,
        Phase::Failed { message } => View::Error {
            message: message.clone(),
            location: state.location.clone(),
            user_agent: state.user_agent.clone(),
        },
        Phase::Ready => {
            let search = &state.search;
            let filtered = search.filtered_patches();
            if filtered.is_empty() {
                return View::Empty;
            }
            let latest = search.latest().map(|r| r.patch.as_str());
            let items = filtered
                .iter()
                .map(|r| ListItem {
                    patch: r.patch.clone(),
                    link: r.link.clone(),
                    date: r.date.clone(),
                    latest: Some(r.patch.as_str()) == latest,
                })
                .collect();
            View::List { items }
        }
    }
}

/// "Showing N of M patches" while a filter is active or hides records.
pub fn stats_line(state: &PageState) -> Option<String> {
    if state.phase != Phase::Ready {
        return None;
    }
    let search = &state.search;
    let total = search.all_patches().len();
    let shown = search.filtered_patches().len();
    if !search.is_filtering() && shown == total {
        return None;
    }
    let mut line = format!("Showing {shown} of {total} patches");
    if shown == 0 {
        line.push_str("\nTry adjusting your search or filter criteria");
    }
    Some(line)
}

impl View {
    pub fn to_html(&self) -> String {
        match self {
            View::Loading => concat!(
                r#"<div class="LoadingState"><div class="LoadingSkeleton">"#,
                r#"<div class="SkeletonItem"></div><div class="SkeletonItem"></div><div class="SkeletonItem"></div>"#,
                r#"<div class="SkeletonItem"></div><div class="SkeletonItem"></div>"#,
                "</div><p>Loading patch archives...</p></div>"
            )
            .to_string(),
            View::Error { message, location, user_agent } => format!(
                concat!(
                    r#"<div class="error-state"><p>Failed to load patches</p>"#,
                    r#"<div class="error-details"><p><strong>Error:</strong> {}</p>"#,
                    r#"<p><strong>URL:</strong> {}</p></div>"#,
                    r#"<button data-action="retry" class="retry-btn">Try Again</button>"#,
                    "<details><summary>Technical Details</summary><pre>{}</pre></details></div>"
                ),
                escape(message),
                escape(location),
                escape(user_agent)
            ),
            View::Empty => concat!(
                r#"<div class="NoResults"><h3>No patches found</h3>"#,
                "<p>Try adjusting your search or filter criteria.</p>",
                r#"<button data-action="clear-filters" class="SecondaryButton">Clear All Filters</button></div>"#
            )
            .to_string(),
            View::List { items } => items.iter().map(ListItem::to_html).collect(),
        }
    }
}

impl ListItem {
    fn to_html(&self) -> String {
        let class = if self.latest { "patch-item latest" } else { "patch-item" };
        let badge = if self.latest { r#"<span class="latest-badge">Latest</span>"# } else { "" };
        format!(
            concat!(
                r#"<li class="{class}"><a class="patch-link" href="{link}" aria-label="View patch {patch} details">"#,
                r#"<div class="patch-info"><div class="patch-header"><span class="patch-number">{patch}</span>{badge}</div>"#,
                r#"<span class="patch-date">{date}</span></div></a></li>"#
            ),
            class = class,
            link = escape(&self.link),
            patch = escape(&self.patch),
            badge = badge,
            date = escape(&self.date),
        )
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::Manifest;

    fn ready_state(body: &str) -> PageState {
        let mut state = PageState::new("http://localhost/", "test-agent");
        let manifest = Manifest::parse(body.as_bytes()).unwrap();
        state.search.set_patches(manifest.balance);
        state.phase = Phase::Ready;
        state
    }

    const TWO: &str = r#"{"balance":[
        {"patch":"4758","link":"pages/balance/4758.html","date":"August 21, 2025"},
        {"patch":"4757","link":"pages/balance/4757.html","date":"August 1, 2025"}
    ]}"#;

    #[test]
    fn test_two_items_only_first_latest() {
        let state = ready_state(TWO);
        let View::List { items } = view(&state) else { panic!("expected list") };
        assert_eq!(items.len(), 2);
        assert!(items[0].latest);
        assert!(!items[1].latest);

        let html = view(&state).to_html();
        assert_eq!(html.matches("<li ").count(), 2);
        assert_eq!(html.matches("latest-badge").count(), 1);
    }

    #[test]
    fn test_latest_hidden_when_head_filtered_out() {
        let mut state = ready_state(TWO);
        state.search.search("4757");
        let View::List { items } = view(&state) else { panic!("expected list") };
        assert_eq!(items.len(), 1);
        assert!(!items[0].latest);
    }

    #[test]
    fn test_empty_view() {
        let mut state = ready_state(TWO);
        state.search.filter_by_year("1999");
        assert_eq!(view(&state), View::Empty);
        assert_eq!(view(&state).to_html().matches("NoResults").count(), 1);
    }

    #[test]
    fn test_error_view_escapes() {
        let mut state = PageState::new("http://localhost/?q=<x>", "agent");
        state.phase = Phase::Failed { message: "FETCH_ERROR: status 500".into() };
        let html = view(&state).to_html();
        assert!(html.contains("FETCH_ERROR: status 500"));
        assert!(html.contains("?q=&lt;x&gt;"));
        assert!(html.contains(r#"data-action="retry""#));
    }

    #[test]
    fn test_stats_line() {
        let mut state = ready_state(TWO);
        assert_eq!(stats_line(&state), None);

        state.search.search("4758");
        assert_eq!(stats_line(&state).as_deref(), Some("Showing 1 of 2 patches"));

        state.search.search("nothing");
        assert!(stats_line(&state).unwrap().contains("Try adjusting"));
    }

    #[test]
    fn test_loading_view() {
        let state = PageState::new("http://localhost/", "agent");
        assert_eq!(view(&state), View::Loading);
        assert!(view(&state).to_html().contains("Loading patch archives"));
    }
}
