//! Page state and its event reducer.
//!
//! Every user or loader event is dispatched into [`PageState::update`] on a
//! single task. The reducer only mutates state and reports what the driver
//! has to do next; rendering stays in [`crate::render`].

use std::collections::HashSet;

use crate::patch::PatchRecord;
use crate::render::Control;
use crate::search::SearchState;

/// Load phase of the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Loading,
    Ready,
    Failed { message: String },
}

/// Events the page reacts to.
#[derive(Debug, Clone)]
pub enum PageEvent {
    /// The manifest arrived.
    Loaded(Vec<PatchRecord>),
    /// Loading failed with a fetch or data-format error.
    LoadFailed(String),
    SearchInput(String),
    YearSelected(String),
    ClearFilters,
    /// The retry button of the error panel.
    Retry,
}

/// Follow-up work requested by the reducer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Effects {
    pub render: bool,
    pub load: bool,
    pub year_options: Option<Vec<String>>,
}

/// Everything the page knows between events.
#[derive(Debug, Clone)]
pub struct PageState {
    pub phase: Phase,
    pub search: SearchState,
    /// Page address shown in error details.
    pub location: String,
    pub user_agent: String,
    controls: HashSet<Control>,
}

impl PageState {
    /// A page with every optional control present.
    pub fn new(location: &str, user_agent: &str) -> Self {
        Self::with_controls(
            location,
            user_agent,
            [Control::SearchInput, Control::YearSelector, Control::ClearButton],
        )
    }

    pub fn with_controls(location: &str, user_agent: &str, controls: impl IntoIterator<Item = Control>) -> Self {
        Self {
            phase: Phase::Loading,
            search: SearchState::new(),
            location: location.to_string(),
            user_agent: user_agent.to_string(),
            controls: controls.into_iter().collect(),
        }
    }

    pub fn has_control(&self, control: Control) -> bool {
        self.controls.contains(&control)
    }

    /// Apply one event.
    pub fn update(&mut self, event: PageEvent) -> Effects {
        match event {
            PageEvent::Loaded(records) => {
                tracing::info!(count = records.len(), "loaded patches");
                self.search.set_patches(records);
                self.phase = Phase::Ready;
                let year_options = self.has_control(Control::YearSelector).then(|| self.search.years());
                Effects { render: true, load: false, year_options }
            }
            PageEvent::LoadFailed(message) => {
                tracing::error!(%message, "failed to load patches");
                self.phase = Phase::Failed { message };
                Effects { render: true, ..Default::default() }
            }
            PageEvent::SearchInput(term) if self.has_control(Control::SearchInput) => {
                self.search.search(&term);
                self.filtered()
            }
            PageEvent::YearSelected(year) if self.has_control(Control::YearSelector) => {
                self.search.filter_by_year(&year);
                self.filtered()
            }
            PageEvent::ClearFilters => {
                self.search.clear();
                self.filtered()
            }
            PageEvent::Retry => {
                if matches!(self.phase, Phase::Failed { .. }) {
                    self.phase = Phase::Loading;
                    Effects { render: true, load: true, year_options: None }
                } else {
                    Effects::default()
                }
            }
            PageEvent::SearchInput(_) | PageEvent::YearSelected(_) => {
                tracing::debug!("ignoring event for a missing control");
                Effects::default()
            }
        }
    }

    fn filtered(&self) -> Effects {
        Effects { render: self.phase == Phase::Ready, ..Default::default() }
    }
}
