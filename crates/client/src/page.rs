//! Page driver: runs the reducer against a render target.

use patchnotes_core::page::{Effects, PageEvent, PageState};
use patchnotes_core::render::{self, Control, RenderTarget};

use crate::loader::PatchLoader;

/// One page instance with its loader and render target.
pub struct Page<R: RenderTarget> {
    state: PageState,
    target: R,
    loader: PatchLoader,
}

impl<R: RenderTarget> Page<R> {
    /// Build a page; the controls the target exposes decide which filters
    /// are available.
    pub fn new(loader: PatchLoader, target: R, location: &str, user_agent: &str) -> Self {
        let controls = [Control::SearchInput, Control::YearSelector, Control::ClearButton]
            .into_iter()
            .filter(|c| target.has_control(*c));
        let state = PageState::with_controls(location, user_agent, controls);
        Self { state, target, loader }
    }

    pub fn state(&self) -> &PageState {
        &self.state
    }

    pub fn target(&self) -> &R {
        &self.target
    }

    pub fn into_target(self) -> R {
        self.target
    }

    /// Render the loading panel, then load the manifest.
    pub async fn boot(&mut self) {
        self.render();
        let event = self.load_event().await;
        self.dispatch(event).await;
    }

    /// Reduce one event and carry out its effects.
    pub async fn dispatch(&mut self, event: PageEvent) {
        let mut next = Some(event);
        while let Some(event) = next.take() {
            let effects = self.state.update(event);
            self.apply(&effects);
            if effects.load {
                next = Some(self.load_event().await);
            }
        }
    }

    async fn load_event(&self) -> PageEvent {
        match self.loader.load().await {
            Ok(records) => PageEvent::Loaded(records),
            Err(e) => PageEvent::LoadFailed(e.to_string()),
        }
    }

    fn apply(&mut self, effects: &Effects) {
        if let Some(years) = &effects.year_options {
            self.target.set_year_options(years);
        }
        if effects.render {
            self.render();
        }
    }

    fn render(&mut self) {
        let view = render::view(&self.state);
        self.target.replace(&view);
        self.target.set_stats(render::stats_line(&self.state).as_deref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use bytes::Bytes;
    use patchnotes_core::http::{Network, Request, Response};
    use patchnotes_core::render::View;
    use patchnotes_core::Error;
    use url::Url;

    /// Answers from a queue of canned results.
    struct Scripted(Mutex<Vec<Result<Response, Error>>>);

    #[async_trait::async_trait]
    impl Network for Scripted {
        async fn fetch(&self, request: &Request) -> Result<Response, Error> {
            let mut queue = self.0.lock().unwrap();
            if queue.is_empty() {
                return Err(Error::Fetch(format!("no script for {}", request.url)));
            }
            queue.remove(0)
        }
    }

    #[derive(Default)]
    struct Recorder {
        views: Vec<View>,
        years: Vec<String>,
        stats: Option<String>,
        controls: Vec<Control>,
    }

    impl RenderTarget for Recorder {
        fn replace(&mut self, view: &View) {
            self.views.push(view.clone());
        }

        fn has_control(&self, control: Control) -> bool {
            self.controls.contains(&control)
        }

        fn set_year_options(&mut self, years: &[String]) {
            self.years = years.to_vec();
        }

        fn set_stats(&mut self, stats: Option<&str>) {
            self.stats = stats.map(str::to_string);
        }
    }

    const MANIFEST: &str = r#"{"balance":[
        {"patch":"4758","link":"pages/balance/4758.html","date":"August 21, 2025"},
        {"patch":"4757","link":"pages/balance/4757.html","date":"August 1, 2025"}
    ]}"#;

    fn url() -> Url {
        Url::parse("http://localhost:8080/assets/data/patches.json").unwrap()
    }

    fn page(script: Vec<Result<Response, Error>>, controls: Vec<Control>) -> Page<Recorder> {
        let loader = PatchLoader::new(Arc::new(Scripted(Mutex::new(script))), url());
        let target = Recorder { controls, ..Default::default() };
        Page::new(loader, target, "http://localhost:8080/", "test-agent")
    }

    fn manifest() -> Result<Response, Error> {
        Ok(Response::new(200, url(), Vec::new(), Bytes::from_static(MANIFEST.as_bytes())))
    }

    fn all_controls() -> Vec<Control> {
        vec![Control::SearchInput, Control::YearSelector, Control::ClearButton]
    }

    #[tokio::test]
    async fn test_boot_renders_loading_then_list() {
        let mut page = page(vec![manifest()], all_controls());
        page.boot().await;

        let target = page.target();
        assert_eq!(target.views[0], View::Loading);
        let View::List { items } = target.views.last().unwrap() else {
            panic!("expected list view");
        };
        assert_eq!(items.len(), 2);
        assert!(items[0].latest);
        assert!(!items[1].latest);
        assert_eq!(target.years, vec!["2025".to_string()]);
        assert_eq!(target.stats, None);
    }

    #[tokio::test]
    async fn test_failure_then_retry_recovers() {
        let failure = Ok(Response::new(503, url(), Vec::new(), Bytes::new()));
        let mut page = page(vec![failure, manifest()], all_controls());
        page.boot().await;
        assert!(matches!(page.target().views.last(), Some(View::Error { .. })));

        page.dispatch(PageEvent::Retry).await;
        let views = &page.target().views;
        assert_eq!(views[views.len() - 2], View::Loading);
        assert!(matches!(views.last(), Some(View::List { .. })));
    }

    #[tokio::test]
    async fn test_empty_state_rendered_once_per_change() {
        let mut page = page(vec![manifest()], all_controls());
        page.boot().await;

        page.dispatch(PageEvent::SearchInput("nothing-matches".into())).await;
        page.dispatch(PageEvent::SearchInput("nothing-matches-either".into())).await;

        let target = page.target();
        let empties = target.views.iter().filter(|v| **v == View::Empty).count();
        assert_eq!(empties, 2);
        assert_eq!(target.views.last(), Some(&View::Empty));
        assert!(target.stats.as_deref().unwrap().starts_with("Showing 0 of 2 patches"));
    }

    #[tokio::test]
    async fn test_missing_search_input_ignores_text() {
        let mut page = page(vec![manifest()], vec![Control::YearSelector]);
        page.boot().await;
        let rendered = page.target().views.len();

        page.dispatch(PageEvent::SearchInput("4757".into())).await;
        assert_eq!(page.target().views.len(), rendered);
        assert_eq!(page.state().search.filtered_patches().len(), 2);
    }
}
