//! Scripted in-memory [`BrowserSession`] for tests.
//!
//! Pages are registered by URL, elements by `(url, selector)`. Clicking or
//! pressing Enter on an element can navigate or reveal more elements, which
//! is enough to drive search, pagination and establishment visits without a
//! browser.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{BrowserSession, ClickStrategy, ElementHandle, Locator, TabId};
use crate::error::BrowserError;

#[derive(Debug, Clone, Default)]
pub struct FakePage {
    pub title: String,
    pub html: String,
    pub text: String,
    pub height: i64,
}

impl FakePage {
    #[must_use]
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            height: 1000,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn html(mut self, html: &str) -> Self {
        self.html = html.to_string();
        self
    }

    #[must_use]
    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }
}

#[derive(Debug, Clone)]
pub enum ClickEffect {
    /// The active tab navigates to this URL.
    Navigate(String),
    /// More elements appear under `selector` on the current page.
    Reveal {
        selector: String,
        elements: Vec<FakeElement>,
    },
}

#[derive(Debug, Clone, Default)]
pub struct FakeElement {
    text: String,
    html: String,
    attributes: HashMap<String, String>,
    hidden: bool,
    blocked: Vec<ClickStrategy>,
    on_click: Option<ClickEffect>,
    on_enter: Option<ClickEffect>,
    hide_after_click: bool,
}

impl FakeElement {
    #[must_use]
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    #[must_use]
    pub fn html(mut self, html: &str) -> Self {
        self.html = html.to_string();
        self
    }

    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Clicks with these strategies fail as if intercepted by an overlay.
    #[must_use]
    pub fn blocked(mut self, strategies: &[ClickStrategy]) -> Self {
        self.blocked = strategies.to_vec();
        self
    }

    #[must_use]
    pub fn on_click(mut self, effect: ClickEffect) -> Self {
        self.on_click = Some(effect);
        self
    }

    #[must_use]
    pub fn on_enter(mut self, effect: ClickEffect) -> Self {
        self.on_enter = Some(effect);
        self
    }

    /// The element disappears after its first successful click.
    #[must_use]
    pub fn once(mut self) -> Self {
        self.hide_after_click = true;
        self
    }
}

#[derive(Debug, Clone, Copy)]
struct HandleRef {
    tab: TabId,
    index: usize,
}

#[derive(Debug, Default)]
struct FakeState {
    pages: HashMap<String, FakePage>,
    elements: HashMap<(String, String), Vec<FakeElement>>,
    tabs: Vec<(TabId, String)>,
    active: TabId,
    handles: HashMap<u64, (HandleRef, String, String)>,
    next_handle: u64,
    next_tab: u64,
    visits: Vec<String>,
    typed: Vec<String>,
    clicks: Vec<(String, ClickStrategy)>,
    enter_presses: usize,
    scripts: Vec<String>,
    closed: bool,
}

impl FakeState {
    fn active_url(&self) -> String {
        self.tabs
            .iter()
            .find(|(id, _)| *id == self.active)
            .map(|(_, url)| url.clone())
            .unwrap_or_default()
    }

    fn active_page(&self) -> FakePage {
        self.pages
            .get(&self.active_url())
            .cloned()
            .unwrap_or_default()
    }

    fn go(&mut self, url: &str) -> Result<(), BrowserError> {
        if !self.pages.contains_key(url) {
            return Err(BrowserError::Navigation {
                url: url.to_string(),
                reason: "net::ERR_NAME_NOT_RESOLVED".to_string(),
            });
        }
        let active = self.active;
        self.handles.retain(|_, (h, _, _)| h.tab != active);
        if let Some((_, current)) = self.tabs.iter_mut().find(|(id, _)| *id == active) {
            *current = url.to_string();
        }
        self.visits.push(url.to_string());
        Ok(())
    }

    fn resolve(&self, handle: ElementHandle) -> Result<(String, String, usize), BrowserError> {
        match self.handles.get(&handle.0) {
            Some((h, url, selector)) if h.tab == self.active => {
                Ok((url.clone(), selector.clone(), h.index))
            }
            _ => Err(BrowserError::StaleElement(handle.0)),
        }
    }

    fn element(&self, handle: ElementHandle) -> Result<FakeElement, BrowserError> {
        let (url, selector, index) = self.resolve(handle)?;
        self.elements
            .get(&(url, selector))
            .and_then(|list| list.get(index))
            .cloned()
            .ok_or(BrowserError::StaleElement(handle.0))
    }

    fn element_mut(&mut self, handle: ElementHandle) -> Option<&mut FakeElement> {
        let (url, selector, index) = self.resolve(handle).ok()?;
        self.elements
            .get_mut(&(url, selector))
            .and_then(|list| list.get_mut(index))
    }

    fn apply(&mut self, effect: ClickEffect) -> Result<(), BrowserError> {
        match effect {
            ClickEffect::Navigate(url) => self.go(&url),
            ClickEffect::Reveal { selector, elements } => {
                let url = self.active_url();
                self.elements
                    .entry((url, selector))
                    .or_default()
                    .extend(elements);
                Ok(())
            }
        }
    }
}

#[derive(Debug)]
pub struct FakeSession {
    state: Mutex<FakeState>,
}

impl Default for FakeSession {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeSession {
    #[must_use]
    pub fn new() -> Self {
        let state = FakeState {
            tabs: vec![(TabId(0), "about:blank".to_string())],
            next_tab: 1,
            next_handle: 1,
            ..FakeState::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    #[must_use]
    pub fn with_page(self, url: &str, page: FakePage) -> Self {
        self.lock().pages.insert(url.to_string(), page);
        self
    }

    #[must_use]
    pub fn with_elements(self, url: &str, selector: &str, elements: Vec<FakeElement>) -> Self {
        self.lock()
            .elements
            .entry((url.to_string(), selector.to_string()))
            .or_default()
            .extend(elements);
        self
    }

    /// Every URL loaded, through navigation or new tabs, in order.
    #[must_use]
    pub fn visits(&self) -> Vec<String> {
        self.lock().visits.clone()
    }

    #[must_use]
    pub fn typed(&self) -> Vec<String> {
        self.lock().typed.clone()
    }

    #[must_use]
    pub fn clicks(&self) -> Vec<(String, ClickStrategy)> {
        self.lock().clicks.clone()
    }

    #[must_use]
    pub fn enter_presses(&self) -> usize {
        self.lock().enter_presses
    }

    #[must_use]
    pub fn open_tabs(&self) -> usize {
        self.lock().tabs.len()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        self.lock().go(url)
    }

    async fn wait_until_ready(&self, _timeout: Duration) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        Ok(self.lock().active_url())
    }

    async fn title(&self) -> Result<String, BrowserError> {
        Ok(self.lock().active_page().title)
    }

    async fn page_source(&self) -> Result<String, BrowserError> {
        Ok(self.lock().active_page().html)
    }

    async fn visible_text(&self) -> Result<String, BrowserError> {
        Ok(self.lock().active_page().text)
    }

    async fn find_all(&self, locator: &Locator) -> Result<Vec<ElementHandle>, BrowserError> {
        let mut state = self.lock();
        let url = state.active_url();
        let key = (url.clone(), locator.as_str().to_string());
        let count = state.elements.get(&key).map_or(0, Vec::len);
        let tab = state.active;
        let mut handles = Vec::with_capacity(count);
        for index in 0..count {
            let id = state.next_handle;
            state.next_handle += 1;
            state.handles.insert(
                id,
                (HandleRef { tab, index }, url.clone(), key.1.clone()),
            );
            handles.push(ElementHandle(id));
        }
        Ok(handles)
    }

    async fn text(&self, element: ElementHandle) -> Result<String, BrowserError> {
        Ok(self.lock().element(element)?.text)
    }

    async fn inner_html(&self, element: ElementHandle) -> Result<String, BrowserError> {
        let el = self.lock().element(element)?;
        Ok(if el.html.is_empty() { el.text } else { el.html })
    }

    async fn attribute(
        &self,
        element: ElementHandle,
        name: &str,
    ) -> Result<Option<String>, BrowserError> {
        Ok(self.lock().element(element)?.attributes.get(name).cloned())
    }

    async fn is_displayed(&self, element: ElementHandle) -> Result<bool, BrowserError> {
        Ok(!self.lock().element(element)?.hidden)
    }

    async fn click(
        &self,
        element: ElementHandle,
        strategy: ClickStrategy,
    ) -> Result<(), BrowserError> {
        let mut state = self.lock();
        let el = state.element(element)?;
        if el.hidden {
            return Err(BrowserError::NotInteractable {
                reason: "element is not displayed".to_string(),
            });
        }
        if el.blocked.contains(&strategy) {
            return Err(BrowserError::NotInteractable {
                reason: "click intercepted by overlay".to_string(),
            });
        }
        let (_, selector, _) = state.resolve(element)?;
        state.clicks.push((selector, strategy));
        if el.hide_after_click {
            if let Some(target) = state.element_mut(element) {
                target.hidden = true;
            }
        }
        match el.on_click {
            Some(effect) => state.apply(effect),
            None => Ok(()),
        }
    }

    async fn fill(&self, element: ElementHandle, text: &str) -> Result<(), BrowserError> {
        let mut state = self.lock();
        state.element(element)?;
        state.typed.push(text.to_string());
        Ok(())
    }

    async fn press_enter(&self, element: ElementHandle) -> Result<(), BrowserError> {
        let mut state = self.lock();
        let el = state.element(element)?;
        state.enter_presses += 1;
        match el.on_enter {
            Some(effect) => state.apply(effect),
            None => Ok(()),
        }
    }

    async fn scroll_by(&self, _pixels: i64) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn scroll_to_bottom(&self) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn scroll_to_top(&self) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn scroll_into_view(&self, element: ElementHandle) -> Result<(), BrowserError> {
        self.lock().element(element).map(|_| ())
    }

    async fn page_height(&self) -> Result<i64, BrowserError> {
        Ok(self.lock().active_page().height)
    }

    async fn execute(&self, script: &str) -> Result<serde_json::Value, BrowserError> {
        self.lock().scripts.push(script.to_string());
        Ok(serde_json::Value::Null)
    }

    async fn open_tab(&self, url: &str) -> Result<TabId, BrowserError> {
        let mut state = self.lock();
        let tab = TabId(state.next_tab);
        state.next_tab += 1;
        let previous = state.active;
        state.tabs.push((tab, "about:blank".to_string()));
        state.active = tab;
        if let Err(err) = state.go(url) {
            state.tabs.retain(|(id, _)| *id != tab);
            state.active = previous;
            return Err(err);
        }
        Ok(tab)
    }

    async fn active_tab(&self) -> Result<TabId, BrowserError> {
        Ok(self.lock().active)
    }

    async fn switch_to_tab(&self, tab: TabId) -> Result<(), BrowserError> {
        let mut state = self.lock();
        if !state.tabs.iter().any(|(id, _)| *id == tab) {
            return Err(BrowserError::UnknownTab(tab.0));
        }
        state.active = tab;
        Ok(())
    }

    async fn close_tab(&self, tab: TabId) -> Result<(), BrowserError> {
        let mut state = self.lock();
        let before = state.tabs.len();
        state.tabs.retain(|(id, _)| *id != tab);
        if state.tabs.len() == before {
            return Err(BrowserError::UnknownTab(tab.0));
        }
        state.handles.retain(|_, (h, _, _)| h.tab != tab);
        if state.active == tab {
            state.active = state.tabs.first().map_or(TabId(0), |(id, _)| *id);
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), BrowserError> {
        let mut state = self.lock();
        state.closed = true;
        state.tabs.clear();
        state.handles.clear();
        Ok(())
    }
}

/// Default tuning with every pause and wait set to zero.
#[must_use]
pub fn instant_tuning() -> foodmap_core::ScrapeTuning {
    let mut tuning = foodmap_core::ScrapeTuning::default();
    let timing = &mut tuning.timing;
    timing.scroll_pause_ms = 0;
    timing.max_scroll_attempts = 2;
    timing.load_more_wait_ms = 0;
    timing.visit_pause_ms = 0;
    timing.visit_jitter_ms = 0;
    timing.page_settle_ms = 0;
    timing.dialog_wait_ms = 0;
    timing.suggestion_wait_ms = 0;
    tuning
}

/// Configuration pointing at `output_dir`, with short timeouts and no
/// retry backoff.
#[must_use]
pub fn test_config(output_dir: &std::path::Path) -> foodmap_core::AppConfig {
    foodmap_core::AppConfig {
        env: foodmap_core::Environment::Test,
        bind_addr: ([127, 0, 0, 1], 0).into(),
        log_level: "debug".to_string(),
        output_dir: output_dir.to_path_buf(),
        tuning_path: None,
        base_url: "https://market.test/feed".to_string(),
        chrome_path: None,
        page_load_timeout_secs: 1,
        item_extraction_timeout_secs: 5,
        max_listing_pages: 5,
        search_max_retries: 1,
        retry_backoff_base_ms: 0,
        job_retention_secs: 3600,
    }
}
