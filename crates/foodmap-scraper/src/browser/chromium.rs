//! [`BrowserSession`] over the Chrome DevTools Protocol.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::{BrowserSession, ClickStrategy, ElementHandle, Locator, TabId};
use crate::error::BrowserError;

/// Returns true when the element's centre is not covered by another node.
const HIT_TEST_JS: &str = "function() { \
    const r = this.getBoundingClientRect(); \
    const t = document.elementFromPoint(r.left + r.width / 2, r.top + r.height / 2); \
    return !!t && (t === this || this.contains(t)); }";

const SCRIPT_CLICK_JS: &str = "function() { this.click(); }";

const DISPATCH_CLICK_JS: &str = "function() { \
    this.dispatchEvent(new MouseEvent('click', { bubbles: true, cancelable: true, view: window })); }";

const CLEAR_INPUT_JS: &str = "function() { \
    this.value = ''; \
    this.dispatchEvent(new Event('input', { bubbles: true })); }";

const DISPLAYED_JS: &str = "function() { \
    const s = window.getComputedStyle(this); \
    return this.offsetParent !== null && s.visibility !== 'hidden' && !this.disabled; }";

#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Show the browser window instead of running headless.
    pub visible: bool,
    pub chrome_path: Option<PathBuf>,
    pub request_timeout: Duration,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            visible: false,
            chrome_path: None,
            request_timeout: Duration::from_secs(20),
        }
    }
}

struct SessionState {
    tabs: Vec<(TabId, Page)>,
    active: TabId,
    elements: HashMap<u64, (TabId, Element)>,
    next_tab: u64,
    next_element: u64,
}

impl SessionState {
    fn page(&self, tab: TabId) -> Result<Page, BrowserError> {
        self.tabs
            .iter()
            .find(|(id, _)| *id == tab)
            .map(|(_, page)| page.clone())
            .ok_or(BrowserError::UnknownTab(tab.0))
    }

    fn element(&self, handle: ElementHandle) -> Result<&Element, BrowserError> {
        match self.elements.get(&handle.0) {
            Some((tab, element)) if *tab == self.active => Ok(element),
            _ => Err(BrowserError::StaleElement(handle.0)),
        }
    }

    fn forget_elements(&mut self, tab: TabId) {
        self.elements.retain(|_, (owner, _)| *owner != tab);
    }
}

/// One Chromium process with its own tabs. Not shared between runs.
pub struct ChromiumSession {
    browser: Mutex<Browser>,
    handler: JoinHandle<()>,
    state: Mutex<SessionState>,
}

impl ChromiumSession {
    /// Launches Chromium and opens a blank first tab.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::Launch`] if the browser cannot be configured
    /// or started.
    pub async fn launch(options: &LaunchOptions) -> Result<Self, BrowserError> {
        let mut builder = BrowserConfig::builder()
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .request_timeout(options.request_timeout);
        if options.visible {
            builder = builder.with_head();
        }
        if let Some(path) = &options.chrome_path {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(BrowserError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;
        let handler = tokio::spawn(async move { while handler.next().await.is_some() {} });

        let first = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        tracing::debug!(visible = options.visible, "chromium session started");

        Ok(Self {
            browser: Mutex::new(browser),
            handler,
            state: Mutex::new(SessionState {
                tabs: vec![(TabId(0), first)],
                active: TabId(0),
                elements: HashMap::new(),
                next_tab: 1,
                next_element: 1,
            }),
        })
    }

    async fn active_page(&self) -> Result<Page, BrowserError> {
        let state = self.state.lock().await;
        state.page(state.active)
    }

    async fn evaluate<T: serde::de::DeserializeOwned>(
        &self,
        expression: &str,
    ) -> Result<T, BrowserError> {
        let page = self.active_page().await?;
        page.evaluate(expression)
            .await?
            .into_value::<T>()
            .map_err(|e| BrowserError::Script(e.to_string()))
    }

    async fn call_on(
        &self,
        handle: ElementHandle,
        function: &str,
    ) -> Result<Option<serde_json::Value>, BrowserError> {
        let state = self.state.lock().await;
        let element = state.element(handle)?;
        let returns = element
            .call_js_fn(function, false)
            .await
            .map_err(not_interactable)?;
        Ok(returns.result.value)
    }
}

fn not_interactable(err: chromiumoxide::error::CdpError) -> BrowserError {
    BrowserError::NotInteractable {
        reason: err.to_string(),
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        let page = {
            let mut state = self.state.lock().await;
            let active = state.active;
            state.forget_elements(active);
            state.page(active)?
        };
        page.goto(url)
            .await
            .map_err(|e| BrowserError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn wait_until_ready(&self, timeout: Duration) -> Result<(), BrowserError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let state: String = self.evaluate("document.readyState").await?;
            if state == "complete" {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(BrowserError::Timeout {
                    what: "document ready".to_string(),
                    millis: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                });
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        let page = self.active_page().await?;
        Ok(page.url().await?.unwrap_or_default())
    }

    async fn title(&self) -> Result<String, BrowserError> {
        let page = self.active_page().await?;
        Ok(page.get_title().await?.unwrap_or_default())
    }

    async fn page_source(&self) -> Result<String, BrowserError> {
        let page = self.active_page().await?;
        Ok(page.content().await?)
    }

    async fn visible_text(&self) -> Result<String, BrowserError> {
        self.evaluate("document.body ? document.body.innerText : ''")
            .await
    }

    async fn find_all(&self, locator: &Locator) -> Result<Vec<ElementHandle>, BrowserError> {
        let page = self.active_page().await?;
        let found = match locator {
            Locator::Css(selector) => page.find_elements(selector.as_str()).await,
            Locator::XPath(expression) => page.find_xpaths(expression.as_str()).await,
        };
        // CDP reports "no node" as an error; treat it as an empty match.
        let Ok(elements) = found else {
            return Ok(Vec::new());
        };

        let mut state = self.state.lock().await;
        let active = state.active;
        let mut handles = Vec::with_capacity(elements.len());
        for element in elements {
            let id = state.next_element;
            state.next_element += 1;
            state.elements.insert(id, (active, element));
            handles.push(ElementHandle(id));
        }
        Ok(handles)
    }

    async fn text(&self, element: ElementHandle) -> Result<String, BrowserError> {
        let state = self.state.lock().await;
        Ok(state
            .element(element)?
            .inner_text()
            .await?
            .unwrap_or_default())
    }

    async fn inner_html(&self, element: ElementHandle) -> Result<String, BrowserError> {
        let state = self.state.lock().await;
        Ok(state
            .element(element)?
            .inner_html()
            .await?
            .unwrap_or_default())
    }

    async fn attribute(
        &self,
        element: ElementHandle,
        name: &str,
    ) -> Result<Option<String>, BrowserError> {
        let state = self.state.lock().await;
        Ok(state.element(element)?.attribute(name).await?)
    }

    async fn is_displayed(&self, element: ElementHandle) -> Result<bool, BrowserError> {
        let value = self.call_on(element, DISPLAYED_JS).await?;
        Ok(value.and_then(|v| v.as_bool()).unwrap_or(false))
    }

    async fn click(
        &self,
        element: ElementHandle,
        strategy: ClickStrategy,
    ) -> Result<(), BrowserError> {
        match strategy {
            ClickStrategy::Native => {
                self.scroll_into_view(element).await?;
                let unobstructed = self
                    .call_on(element, HIT_TEST_JS)
                    .await?
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false);
                if !unobstructed {
                    return Err(BrowserError::NotInteractable {
                        reason: "click target is covered by another element".to_string(),
                    });
                }
                let state = self.state.lock().await;
                state
                    .element(element)?
                    .click()
                    .await
                    .map_err(not_interactable)?;
            }
            ClickStrategy::Script => {
                self.call_on(element, SCRIPT_CLICK_JS).await?;
            }
            ClickStrategy::PointerSequence => {
                let state = self.state.lock().await;
                let target = state.element(element)?;
                target.scroll_into_view().await.map_err(not_interactable)?;
                let point = target.clickable_point().await.map_err(not_interactable)?;
                let page = state.page(state.active)?;
                page.move_mouse(point).await.map_err(not_interactable)?;
                page.click(point).await.map_err(not_interactable)?;
            }
            ClickStrategy::DispatchedEvent => {
                self.call_on(element, DISPATCH_CLICK_JS).await?;
            }
        }
        Ok(())
    }

    async fn fill(&self, element: ElementHandle, text: &str) -> Result<(), BrowserError> {
        self.call_on(element, CLEAR_INPUT_JS).await?;
        let state = self.state.lock().await;
        let target = state.element(element)?;
        target.focus().await.map_err(not_interactable)?;
        target.type_str(text).await.map_err(not_interactable)?;
        Ok(())
    }

    async fn press_enter(&self, element: ElementHandle) -> Result<(), BrowserError> {
        let state = self.state.lock().await;
        state
            .element(element)?
            .press_key("Enter")
            .await
            .map_err(not_interactable)?;
        Ok(())
    }

    async fn scroll_by(&self, pixels: i64) -> Result<(), BrowserError> {
        self.execute(&format!("window.scrollBy(0, {pixels})"))
            .await
            .map(|_| ())
    }

    async fn scroll_to_bottom(&self) -> Result<(), BrowserError> {
        self.execute("window.scrollTo(0, document.body.scrollHeight)")
            .await
            .map(|_| ())
    }

    async fn scroll_to_top(&self) -> Result<(), BrowserError> {
        self.execute("window.scrollTo(0, 0)").await.map(|_| ())
    }

    async fn scroll_into_view(&self, element: ElementHandle) -> Result<(), BrowserError> {
        let state = self.state.lock().await;
        state
            .element(element)?
            .scroll_into_view()
            .await
            .map_err(not_interactable)?;
        Ok(())
    }

    async fn page_height(&self) -> Result<i64, BrowserError> {
        self.evaluate("document.body ? document.body.scrollHeight : 0")
            .await
    }

    async fn execute(&self, script: &str) -> Result<serde_json::Value, BrowserError> {
        let page = self.active_page().await?;
        let result = page
            .evaluate(script)
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn open_tab(&self, url: &str) -> Result<TabId, BrowserError> {
        let page = {
            let browser = self.browser.lock().await;
            browser
                .new_page(url)
                .await
                .map_err(|e| BrowserError::Navigation {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?
        };
        let mut state = self.state.lock().await;
        let tab = TabId(state.next_tab);
        state.next_tab += 1;
        state.tabs.push((tab, page));
        state.active = tab;
        Ok(tab)
    }

    async fn active_tab(&self) -> Result<TabId, BrowserError> {
        Ok(self.state.lock().await.active)
    }

    async fn switch_to_tab(&self, tab: TabId) -> Result<(), BrowserError> {
        let page = {
            let mut state = self.state.lock().await;
            let page = state.page(tab)?;
            state.active = tab;
            page
        };
        page.bring_to_front().await?;
        Ok(())
    }

    async fn close_tab(&self, tab: TabId) -> Result<(), BrowserError> {
        let page = {
            let mut state = self.state.lock().await;
            let index = state
                .tabs
                .iter()
                .position(|(id, _)| *id == tab)
                .ok_or(BrowserError::UnknownTab(tab.0))?;
            let (_, page) = state.tabs.remove(index);
            state.forget_elements(tab);
            if state.active == tab {
                if let Some((first, _)) = state.tabs.first() {
                    state.active = *first;
                }
            }
            page
        };
        page.close().await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), BrowserError> {
        {
            let mut state = self.state.lock().await;
            state.elements.clear();
            state.tabs.clear();
        }
        let mut browser = self.browser.lock().await;
        browser.close().await?;
        if let Err(e) = browser.wait().await {
            tracing::debug!(error = %e, "browser process did not exit cleanly");
        }
        self.handler.abort();
        Ok(())
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}
