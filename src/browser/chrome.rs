use super::{PageDriver, Selector};
use crate::error::{Error, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::input::InsertTextParams;
use chromiumoxide::cdp::browser_protocol::page::{
    EventJavascriptDialogOpening, EventLoadEventFired, GetNavigationHistoryParams,
    HandleJavaScriptDialogParams, NavigateParams, NavigateToHistoryEntryParams,
};
use chromiumoxide::element::Element;
use chromiumoxide::listeners::EventStream;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// How long to wait for the load event after `goto`.
const LOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Pause after a history navigation so the SPA can re-render the listing.
const BACK_SETTLE: Duration = Duration::from_secs(1);

pub struct ChromeDriver {
    browser: Browser,
    page: Page,
    dialogs: Mutex<EventStream<EventJavascriptDialogOpening>>,
    temp_dir: Option<PathBuf>,
}

/// Connection mode for Chrome browser
pub enum ConnectionMode {
    /// Sandboxed mode - launches Chrome using system installation
    Sandboxed {
        chrome_path: Option<String>,
        no_sandbox: bool,
        headless: bool,
    },
    /// Advanced mode - connects to existing Chrome on debug port
    DebugPort(u16),
}

impl ChromeDriver {
    /// Create new ChromeDriver with specified connection mode
    pub async fn new(mode: ConnectionMode) -> Result<Self> {
        let (browser, temp_dir) = match mode {
            ConnectionMode::Sandboxed {
                chrome_path,
                no_sandbox,
                headless,
            } => {
                // Fresh profile per run so a stale session never leaks in
                let unique_id = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| d.as_nanos())
                    .unwrap_or_default();
                let temp_dir = std::env::temp_dir().join(format!("course-harvest-{}", unique_id));
                std::fs::create_dir_all(&temp_dir).map_err(|e| {
                    Error::LaunchFailed(format!("Failed to create temp directory: {}", e))
                })?;

                let mut config = if headless {
                    BrowserConfig::builder()
                } else {
                    BrowserConfig::builder().with_head().viewport(None)
                };

                config = config
                    .user_data_dir(&temp_dir)
                    .arg("--start-maximized")
                    .arg("--disable-dev-shm-usage")
                    .arg("--disable-blink-features=AutomationControlled");

                // Linux AppArmor workaround
                if no_sandbox {
                    config = config.arg("--no-sandbox");
                }

                if let Some(path) = chrome_path {
                    config = config.chrome_executable(path);
                }

                let config = config.build().map_err(|e| {
                    Error::LaunchFailed(format!(
                        "{}. \n\n\
                         Chrome not found. You can:\n\
                         - Install Chrome: https://www.google.com/chrome/\n\
                         - Ubuntu/Debian: sudo apt install chromium-browser\n\
                         - Or specify path: --chrome-path /path/to/chrome\n\
                         - Linux sandbox issue? Try: --no-sandbox",
                        e
                    ))
                })?;

                let (browser, mut handler) = Browser::launch(config)
                    .await
                    .map_err(|e| Error::LaunchFailed(e.to_string()))?;

                tokio::spawn(async move {
                    while (handler.next().await).is_some() {
                        // Handle browser events
                    }
                });

                (browser, Some(temp_dir))
            }
            ConnectionMode::DebugPort(port) => {
                let url = format!("http://localhost:{}", port);
                let (browser, mut handler) = Browser::connect(&url).await.map_err(|e| {
                    Error::ConnectionFailed(format!(
                        "Failed to connect to Chrome on port {}. \
                         Make sure Chrome is running with --remote-debugging-port={}: {}",
                        port, port, e
                    ))
                })?;

                tokio::spawn(async move {
                    while (handler.next().await).is_some() {
                        // Handle browser events
                    }
                });

                (browser, None)
            }
        };

        let page = Self::active_page(&browser).await?;
        let dialogs = page.event_listener::<EventJavascriptDialogOpening>().await?;

        Ok(Self {
            browser,
            page,
            dialogs: Mutex::new(dialogs),
            temp_dir,
        })
    }

    /// First non-`chrome://` page, falling back to a fresh blank page
    async fn active_page(browser: &Browser) -> Result<Page> {
        let pages = browser.pages().await?;

        for page in pages.iter() {
            if let Ok(Some(url)) = page.url().await {
                if !url.starts_with("chrome://") {
                    return Ok(page.clone());
                }
            }
        }

        browser
            .new_page("about:blank")
            .await
            .map_err(|e| Error::Other(format!("Failed to create page: {}", e)))
    }

    /// The page every operation runs against
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Execute arbitrary JavaScript in the page context
    pub async fn execute_script(&self, script: &str) -> Result<serde_json::Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| Error::Script(e.to_string()))?;

        Ok(result.into_value().unwrap_or(serde_json::Value::Null))
    }

    /// Call `function` with `this` bound to the element and return its value
    async fn call_on(&self, element: &Element, function: &str) -> Result<serde_json::Value> {
        let returns = element
            .call_js_fn(function, false)
            .await
            .map_err(|e| Error::Script(e.to_string()))?;

        if let Some(details) = returns.exception_details {
            return Err(Error::Script(details.text));
        }

        Ok(returns.result.value.unwrap_or(serde_json::Value::Null))
    }

    /// Check if the browser is still alive and responsive
    pub async fn is_alive(&self) -> bool {
        matches!(
            tokio::time::timeout(Duration::from_secs(2), self.page.url()).await,
            Ok(Ok(_))
        )
    }

    /// Close the browser connection
    pub async fn close(mut self) -> Result<()> {
        self.browser
            .close()
            .await
            .map_err(|e| Error::Other(e.to_string()))?;
        // Reap the child so it never outlives the run
        let _ = self.browser.wait().await;
        Ok(())
    }
}

#[async_trait]
impl PageDriver for ChromeDriver {
    type Element = Arc<Element>;

    async fn goto(&self, url: &str) -> Result<()> {
        log::debug!("Navigating to {}", url);

        let params = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(|e| Error::NavigationFailed(format!("Invalid URL {}: {}", url, e)))?;

        let mut loaded = self.page.event_listener::<EventLoadEventFired>().await?;

        let response = self.page.execute(params).await.map_err(|e| {
            if e.to_string().contains("oneshot canceled") {
                Error::NavigationFailed(
                    "Browser connection lost. The browser may have been closed or crashed."
                        .to_string(),
                )
            } else {
                Error::NavigationFailed(format!("Failed to navigate to {}: {}", url, e))
            }
        })?;

        if let Some(error_text) = &response.result.error_text {
            return Err(Error::NavigationFailed(format!(
                "Navigation error: {}",
                error_text
            )));
        }

        match tokio::time::timeout(LOAD_TIMEOUT, loaded.next()).await {
            Ok(_) => log::debug!("Page load event fired"),
            // SPAs and pages behind an alert may never fire it; carry on
            Err(_) => log::warn!("Timeout waiting for load event on {}", url),
        }

        Ok(())
    }

    async fn go_back(&self) -> Result<()> {
        let history = self
            .page
            .execute(GetNavigationHistoryParams::default())
            .await?;

        let current = history.result.current_index;
        let entry = usize::try_from(current - 1)
            .ok()
            .and_then(|i| history.result.entries.get(i))
            .ok_or_else(|| Error::NavigationFailed("No previous history entry".to_string()))?;

        self.page
            .execute(NavigateToHistoryEntryParams::new(entry.id))
            .await?;

        tokio::time::sleep(BACK_SETTLE).await;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        self.page
            .url()
            .await
            .map_err(|e| Error::Other(e.to_string()))?
            .ok_or(Error::NoPage)
    }

    async fn find_all(&self, selector: &Selector) -> Result<Vec<Self::Element>> {
        let elements = match (selector, selector.to_css()) {
            (_, Some(css)) => self.page.find_elements(css).await?,
            (Selector::XPath(xpath), None) => self.page.find_xpaths(xpath.as_str()).await?,
            (other, None) => {
                return Err(Error::Other(format!("Unsupported selector: {}", other)));
            }
        };

        Ok(elements.into_iter().map(Arc::new).collect())
    }

    async fn find_in(&self, parent: &Self::Element, css: &str) -> Result<Vec<Self::Element>> {
        let elements = parent.find_elements(css).await?;
        Ok(elements.into_iter().map(Arc::new).collect())
    }

    async fn text(&self, element: &Self::Element) -> Result<String> {
        Ok(element.inner_text().await?.unwrap_or_default())
    }

    async fn attribute(&self, element: &Self::Element, name: &str) -> Result<Option<String>> {
        Ok(element.attribute(name).await?)
    }

    async fn is_actionable(&self, element: &Self::Element) -> Result<bool> {
        let value = self
            .call_on(
                element,
                "function() {
                    if (!this.isConnected) return false;
                    const rect = this.getBoundingClientRect();
                    const style = window.getComputedStyle(this);
                    return rect.width > 0 && rect.height > 0
                        && style.visibility !== 'hidden'
                        && style.display !== 'none'
                        && !this.disabled;
                }",
            )
            .await?;

        Ok(value.as_bool().unwrap_or(false))
    }

    async fn click(&self, element: &Self::Element) -> Result<()> {
        element.click().await?;
        Ok(())
    }

    async fn script_click(&self, element: &Self::Element) -> Result<()> {
        self.call_on(element, "function() { this.click(); }")
            .await
            .map(|_| ())
    }

    async fn scroll_into_view(&self, element: &Self::Element, offset_y: i32) -> Result<()> {
        let function = format!(
            "function() {{
                this.scrollIntoView({{block: 'center'}});
                window.scrollBy(0, {});
            }}",
            offset_y
        );
        self.call_on(element, &function).await.map(|_| ())
    }

    async fn fill(&self, element: &Self::Element, value: &str) -> Result<()> {
        self.call_on(
            element,
            "function() {
                this.focus();
                this.value = '';
                this.dispatchEvent(new Event('input', {bubbles: true}));
            }",
        )
        .await?;
        element.type_str(value).await?;
        Ok(())
    }

    async fn tab_and_type(&self, from: &Self::Element, value: &str) -> Result<()> {
        from.focus().await?;
        from.press_key("Tab").await?;
        tokio::time::sleep(Duration::from_millis(300)).await;
        self.page.execute(InsertTextParams::new(value)).await?;
        Ok(())
    }

    async fn accept_dialog(&self, wait: Duration) -> Result<Option<String>> {
        let mut dialogs = self.dialogs.lock().await;

        let event = match tokio::time::timeout(wait, dialogs.next()).await {
            Ok(Some(event)) => event,
            Ok(None) | Err(_) => return Ok(None),
        };

        match self.page.execute(HandleJavaScriptDialogParams::new(true)).await {
            Ok(_) => Ok(Some(event.message.clone())),
            Err(e) => {
                // Already closed by the page itself
                log::debug!("Dialog {:?} could not be accepted: {}", event.message, e);
                Ok(None)
            }
        }
    }

    async fn remove_elements(&self, css: &str) -> Result<usize> {
        let literal = serde_json::to_string(css).map_err(|e| Error::Script(e.to_string()))?;
        let script = format!(
            "(() => {{
                const found = document.querySelectorAll({});
                found.forEach(e => e.remove());
                return found.length;
            }})()",
            literal
        );

        let value = self.execute_script(&script).await?;
        Ok(value.as_u64().unwrap_or(0) as usize)
    }

    async fn start_muted_playback(&self) -> Result<()> {
        self.execute_script(
            "(() => {
                const v = document.querySelector('video');
                if (v) {
                    v.muted = true;
                    const p = v.play();
                    if (p && p.catch) p.catch(() => {});
                }
                return !!v;
            })()",
        )
        .await
        .map(|_| ())
    }

    async fn media_duration(&self) -> Result<Option<f64>> {
        let value = self
            .execute_script(
                "(() => {
                    const v = document.querySelector('video');
                    if (v && typeof v.duration === 'number' && isFinite(v.duration) && v.duration > 0) {
                        return v.duration;
                    }
                    return null;
                })()",
            )
            .await?;

        Ok(value.as_f64().filter(|d| d.is_finite() && *d > 0.0))
    }
}

impl Drop for ChromeDriver {
    fn drop(&mut self) {
        // Clean up temporary directory if it exists
        if let Some(temp_dir) = &self.temp_dir {
            if temp_dir.exists() {
                let _ = std::fs::remove_dir_all(temp_dir);
            }
        }
    }
}
