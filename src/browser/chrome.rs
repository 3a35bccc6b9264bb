//! Chrome-backed browser session
//!
//! Uses the Chrome DevTools Protocol via chromiumoxide. One session owns one
//! browser process and one tab.

use super::{Axis, ElementRef, GridPage, ScrollMetrics};
use crate::config::BrowserConfig;
use crate::error::{Error, Result};

/// JS returning the scroll geometry of the first element matching a selector
#[cfg(feature = "browser")]
fn metrics_script(selector: &str) -> Result<String> {
    let selector = serde_json::to_string(selector)?;
    Ok(format!(
        r#"(() => {{
            const el = document.querySelector({selector});
            if (!el) return null;
            return {{
                scrollLeft: el.scrollLeft,
                scrollTop: el.scrollTop,
                scrollWidth: el.scrollWidth,
                scrollHeight: el.scrollHeight,
                clientWidth: el.clientWidth,
                clientHeight: el.clientHeight
            }};
        }})()"#
    ))
}

/// JS that moves a container and fires the event the grid listens to
#[cfg(feature = "browser")]
fn scroll_script(selector: &str, axis: Axis, offset: f64) -> Result<String> {
    let selector = serde_json::to_string(selector)?;
    let property = match axis {
        Axis::Horizontal => "scrollLeft",
        Axis::Vertical => "scrollTop",
    };
    Ok(format!(
        r#"(() => {{
            const el = document.querySelector({selector});
            if (!el) return false;
            el.{property} = {offset};
            el.dispatchEvent(new Event('scroll'));
            return true;
        }})()"#
    ))
}

#[cfg(feature = "browser")]
const INTERACTABLE_FN: &str = r#"function() {
    const rect = this.getBoundingClientRect();
    const style = window.getComputedStyle(this);
    return rect.width > 0 && rect.height > 0
        && style.visibility !== 'hidden'
        && style.display !== 'none'
        && !this.disabled;
}"#;

#[cfg(feature = "browser")]
mod browser_impl {
    use super::*;
    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser, BrowserConfig as CdpConfig};
    use chromiumoxide::element::Element;
    use chromiumoxide::error::CdpError;
    use chromiumoxide::page::ScreenshotParams;
    use chromiumoxide::Page;
    use futures::StreamExt;
    use std::collections::HashMap;
    use std::path::Path;
    use std::time::Duration;
    use tokio::task::JoinHandle;
    use tracing::{debug, info, warn};

    /// A running Chrome with a single tab
    pub struct ChromeSession {
        browser: Browser,
        page: Page,
        handler: Option<JoinHandle<()>>,
        elements: HashMap<u64, Element>,
        next_id: u64,
        load_timeout: Duration,
        closed: bool,
    }

    /// A CDP request timeout during navigation is a page-load timeout
    pub(super) fn navigation_error(err: CdpError, waited: Duration) -> Error {
        match err {
            CdpError::Timeout => Error::timeout("loading the page", waited),
            other => Error::Browser(format!("Navigation failed: {}", other)),
        }
    }

    impl ChromeSession {
        /// Launch Chrome and open a blank tab
        pub async fn launch(config: &BrowserConfig) -> Result<Self> {
            info!(
                "Launching Chrome ({})",
                if config.headless { "headless" } else { "visible" }
            );

            let load_timeout = Duration::from_millis(config.page_load_timeout_ms);
            let mut builder = CdpConfig::builder()
                .window_size(config.window_width, config.window_height)
                .request_timeout(load_timeout)
                .arg("--disable-gpu")
                .arg("--disable-dev-shm-usage")
                .arg("--disable-notifications")
                .arg("--no-first-run")
                .arg("--disable-extensions");

            if !config.headless {
                builder = builder.with_head();
            }

            if !config.sandbox {
                builder = builder.no_sandbox();
            }

            let cdp_config = builder
                .build()
                .map_err(|e| Error::Browser(format!("Failed to build browser config: {}", e)))?;

            let (browser, mut handler) = Browser::launch(cdp_config)
                .await
                .map_err(|e| Error::Browser(format!("Failed to launch browser: {}", e)))?;

            let handle = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if let Err(e) = event {
                        debug!("CDP handler error: {}", e);
                    }
                }
            });

            let page = browser
                .new_page("about:blank")
                .await
                .map_err(|e| Error::Browser(format!("Failed to open tab: {}", e)))?;

            info!("Browser session started");
            Ok(Self {
                browser,
                page,
                handler: Some(handle),
                elements: HashMap::new(),
                next_id: 0,
                load_timeout,
                closed: false,
            })
        }

        fn register(&mut self, element: Element) -> ElementRef {
            let id = self.next_id;
            self.next_id += 1;
            self.elements.insert(id, element);
            ElementRef(id)
        }

        fn element(&self, element: ElementRef) -> Result<&Element> {
            self.elements
                .get(&element.0)
                .ok_or_else(|| Error::Element(format!("stale element handle {}", element.0)))
        }

        async fn evaluate_json(&self, script: String) -> Result<Option<serde_json::Value>> {
            let result = self
                .page
                .evaluate(script)
                .await
                .map_err(|e| Error::Browser(format!("Script evaluation failed: {}", e)))?;
            Ok(result.value().filter(|v| !v.is_null()).cloned())
        }
    }

    #[async_trait]
    impl GridPage for ChromeSession {
        async fn navigate(&mut self, url: &str) -> Result<()> {
            self.elements.clear();
            debug!("Navigating to {}", url);
            self.page
                .goto(url)
                .await
                .map_err(|e| navigation_error(e, self.load_timeout))?;
            Ok(())
        }

        async fn find_all(&mut self, selector: &str) -> Result<Vec<ElementRef>> {
            let found = self
                .page
                .find_elements(selector)
                .await
                .map_err(|e| Error::Element(format!("{}: {}", selector, e)))?;
            Ok(found.into_iter().map(|el| self.register(el)).collect())
        }

        async fn find_within(
            &mut self,
            parent: ElementRef,
            selector: &str,
        ) -> Result<Vec<ElementRef>> {
            let found = self
                .element(parent)?
                .find_elements(selector)
                .await
                .map_err(|e| Error::Element(format!("{}: {}", selector, e)))?;
            Ok(found.into_iter().map(|el| self.register(el)).collect())
        }

        async fn text(&mut self, element: ElementRef) -> Result<String> {
            let text = self
                .element(element)?
                .inner_text()
                .await
                .map_err(|e| Error::Element(format!("inner text: {}", e)))?;
            Ok(text.unwrap_or_default())
        }

        async fn attribute(&mut self, element: ElementRef, name: &str) -> Result<Option<String>> {
            self.element(element)?
                .attribute(name)
                .await
                .map_err(|e| Error::Element(format!("attribute {}: {}", name, e)))
        }

        async fn is_interactable(&mut self, element: ElementRef) -> Result<bool> {
            let returns = self
                .element(element)?
                .call_js_fn(INTERACTABLE_FN, false)
                .await
                .map_err(|e| Error::Element(format!("interactable check: {}", e)))?;
            Ok(returns
                .result
                .value
                .and_then(|v| v.as_bool())
                .unwrap_or(false))
        }

        async fn click(&mut self, element: ElementRef) -> Result<()> {
            self.element(element)?
                .click()
                .await
                .map_err(|e| Error::Element(format!("click: {}", e)))?;
            Ok(())
        }

        async fn scroll_metrics(&mut self, container: &str) -> Result<Option<ScrollMetrics>> {
            match self.evaluate_json(metrics_script(container)?).await? {
                Some(value) => Ok(Some(serde_json::from_value(value)?)),
                None => Ok(None),
            }
        }

        async fn set_scroll(&mut self, container: &str, axis: Axis, offset: f64) -> Result<()> {
            let moved = self
                .evaluate_json(scroll_script(container, axis, offset)?)
                .await?
                .and_then(|v| v.as_bool())
                .unwrap_or(false);
            if moved {
                Ok(())
            } else {
                Err(Error::Element(format!("scroll container {} not found", container)))
            }
        }

        async fn scroll_into_view(&mut self, element: ElementRef) -> Result<()> {
            self.element(element)?
                .scroll_into_view()
                .await
                .map_err(|e| Error::Element(format!("scroll into view: {}", e)))?;
            Ok(())
        }

        async fn page_html(&mut self) -> Result<String> {
            self.page
                .content()
                .await
                .map_err(|e| Error::Browser(format!("Failed to get content: {}", e)))
        }

        async fn screenshot(&mut self, path: &Path) -> Result<()> {
            self.page
                .save_screenshot(ScreenshotParams::builder().full_page(true).build(), path)
                .await
                .map_err(|e| Error::Browser(format!("Screenshot failed: {}", e)))?;
            Ok(())
        }

        fn release_elements(&mut self) {
            self.elements.clear();
        }

        async fn close(&mut self) -> Result<()> {
            if self.closed {
                return Ok(());
            }
            self.closed = true;
            self.elements.clear();

            let result = self
                .browser
                .close()
                .await
                .map(|_| ())
                .map_err(|e| Error::Browser(format!("Failed to close browser: {}", e)));

            if let Err(e) = self.browser.wait().await {
                warn!("Browser process did not exit cleanly: {}", e);
            }

            if let Some(handle) = self.handler.take() {
                handle.abort();
            }

            info!("Browser session closed");
            result
        }
    }

    impl Drop for ChromeSession {
        fn drop(&mut self) {
            // Browser's own Drop kills the process; the handler task must go too.
            if let Some(handle) = self.handler.take() {
                handle.abort();
            }
        }
    }
}

#[cfg(feature = "browser")]
pub use browser_impl::ChromeSession;

/// Placeholder when the browser feature is disabled; it can never be launched.
#[cfg(not(feature = "browser"))]
pub enum ChromeSession {}

#[cfg(not(feature = "browser"))]
impl ChromeSession {
    pub async fn launch(_config: &BrowserConfig) -> Result<Self> {
        Err(Error::Browser(
            "Browser support not available. \
             Compile with --features browser to enable headless Chrome."
                .to_string(),
        ))
    }
}

#[cfg(not(feature = "browser"))]
#[async_trait::async_trait]
impl GridPage for ChromeSession {
    async fn navigate(&mut self, _url: &str) -> Result<()> {
        match *self {}
    }

    async fn find_all(&mut self, _selector: &str) -> Result<Vec<ElementRef>> {
        match *self {}
    }

    async fn find_within(&mut self, _parent: ElementRef, _selector: &str) -> Result<Vec<ElementRef>> {
        match *self {}
    }

    async fn text(&mut self, _element: ElementRef) -> Result<String> {
        match *self {}
    }

    async fn attribute(&mut self, _element: ElementRef, _name: &str) -> Result<Option<String>> {
        match *self {}
    }

    async fn is_interactable(&mut self, _element: ElementRef) -> Result<bool> {
        match *self {}
    }

    async fn click(&mut self, _element: ElementRef) -> Result<()> {
        match *self {}
    }

    async fn scroll_metrics(&mut self, _container: &str) -> Result<Option<ScrollMetrics>> {
        match *self {}
    }

    async fn set_scroll(&mut self, _container: &str, _axis: Axis, _offset: f64) -> Result<()> {
        match *self {}
    }

    async fn scroll_into_view(&mut self, _element: ElementRef) -> Result<()> {
        match *self {}
    }

    async fn page_html(&mut self) -> Result<String> {
        match *self {}
    }

    fn release_elements(&mut self) {
        match *self {}
    }

    async fn screenshot(&mut self, _path: &std::path::Path) -> Result<()> {
        match *self {}
    }

    async fn close(&mut self) -> Result<()> {
        match *self {}
    }
}

/// Check if headless browser support was compiled in
pub fn is_browser_available() -> bool {
    cfg!(feature = "browser")
}
