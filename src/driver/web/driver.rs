//! Page capability backed by a Playwright-driven Chromium.

use anyhow::{Context, Result};
use async_trait::async_trait;
use colored::Colorize;
use playwright::api::{Browser, BrowserContext, ElementHandle, Page, Viewport};
use playwright::Playwright;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::driver::error::PageError;
use crate::driver::traits::{NodeSummary, PageCapability, PageResult};
use crate::utils::config::BrowserConfig;

const POLL_INTERVAL_MS: u64 = 100;

fn driver_err(e: impl std::fmt::Display) -> PageError {
    PageError::from_driver(e)
}

/// Browser page driven through Playwright
pub struct WebPage {
    #[allow(dead_code)]
    playwright: Arc<Playwright>,
    #[allow(dead_code)]
    browser: Arc<Browser>,
    #[allow(dead_code)]
    context: Arc<BrowserContext>,
    page: Arc<Mutex<Page>>,
}

impl WebPage {
    /// Launch (or attach to) a browser and open a blank page
    pub async fn launch(config: &BrowserConfig) -> Result<Self> {
        let playwright = Playwright::initialize()
            .await
            .context("Failed to initialize Playwright")?;

        let chromium = playwright.chromium();
        let browser = match &config.cdp_endpoint {
            Some(endpoint) => {
                println!("{} Trying to connect to browser at: {}", "🔌".blue(), endpoint);
                match chromium.connect_over_cdp_builder(endpoint).connect_over_cdp().await {
                    Ok(b) => {
                        println!("{} Connected to existing browser!", "✅".green());
                        b
                    }
                    Err(e) => {
                        println!("{} Could not connect to existing browser: {}", "⚠️".yellow(), e);
                        launch_chromium_browser(&chromium, config).await?
                    }
                }
            }
            None => launch_chromium_browser(&chromium, config).await?,
        };

        let context = browser.context_builder().build().await?;
        let page = context.new_page().await?;
        page.set_viewport_size(Viewport {
            width: config.viewport_width,
            height: config.viewport_height,
        })
        .await?;

        Ok(Self {
            playwright: Arc::new(playwright),
            browser: Arc::new(browser),
            context: Arc::new(context),
            page: Arc::new(Mutex::new(page)),
        })
    }

    /// Navigate to `url` and wait for the load event
    pub async fn goto(&self, url: &str) -> Result<()> {
        let page = self.page.lock().await;
        page.goto_builder(url)
            .goto()
            .await
            .with_context(|| format!("Failed to navigate to {}", url))?;
        Ok(())
    }

    async fn eval<T: serde::de::DeserializeOwned>(
        &self,
        handle: &ElementHandle,
        js: &str,
    ) -> PageResult<T> {
        let page = self.page.lock().await;
        page.evaluate::<&ElementHandle, T>(js, handle)
            .await
            .map_err(driver_err)
    }

    /// Poll a boolean element state until it holds or `timeout_ms` passes
    async fn poll_state<F, Fut>(&self, timeout_ms: u64, mut check: F) -> PageResult<bool>
    where
        F: FnMut() -> Fut + Send,
        Fut: std::future::Future<Output = PageResult<bool>> + Send,
    {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            if check().await? {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
        }
    }
}

#[async_trait]
impl PageCapability for WebPage {
    type Handle = Arc<ElementHandle>;

    fn backend_name(&self) -> &str {
        "playwright"
    }

    async fn locate_all(&self, selector: &str) -> PageResult<Vec<Self::Handle>> {
        let page = self.page.lock().await;
        let handles = page.query_selector_all(selector).await.map_err(|e| {
            match PageError::from_driver(&e) {
                PageError::InvalidSelector { reason, .. } => PageError::InvalidSelector {
                    selector: selector.to_string(),
                    reason,
                },
                other => other,
            }
        })?;
        Ok(handles.into_iter().map(Arc::new).collect())
    }

    async fn count(&self, selector: &str) -> PageResult<usize> {
        Ok(self.locate_all(selector).await?.len())
    }

    async fn get_attribute(&self, handle: &Self::Handle, name: &str) -> PageResult<Option<String>> {
        handle.get_attribute(name).await.map_err(driver_err)
    }

    async fn text_content(&self, handle: &Self::Handle) -> PageResult<Option<String>> {
        handle.text_content().await.map_err(driver_err)
    }

    async fn tag_name(&self, handle: &Self::Handle) -> PageResult<String> {
        self.eval(handle, "el => el.tagName.toLowerCase()").await
    }

    async fn ancestors(&self, handle: &Self::Handle) -> PageResult<Vec<NodeSummary>> {
        self.eval(
            handle,
            r#"el => {
                const out = [];
                for (let p = el.parentElement; p; p = p.parentElement) {
                    let nth = 1;
                    for (let s = p.previousElementSibling; s; s = s.previousElementSibling) {
                        if (s.tagName === p.tagName) nth++;
                    }
                    out.push({
                        tag: p.tagName.toLowerCase(),
                        id: p.id || null,
                        classes: Array.from(p.classList),
                        nth_of_type: nth,
                    });
                }
                return out;
            }"#,
        )
        .await
    }

    async fn nth_of_type(&self, handle: &Self::Handle) -> PageResult<usize> {
        self.eval(
            handle,
            r#"el => {
                let n = 1;
                for (let s = el.previousElementSibling; s; s = s.previousElementSibling) {
                    if (s.tagName === el.tagName) n++;
                }
                return n;
            }"#,
        )
        .await
    }

    async fn is_visible(&self, handle: &Self::Handle, timeout_ms: u64) -> PageResult<bool> {
        self.poll_state(timeout_ms, || async { handle.is_visible().await.map_err(driver_err) })
            .await
    }

    async fn is_enabled(&self, handle: &Self::Handle, timeout_ms: u64) -> PageResult<bool> {
        self.poll_state(timeout_ms, || async { handle.is_enabled().await.map_err(driver_err) })
            .await
    }

    async fn is_checked(&self, handle: &Self::Handle) -> PageResult<bool> {
        handle.is_checked().await.map_err(driver_err)
    }

    async fn input_value(&self, handle: &Self::Handle) -> PageResult<Option<String>> {
        self.eval(handle, "el => ('value' in el) ? String(el.value) : null")
            .await
    }

    async fn click(&self, handle: &Self::Handle) -> PageResult<()> {
        handle.click_builder().click().await.map_err(driver_err)
    }

    async fn fill(&self, handle: &Self::Handle, value: &str) -> PageResult<()> {
        handle.fill_builder(value).fill().await.map_err(driver_err)
    }

    async fn hover(&self, handle: &Self::Handle) -> PageResult<()> {
        handle.hover_builder().goto().await.map_err(driver_err)
    }

    async fn focus(&self, handle: &Self::Handle) -> PageResult<()> {
        self.eval::<()>(handle, "el => el.focus()").await
    }

    async fn select_option(&self, handle: &Self::Handle, value: &str) -> PageResult<()> {
        let value = serde_json::to_string(value).map_err(driver_err)?;
        let js = format!(
            r#"el => {{
                const wanted = {value};
                const opt = Array.from(el.options || []).find(o => o.value === wanted || o.label === wanted);
                if (!opt) throw new Error('option not found: ' + wanted);
                el.value = opt.value;
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                el.dispatchEvent(new Event('change', {{ bubbles: true }}));
            }}"#
        );
        self.eval::<()>(handle, &js).await
    }

    async fn check(&self, handle: &Self::Handle) -> PageResult<()> {
        if !self.is_checked(handle).await? {
            self.click(handle).await?;
        }
        Ok(())
    }

    async fn uncheck(&self, handle: &Self::Handle) -> PageResult<()> {
        if self.is_checked(handle).await? {
            self.click(handle).await?;
        }
        Ok(())
    }

    async fn press(&self, handle: &Self::Handle, key: &str) -> PageResult<()> {
        self.focus(handle).await?;
        let page = self.page.lock().await;
        // Workaround for potential binding issue with press()
        page.keyboard.down(key).await.map_err(driver_err)?;
        page.keyboard.up(key).await.map_err(driver_err)?;
        Ok(())
    }

    async fn screenshot(&self, handle: Option<&Self::Handle>, path: &Path) -> PageResult<()> {
        let path_buf = path.to_path_buf();
        match handle {
            Some(handle) => handle
                .screenshot_builder()
                .path(path_buf)
                .screenshot()
                .await
                .map(|_| ())
                .map_err(driver_err),
            None => {
                let page = self.page.lock().await;
                page.screenshot_builder()
                    .path(path_buf)
                    .screenshot()
                    .await
                    .map(|_| ())
                    .map_err(driver_err)
            }
        }
    }

    async fn wait_for_timeout(&self, ms: u64) -> PageResult<()> {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(())
    }
}

/// Launch a new Chromium browser, preferring a locally installed one
async fn launch_chromium_browser(
    chromium: &playwright::api::BrowserType,
    config: &BrowserConfig,
) -> Result<Browser> {
    let mut launcher = chromium.launcher();
    launcher = launcher.headless(config.headless);

    let env_path = std::env::var("PLAYWRIGHT_CHROMIUM_EXECUTABLE_PATH")
        .ok()
        .map(PathBuf::from);

    if let Some(ref path) = env_path {
        println!("{} Using browser from env: {}", "🌐".blue(), path.display());
        launcher = launcher.executable(path);
    } else if let Some(ref path) = find_system_browser() {
        println!("{} Using discovered browser: {}", "🌐".blue(), path.display());
        launcher = launcher.executable(path);
    } else {
        log::info!("No browser executable found, falling back to the Playwright bundle");
    }

    let args: Vec<String> = [
        "--no-sandbox",
        "--disable-setuid-sandbox",
        "--disable-dev-shm-usage",
        "--disable-gpu",
        "--ignore-certificate-errors",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    launcher = launcher.args(&args);

    Ok(launcher.launch().await?)
}

fn find_system_browser() -> Option<PathBuf> {
    let common_paths = [
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
    ];

    common_paths
        .iter()
        .map(Path::new)
        .find(|p| p.exists())
        .map(Path::to_path_buf)
}
