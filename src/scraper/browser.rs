use crate::config::ScraperConfig;
use crate::errors::ScrapeError;
use chromiumoxide::cdp::browser_protocol::network::{
    EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent, RequestId,
};
use chromiumoxide::cdp::browser_protocol::page::{CreateIsolatedWorldParams, FrameId};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::{Browser, BrowserConfig, Handler, Page};
use futures::StreamExt;
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Script run inside the frame's isolated world.
const FRAME_TEXT_JS: &str = "document.body ? document.body.innerText : ''";

/// A headless Chrome process with one working tab.
///
/// Call [`BrowserSession::close`] on every path. If a session is dropped
/// without it, chromiumoxide kills the child process when `Browser` drops.
pub struct BrowserSession {
    browser: Browser,
    page: Page,
    handler_task: tokio::task::JoinHandle<()>,
    closed: bool,
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        if !self.closed {
            warn!("Browser session dropped without close; killing browser");
        }
        self.handler_task.abort();
    }
}

impl BrowserSession {
    pub async fn launch(config: &ScraperConfig) -> Result<Self, ScrapeError> {
        let mut builder = BrowserConfig::builder()
            .request_timeout(config.timeout())
            // Keep cross-origin iframes in the page's renderer so the frame
            // shows up in this target's frame tree.
            .arg("--disable-features=site-per-process,IsolateOrigins")
            .arg("--disable-site-isolation-trials");

        if !config.headless {
            builder = builder.with_head();
        }
        if config.no_sandbox {
            // Containers and CI runners usually lack the namespaces Chrome's
            // sandbox needs.
            builder = builder.no_sandbox();
        }
        if let Some(exe) = &config.chrome_executable {
            builder = builder.chrome_executable(exe);
        }

        let browser_config = builder.build().map_err(ScrapeError::Launch)?;
        let (mut browser, handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| ScrapeError::Launch(e.to_string()))?;

        let handler_task = spawn_handler_task(handler);

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                let _ = browser.close().await;
                handler_task.abort();
                return Err(e.into());
            }
        };

        info!("Browser launched (headless={}, no_sandbox={})", config.headless, config.no_sandbox);
        Ok(Self {
            browser,
            page,
            handler_task,
            closed: false,
        })
    }

    /// Navigate and wait until no more than `idle_connections` requests have
    /// been in flight for `idle_window`, bounded by the operation timeout.
    pub async fn goto_and_wait_idle(&self, url: &str, config: &ScraperConfig) -> Result<(), ScrapeError> {
        let limit = config.timeout();
        let navigation_err = |source| ScrapeError::Navigation {
            url: url.to_string(),
            waited: limit,
            source,
        };

        let mut sent = self.page.event_listener::<EventRequestWillBeSent>().await?;
        let mut finished = self.page.event_listener::<EventLoadingFinished>().await?;
        let mut failed = self.page.event_listener::<EventLoadingFailed>().await?;

        let started = Instant::now();
        info!("Navigating to {}", url);
        match timeout(limit, self.page.goto(url)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(navigation_err(Some(e))),
            Err(_) => return Err(navigation_err(None)),
        }

        let deadline = started + limit;
        let mut inflight: HashSet<RequestId> = HashSet::new();
        let mut quiet_since: Option<Instant> = None;

        loop {
            let now = Instant::now();
            if inflight.len() <= config.idle_connections {
                let since = *quiet_since.get_or_insert(now);
                if now.duration_since(since) >= config.idle_window() {
                    break;
                }
            } else {
                quiet_since = None;
            }

            if now >= deadline {
                warn!("Still {} requests in flight at timeout", inflight.len());
                return Err(navigation_err(None));
            }

            tokio::select! {
                Some(ev) = sent.next() => { inflight.insert(ev.request_id.clone()); }
                Some(ev) = finished.next() => { inflight.remove(&ev.request_id); }
                Some(ev) = failed.next() => { inflight.remove(&ev.request_id); }
                _ = sleep(POLL_INTERVAL) => {}
            }
        }

        info!(
            "Network idle after {:.2?} ({} in flight)",
            started.elapsed(),
            inflight.len()
        );
        Ok(())
    }

    /// Poll for the iframe element until it exists and has a frame attached.
    pub async fn wait_for_frame(&self, selector: &str, limit: Duration) -> Result<FrameId, ScrapeError> {
        let started = Instant::now();

        loop {
            if let Ok(element) = self.page.find_element(selector).await {
                match element.description().await {
                    Ok(node) => {
                        if let Some(frame_id) = node.frame_id {
                            info!("Frame {} located after {:.2?}", selector, started.elapsed());
                            return Ok(frame_id);
                        }
                        debug!("{} present but no frame attached yet", selector);
                    }
                    Err(e) => debug!("describe {} failed: {}", selector, e),
                }
            }

            if started.elapsed() >= limit {
                return Err(ScrapeError::FrameNotFound {
                    selector: selector.to_string(),
                    waited: limit,
                });
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    /// Rendered text of the frame's own document body.
    pub async fn frame_text(&self, frame_id: FrameId) -> Result<String, ScrapeError> {
        let world = self
            .page
            .execute(CreateIsolatedWorldParams::new(frame_id))
            .await?;

        let params = EvaluateParams::builder()
            .expression(FRAME_TEXT_JS)
            .context_id(world.result.execution_context_id)
            .return_by_value(true)
            .build()
            .map_err(ScrapeError::Extraction)?;

        let evaluated = self.page.execute(params).await?;
        if let Some(details) = &evaluated.result.exception_details {
            return Err(ScrapeError::Extraction(details.text.clone()));
        }

        match &evaluated.result.result.value {
            Some(serde_json::Value::String(text)) => Ok(text.clone()),
            other => Err(ScrapeError::Extraction(format!(
                "expected string from frame body, got {:?}",
                other
            ))),
        }
    }

    pub async fn close(mut self) {
        info!("Closing browser");
        if let Err(e) = self.browser.close().await {
            warn!("Browser close failed: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            warn!("Browser wait failed: {}", e);
        }
        self.closed = true;
    }
}

fn spawn_handler_task(mut handler: Handler) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                debug!("chromiumoxide handler event error: {}", e);
            }
        }
    })
}
