pub mod browser;
pub mod cleaner;
pub mod parsers;

use crate::config::ScraperConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

use self::browser::BrowserSession;

// ── Source trait ──────────────────────────────────────────────────────────────

/// Produces the rendered text of the report frame.
#[async_trait]
pub trait ReportSource: Send + Sync {
    async fn fetch_report_text(&self) -> Result<String>;
}

// ── Render waiter ─────────────────────────────────────────────────────────────

/// Gives the embedded report time to finish client-side rendering.
///
/// The embed emits no ready event, so the production waiter is a blind delay.
#[async_trait]
pub trait RenderWaiter: Send + Sync {
    async fn wait_for_render(&self);
}

pub struct FixedDelay(pub Duration);

#[async_trait]
impl RenderWaiter for FixedDelay {
    async fn wait_for_render(&self) {
        info!("Waiting {:?} for report to render", self.0);
        tokio::time::sleep(self.0).await;
    }
}

pub struct NoDelay;

#[async_trait]
impl RenderWaiter for NoDelay {
    async fn wait_for_render(&self) {}
}

// ── Chrome source ─────────────────────────────────────────────────────────────

pub struct ChromeReportSource {
    config: ScraperConfig,
    waiter: Box<dyn RenderWaiter>,
}

impl ChromeReportSource {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        config.target_url()?;
        Ok(Self {
            config: config.clone(),
            waiter: Box::new(FixedDelay(config.render_wait())),
        })
    }

    pub fn with_waiter(mut self, waiter: impl RenderWaiter + 'static) -> Self {
        self.waiter = Box::new(waiter);
        self
    }

    async fn extract(&self, session: &BrowserSession) -> Result<String> {
        let url = self.config.target_url()?;

        session
            .goto_and_wait_idle(url.as_str(), &self.config)
            .await
            .context("Report page did not load")?;

        let frame_id = session
            .wait_for_frame(&self.config.frame_selector, self.config.frame_timeout())
            .await
            .context("Report frame never appeared")?;

        self.waiter.wait_for_render().await;

        let text = session
            .frame_text(frame_id)
            .await
            .context("Reading report frame text failed")?;

        info!("Extracted {} chars of frame text", text.len());
        Ok(text)
    }
}

#[async_trait]
impl ReportSource for ChromeReportSource {
    async fn fetch_report_text(&self) -> Result<String> {
        let session = BrowserSession::launch(&self.config)
            .await
            .context("Browser launch failed")?;

        let result = self.extract(&session).await;
        session.close().await;
        result
    }
}
