use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Browser / scraper configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScraperConfig {
    #[serde(default = "default_url")]
    pub url: String,

    /// CSS selector of the iframe that hosts the report.
    #[serde(default = "default_frame_selector")]
    pub frame_selector: String,

    /// Per-operation browser timeout (navigation, network idle).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_frame_timeout_secs")]
    pub frame_timeout_secs: u64,

    /// Blind wait after the frame appears. The embed exposes no ready signal.
    #[serde(default = "default_render_wait_secs")]
    pub render_wait_secs: u64,

    #[serde(default = "default_true")]
    pub headless: bool,

    #[serde(default = "default_true")]
    pub no_sandbox: bool,

    /// Network counts as idle with at most this many requests in flight...
    #[serde(default = "default_idle_connections")]
    pub idle_connections: usize,

    /// ...for this long.
    #[serde(default = "default_idle_window_ms")]
    pub idle_window_ms: u64,

    #[serde(default)]
    pub chrome_executable: Option<PathBuf>,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    #[serde(default = "default_expected_rows")]
    pub expected_rows: usize,

    /// Also write the raw frame text here, for `sheep-index parse`.
    #[serde(default)]
    pub dump_raw_text: Option<PathBuf>,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_url() -> String {
    "https://www.mla.com.au/prices-markets/sheep-index/".to_string()
}
fn default_frame_selector() -> String {
    "iframe#sheep-index-report".to_string()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_frame_timeout_secs() -> u64 {
    30
}
fn default_render_wait_secs() -> u64 {
    15
}
fn default_idle_connections() -> usize {
    2
}
fn default_idle_window_ms() -> u64 {
    500
}
fn default_output_path() -> PathBuf {
    PathBuf::from("data/sheep-index.json")
}
fn default_expected_rows() -> usize {
    4
}
fn default_true() -> bool {
    true
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            frame_selector: default_frame_selector(),
            timeout_secs: default_timeout_secs(),
            frame_timeout_secs: default_frame_timeout_secs(),
            render_wait_secs: default_render_wait_secs(),
            headless: true,
            no_sandbox: true,
            idle_connections: default_idle_connections(),
            idle_window_ms: default_idle_window_ms(),
            chrome_executable: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_path: default_output_path(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            expected_rows: default_expected_rows(),
            dump_raw_text: None,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scraper: ScraperConfig::default(),
            storage: StorageConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl ScraperConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn frame_timeout(&self) -> Duration {
        Duration::from_secs(self.frame_timeout_secs)
    }

    pub fn render_wait(&self) -> Duration {
        Duration::from_secs(self.render_wait_secs)
    }

    pub fn idle_window(&self) -> Duration {
        Duration::from_millis(self.idle_window_ms)
    }

    /// Parsed report URL. Only http(s) targets are accepted.
    pub fn target_url(&self) -> Result<Url> {
        let url = Url::parse(&self.url).with_context(|| format!("Invalid report URL {:?}", self.url))?;
        match url.scheme() {
            "https" | "http" => Ok(url),
            other => bail!("Unsupported URL scheme {:?} in {}", other, url),
        }
    }
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_sources(config::Environment::with_prefix("SHEEP").separator("__"))
    }

    /// Layer the config files under `env`. A value that fails to deserialize
    /// is an error: silently falling back would point the run at the default
    /// snapshot file.
    fn from_sources(env: config::Environment) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(env)
            .build()
            .context("Failed to read configuration")?;

        cfg.try_deserialize().context("Invalid configuration")
    }
}
