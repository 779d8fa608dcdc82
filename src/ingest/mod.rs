/// Page renderers: anything that turns the AQHI URL into table cells plus
/// an observation time.
///
/// Submodules:
/// - `page`   : markup → `RenderedPage` extraction shared by all renderers.
/// - `http`   : plain blocking GET.
/// - `browser`: headless Chromium `--dump-dom`.
/// - `fixture`: saved page replay for development.
///
/// Renderers are built per call from a `RendererConfig`, so no session
/// outlives one render.

pub mod browser;
pub mod fixture;
pub mod http;
pub mod page;

use std::path::PathBuf;

use serde::Deserialize;

use crate::model::{RenderError, RenderedPage};

pub const AQHI_URL: &str = "https://www.aqhi.gov.hk/en/index.html";

/// Anything that can produce the rendered list view for a URL.
pub trait PageRenderer {
    fn render(&self, url: &str) -> Result<RenderedPage, RenderError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    Http,
    Browser,
    Fixture,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub kind: RendererKind,
    pub url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub browser_path: String,
    pub settle_ms: u64,
    pub fixture_path: Option<PathBuf>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            kind: RendererKind::Http,
            url: AQHI_URL.to_string(),
            timeout_secs: 30,
            user_agent: concat!("aqhi_service/", env!("CARGO_PKG_VERSION")).to_string(),
            browser_path: "chromium".to_string(),
            settle_ms: 5000,
            fixture_path: None,
        }
    }
}

/// Build the configured renderer.
pub fn renderer_for(config: &RendererConfig) -> Result<Box<dyn PageRenderer>, RenderError> {
    match config.kind {
        RendererKind::Http => Ok(Box::new(http::HttpRenderer::new(
            config.timeout_secs,
            &config.user_agent,
        )?)),
        RendererKind::Browser => Ok(Box::new(browser::BrowserRenderer::new(
            &config.browser_path,
            config.settle_ms,
            config.timeout_secs,
        ))),
        RendererKind::Fixture => {
            let path = config
                .fixture_path
                .as_ref()
                .ok_or_else(|| RenderError::Fixture("no fixture_path configured".to_string()))?;
            Ok(Box::new(fixture::FixtureRenderer::new(path)))
        }
    }
}

/// Render the configured URL once; the renderer is dropped on return.
pub fn render(config: &RendererConfig) -> Result<RenderedPage, RenderError> {
    let renderer = renderer_for(config)?;
    renderer.render(&config.url)
}
