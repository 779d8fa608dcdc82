/// Blocking HTTP page renderer.
///
/// Fetches the AQHI page markup directly. Suitable when the list view is
/// present in the served HTML; use the browser renderer when it is only
/// built client-side.

use std::time::Duration;

use crate::ingest::{PageRenderer, page};
use crate::logging::{self, Component};
use crate::model::{RenderError, RenderedPage};

pub struct HttpRenderer {
    client: reqwest::blocking::Client,
}

impl HttpRenderer {
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, RenderError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(user_agent)
            .build()
            .map_err(|e| RenderError::Request(e.to_string()))?;
        Ok(Self { client })
    }
}

impl PageRenderer for HttpRenderer {
    fn render(&self, url: &str) -> Result<RenderedPage, RenderError> {
        logging::debug(Component::Render, None, &format!("GET {}", url));

        let response = self
            .client
            .get(url)
            .header("Accept", "text/html")
            .send()
            .map_err(|e| RenderError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RenderError::Http(response.status().as_u16()));
        }

        let body = response.text().map_err(|e| RenderError::Request(e.to_string()))?;
        page::extract(&body)
    }
}
