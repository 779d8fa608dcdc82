/// Saved-page replay for development
///
/// When the live site is unavailable, or to reproduce a parse failure,
/// point the renderer at a page saved earlier. The requested URL is only
/// logged; the file is always what gets rendered.

use std::fs;
use std::path::{Path, PathBuf};

use crate::ingest::{PageRenderer, page};
use crate::logging::{self, Component};
use crate::model::{RenderError, RenderedPage};

pub struct FixtureRenderer {
    path: PathBuf,
}

impl FixtureRenderer {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl PageRenderer for FixtureRenderer {
    fn render(&self, url: &str) -> Result<RenderedPage, RenderError> {
        logging::info(
            Component::Render,
            None,
            &format!("Replaying {} in place of {}", self.path.display(), url),
        );

        let html = fs::read_to_string(&self.path)
            .map_err(|e| RenderError::Fixture(format!("{}: {}", self.path.display(), e)))?;
        page::extract(&html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fixture_is_render_error() {
        let renderer = FixtureRenderer::new("/nonexistent/aqhi-page.html");
        match renderer.render("https://www.aqhi.gov.hk/en/index.html") {
            Err(RenderError::Fixture(msg)) => assert!(msg.contains("aqhi-page.html")),
            other => panic!("expected fixture error, got {:?}", other),
        }
    }
}
