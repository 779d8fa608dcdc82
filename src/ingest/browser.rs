/// Headless browser page renderer.
///
/// Runs a Chromium-compatible binary with `--dump-dom`, which prints the
/// DOM after scripts have run. The browser process is the whole session:
/// it starts and exits inside one `render` call, and is killed if it is
/// still running after `timeout_secs`.
///
/// `--dump-dom` cannot click anything. The station list view must already
/// be present in the dumped DOM; if the page only builds it after the
/// "List" control is clicked, extraction finds no "Station Names" rows and
/// the run fails with `NoStations` even though the parser is fine.

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::ingest::{PageRenderer, page};
use crate::logging::{self, Component};
use crate::model::{RenderError, RenderedPage};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

pub struct BrowserRenderer {
    browser_path: String,
    /// Virtual time the page's scripts get before the DOM is dumped.
    settle_ms: u64,
    timeout: Duration,
}

impl BrowserRenderer {
    pub fn new(browser_path: &str, settle_ms: u64, timeout_secs: u64) -> Self {
        Self {
            browser_path: browser_path.to_string(),
            settle_ms,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    fn args(&self, url: &str) -> Vec<String> {
        vec![
            "--headless".to_string(),
            "--disable-gpu".to_string(),
            "--no-sandbox".to_string(),
            format!("--virtual-time-budget={}", self.settle_ms),
            "--dump-dom".to_string(),
            url.to_string(),
        ]
    }
}

/// Drain a child pipe on its own thread so a large DOM cannot fill the
/// pipe and stall the browser while we wait on it.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

fn wait_until(child: &mut Child, deadline: Instant) -> Result<Option<std::process::ExitStatus>, RenderError> {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(Some(status)),
            Ok(None) if Instant::now() >= deadline => return Ok(None),
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => return Err(RenderError::Browser(format!("waiting for browser: {}", e))),
        }
    }
}

impl PageRenderer for BrowserRenderer {
    fn render(&self, url: &str) -> Result<RenderedPage, RenderError> {
        logging::debug(
            Component::Render,
            None,
            &format!("{} --dump-dom {}", self.browser_path, url),
        );

        let mut child = Command::new(&self.browser_path)
            .args(self.args(url))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RenderError::Browser(format!("{}: {}", self.browser_path, e)))?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = match wait_until(&mut child, Instant::now() + self.timeout)? {
            Some(status) => status,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(RenderError::Browser(format!(
                    "timed out after {}s rendering {}",
                    self.timeout.as_secs(),
                    url
                )));
            }
        };

        let stdout = stdout.join().unwrap_or_default();
        let stderr = stderr.join().unwrap_or_default();

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr);
            return Err(RenderError::Browser(format!(
                "exited with {}: {}",
                status,
                stderr.trim()
            )));
        }

        let html = String::from_utf8_lossy(&stdout);
        page::extract(&html)
    }
}
