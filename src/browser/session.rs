use crate::browser::config::{ConnectionOptions, LaunchOptions};
use crate::dom::TabDocument;
use crate::error::{RelayError, Result};
use crate::prompt::PageContent;
use crate::sites::Destination;
use headless_chrome::{Browser, Tab};
use std::{ffi::OsStr, sync::Arc, time::Duration};

const EXTRACT_CONTENT_JS: &str = include_str!("extract_content.js");

/// Browser session that manages a Chrome/Chromium instance
pub struct BrowserSession {
    browser: Browser,
}

impl BrowserSession {
    /// Launch a new browser instance with the given options
    pub fn launch(options: LaunchOptions) -> Result<Self> {
        let mut launch_opts = headless_chrome::LaunchOptions::default();

        // Chat sites refuse sessions that advertise automation
        launch_opts.ignore_default_args.push(OsStr::new("--enable-automation"));
        launch_opts.args.push(OsStr::new("--disable-blink-features=AutomationControlled"));

        // The serve loop can sit idle for a long time between messages
        launch_opts.idle_browser_timeout = Duration::from_secs(60 * 60);

        launch_opts.headless = options.headless;
        launch_opts.window_size = Some((options.window_width, options.window_height));

        if let Some(path) = options.chrome_path {
            launch_opts.path = Some(path);
        }

        if let Some(dir) = options.user_data_dir {
            launch_opts.user_data_dir = Some(dir);
        }

        launch_opts.sandbox = options.sandbox;

        let browser = Browser::new(launch_opts).map_err(|e| RelayError::LaunchFailed(e.to_string()))?;
        log::info!("Launched browser (headless: {})", options.headless);

        Ok(Self { browser })
    }

    /// Connect to an existing browser instance via WebSocket
    pub fn connect(options: ConnectionOptions) -> Result<Self> {
        let browser = Browser::connect_with_timeout(options.ws_url.clone(), Duration::from_millis(options.timeout))
            .map_err(|e| RelayError::ConnectionFailed(e.to_string()))?;
        log::info!("Connected to browser at {}", options.ws_url);

        Ok(Self { browser })
    }

    /// Get the underlying Browser instance
    pub fn browser(&self) -> &Browser {
        &self.browser
    }

    pub fn new_tab(&self) -> Result<Arc<Tab>> {
        self.browser
            .new_tab()
            .map_err(|e| RelayError::TabOperationFailed(format!("Failed to create tab: {}", e)))
    }

    pub fn get_tabs(&self) -> Result<Vec<Arc<Tab>>> {
        let tabs = self
            .browser
            .get_tabs()
            .lock()
            .map_err(|e| RelayError::TabOperationFailed(format!("Failed to get tabs: {}", e)))?
            .clone();

        Ok(tabs)
    }

    /// Open a URL in a fresh tab and wait for it to load
    pub fn open(&self, url: &str) -> Result<TabDocument> {
        let tab = self.new_tab()?;
        tab.navigate_to(url)
            .map_err(|e| RelayError::NavigationFailed(format!("Failed to navigate to {}: {}", url, e)))?
            .wait_until_navigated()
            .map_err(|e| RelayError::NavigationFailed(format!("Navigation timeout: {}", e)))?;
        log::debug!("Opened {}", url);

        Ok(TabDocument::new(tab))
    }

    /// Open the destination chat page for a prompt
    pub fn open_destination(&self, destination: Destination, prompt: &str) -> Result<TabDocument> {
        log::info!("Opening {}", destination.display_name());
        self.open(&destination.open_url(prompt))
    }

    /// Readable text of a page, with navigation, ads and other chrome stripped
    pub fn extract_content(&self, document: &TabDocument) -> Result<PageContent> {
        let result = document
            .tab()
            .evaluate(EXTRACT_CONTENT_JS, false)
            .map_err(|e| RelayError::EvaluationFailed(e.to_string()))?;

        let json_str: String = result
            .value
            .and_then(|v| v.as_str().map(String::from))
            .ok_or_else(|| RelayError::EvaluationFailed("No content returned from page".to_string()))?;

        let content: PageContent = serde_json::from_str(&json_str)?;
        log::debug!("Extracted {} chars from {}", content.text.chars().count(), content.url);
        Ok(content)
    }

    /// Close every tab; the browser process exits when the session is dropped
    pub fn close(&self) -> Result<()> {
        for tab in self.get_tabs()? {
            if let Err(e) = tab.close(false) {
                log::debug!("Failed to close tab: {}", e);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_options_builder() {
        let opts = LaunchOptions::new().headless(false).window_size(800, 600).sandbox(false);

        assert!(!opts.headless);
        assert_eq!(opts.window_width, 800);
        assert_eq!(opts.window_height, 600);
        assert!(!opts.sandbox);
    }

    #[test]
    fn test_connection_options() {
        let opts = ConnectionOptions::new("ws://localhost:9222").timeout(5000);

        assert_eq!(opts.ws_url, "ws://localhost:9222");
        assert_eq!(opts.timeout, 5000);
    }

    // Integration tests (require Chrome to be installed)
    #[test]
    #[ignore] // Ignore by default, run with: cargo test -- --ignored
    fn test_open_and_extract() {
        let session = BrowserSession::launch(LaunchOptions::new().headless(true)).expect("Failed to launch browser");
        let document = session
            .open("data:text/html,<title>T</title><nav>menu</nav><article>Body text</article>")
            .expect("Failed to open page");

        let content = session.extract_content(&document).expect("Failed to extract");
        assert_eq!(content.title, "T");
        assert!(content.text.contains("Body text"));
        assert!(!content.text.contains("menu"));
    }
}
