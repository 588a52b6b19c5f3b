//! prompt-relay command line
//!
//! Each subcommand stands in for one floating action button: it reads the
//! source page, builds the prompt and relays it into the chosen chat site.

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use prompt_relay::capture::{CaptureArea, ScreenCapture, to_data_url};
use prompt_relay::relay::{MultiNotifier, PageAlertNotifier};
use prompt_relay::{
    ActionType, BrowserSession, ConnectionOptions, Consent, Destination, LaunchOptions, LogNotifier, Notifier,
    PromptBuilder, PromptRelay, RelayConfig, RelayReport, RelayRequest, StateStore, TabDocument, TargetRole,
    ToolContext, ToolRegistry, diagnose,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[derive(Parser)]
#[command(name = "prompt-relay")]
#[command(version)]
#[command(about = "Relay page summaries, translations, searches and OCR prompts into AI chat sites", long_about = None)]
struct Cli {
    /// Chat site to relay into: claude or gemini (default: the saved engine)
    #[arg(long, short = 'e', value_name = "ENGINE")]
    engine: Option<Destination>,

    /// Launch browser in headed mode (default: headless)
    #[arg(long, short = 'H')]
    headed: bool,

    /// Path to custom browser executable
    #[arg(long, value_name = "PATH")]
    executable_path: Option<PathBuf>,

    /// WebSocket endpoint URL of an already running browser
    #[arg(long, value_name = "URL")]
    ws_endpoint: Option<String>,

    /// Persistent browser profile directory (use one that is signed in to the chat site)
    #[arg(long, value_name = "DIR")]
    user_data_dir: Option<PathBuf>,

    /// State file (default: <config dir>/prompt-relay/state.json)
    #[arg(long, value_name = "PATH")]
    state: Option<PathBuf>,

    /// JSON file overriding relay timings and limits
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Keep the browser open until Ctrl-C after relaying
    #[arg(long)]
    keep_open: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Summarize a web page
    Summary { url: String },
    /// Translate a web page into the configured language
    Translate { url: String },
    /// Ask for sourced, up-to-date information about a keyword
    Search {
        #[arg(required = true, num_args = 1..)]
        keyword: Vec<String>,
    },
    /// Screenshot a page and ask for its text
    Ocr {
        url: String,
        /// Region to capture: left,top,width,height
        #[arg(long, value_name = "AREA")]
        area: Option<CaptureArea>,
    },
    /// Answer JSON messages on stdin, one per line
    Serve {
        /// Page to use for captureTab/captureArea
        #[arg(long, value_name = "URL")]
        source: Option<String>,
    },
    /// Show what every strategy matches on a page
    Diagnose {
        url: String,
        /// input or send
        #[arg(long, default_value = "input")]
        role: TargetRole,
    },
    /// Show or set the saved engine
    Engine { engine: Option<Destination> },
}

struct App {
    cli_engine: Option<Destination>,
    config: RelayConfig,
    store: Arc<StateStore>,
    options: BrowserOptions,
    keep_open: bool,
}

struct BrowserOptions {
    launch: LaunchOptions,
    ws_endpoint: Option<String>,
}

impl App {
    fn destination(&self) -> anyhow::Result<Destination> {
        match self.cli_engine {
            Some(engine) => Ok(engine),
            None => Ok(self.store.get()?.engine),
        }
    }

    fn session(&self) -> anyhow::Result<BrowserSession> {
        let session = match &self.options.ws_endpoint {
            Some(url) => BrowserSession::connect(ConnectionOptions::new(url.clone()))?,
            None => BrowserSession::launch(self.options.launch.clone())?,
        };
        Ok(session)
    }

    fn relay_for(&self, page: &TabDocument) -> anyhow::Result<PromptRelay> {
        let notifier = MultiNotifier::new()
            .with(Arc::new(LogNotifier))
            .with(Arc::new(PageAlertNotifier::new(page.clone())));
        Ok(PromptRelay::new(self.config.clone(), Arc::new(notifier)).with_store(self.store.clone())?)
    }

    /// Open the destination, give its scripts time to start, then relay
    async fn relay(
        &self,
        session: &BrowserSession,
        prompt: String,
        action: ActionType,
        image: Option<String>,
    ) -> anyhow::Result<RelayReport> {
        let destination = self.destination()?;
        let page = session.open_destination(destination, &prompt)?;
        tokio::time::sleep(self.config.page_load_grace()).await;

        let mut request = RelayRequest::new(prompt, action, destination).authorize(Consent::command_line());
        if let Some(image) = image {
            request = request.with_image(image);
        }

        let relay = self.relay_for(&page)?;
        Ok(relay.relay(&page, request).await)
    }

    async fn finish(&self, session: BrowserSession, report: RelayReport) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(&report)?);

        if self.keep_open {
            eprintln!("Relay finished; press Ctrl-C to close the browser");
            tokio::signal::ctrl_c().await?;
        }
        session.close()?;

        if let Some(kind) = report.error_kind {
            bail!("relay failed: {}", kind);
        }
        Ok(())
    }

    async fn page_action(&self, url: &str, action: ActionType) -> anyhow::Result<()> {
        let session = self.session()?;
        let source = session.open(url)?;
        let content = session.extract_content(&source)?;

        let builder = PromptBuilder::new(&self.config);
        let built = match action {
            ActionType::Translate => builder.translate(&content),
            _ => builder.summary(&content),
        };
        let prompt = match built {
            Ok(prompt) => prompt,
            Err(e) => {
                LogNotifier.notify(&format!("Could not build the {} prompt for {}: {}", action, url, e));
                session.close()?;
                return Err(e.into());
            }
        };

        let report = self.relay(&session, prompt, action, None).await?;
        self.finish(session, report).await
    }

    async fn search(&self, keyword: &str) -> anyhow::Result<()> {
        let prompt = PromptBuilder::new(&self.config).search(keyword)?;
        let session = self.session()?;
        let report = self.relay(&session, prompt, ActionType::Search, None).await?;
        self.finish(session, report).await
    }

    async fn ocr(&self, url: &str, area: Option<CaptureArea>) -> anyhow::Result<()> {
        let session = self.session()?;
        let source = session.open(url)?;
        let png = match area {
            Some(area) => source.capture_area_png(area)?,
            None => source.capture_png()?,
        };

        let screenshot = self
            .store
            .path()
            .with_file_name(format!("ocr-{}.png", unix_timestamp()));
        if let Some(parent) = screenshot.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&screenshot, &png).with_context(|| format!("saving {}", screenshot.display()))?;
        eprintln!("Screenshot saved to {}; attach it in the chat", screenshot.display());

        let prompt = PromptBuilder::new(&self.config).ocr(url);
        let report = self.relay(&session, prompt, ActionType::Ocr, Some(to_data_url(&png))).await?;
        self.finish(session, report).await
    }

    async fn serve(&self, source_url: Option<&str>) -> anyhow::Result<()> {
        let destination = self.destination()?;
        let session = self.session()?;
        let page = session.open(destination.base_url())?;
        let source = source_url.map(|url| session.open(url)).transpose()?;
        tokio::time::sleep(self.config.page_load_grace()).await;

        let relay = self.relay_for(&page)?;
        let registry = ToolRegistry::with_defaults();
        eprintln!("Serving {} ({} actions); one JSON message per line", destination.display_name(), registry.names().join(", "));

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            let response = match serde_json::from_str::<serde_json::Value>(&line) {
                Ok(message) => {
                    let mut context = ToolContext::new(&page, &relay, destination).with_state(&self.store);
                    if let Some(source) = &source {
                        context = context.with_capture(source);
                    }
                    registry.handle_message(message, &mut context).await
                }
                Err(e) => ToolRegistry::malformed_message(&e.to_string()),
            };

            stdout.write_all(format!("{}\n", response).as_bytes()).await?;
            stdout.flush().await?;
        }

        session.close()?;
        Ok(())
    }

    async fn diagnose(&self, url: &str, role: TargetRole) -> anyhow::Result<()> {
        let destination = self.destination()?;
        let session = self.session()?;
        let page = session.open(url)?;
        tokio::time::sleep(self.config.page_load_grace()).await;

        let reports = diagnose(&page, &destination.strategies(role));
        println!("{}", serde_json::to_string_pretty(&reports)?);
        session.close()?;
        Ok(())
    }

    fn engine(&self, engine: Option<Destination>) -> anyhow::Result<()> {
        let state = match engine {
            Some(engine) => self.store.update(|state| state.engine = engine)?,
            None => self.store.get()?,
        };
        println!("{} ({})", state.engine, state.engine.display_name());
        Ok(())
    }
}

/// Seconds since the epoch, for unique screenshot names
fn unix_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => RelayConfig::from_file(path).with_context(|| format!("loading {}", path.display()))?,
        None => RelayConfig::default(),
    };

    let state_path = match cli.state.clone().or_else(StateStore::default_path) {
        Some(path) => path,
        None => bail!("no config directory on this system; pass --state"),
    };
    let store = Arc::new(StateStore::open(state_path)?);

    let mut launch = LaunchOptions::new().headless(!cli.headed);
    if let Some(path) = cli.executable_path.clone() {
        launch = launch.chrome_path(path);
    }
    if let Some(dir) = cli.user_data_dir.clone() {
        launch = launch.user_data_dir(dir);
    }

    let app = App {
        cli_engine: cli.engine,
        config,
        store,
        options: BrowserOptions { launch, ws_endpoint: cli.ws_endpoint.clone() },
        keep_open: cli.keep_open,
    };

    match cli.command {
        Command::Summary { url } => app.page_action(&url, ActionType::Summary).await,
        Command::Translate { url } => app.page_action(&url, ActionType::Translate).await,
        Command::Search { keyword } => app.search(&keyword.join(" ")).await,
        Command::Ocr { url, area } => app.ocr(&url, area).await,
        Command::Serve { source } => app.serve(source.as_deref()).await,
        Command::Diagnose { url, role } => app.diagnose(&url, role).await,
        Command::Engine { engine } => app.engine(engine),
    }
}
