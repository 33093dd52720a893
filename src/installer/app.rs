use crate::config::InstallerConfig;
use crate::error::Result;
use crate::installer::worker::{self, InstallError, InstallEvent};
use reqwest::Client;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Install,
    ManualDownload,
    Cancel,
}

impl Action {
    pub const ALL: [Action; 3] = [Action::Install, Action::ManualDownload, Action::Cancel];
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Install => write!(f, "Install"),
            Action::ManualDownload => write!(f, "Manual Download"),
            Action::Cancel => write!(f, "Cancel"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Installed,
    /// Only returned when running without the menu (`--yes`).
    Failed,
    Cancelled,
}

/// Interface-side half of the installer. Every method runs on the
/// interface task; the worker never touches the front end directly.
pub trait Frontend {
    fn choose_action(&mut self) -> Result<Action>;

    /// Shows (or updates) the indeterminate busy indicator.
    fn busy(&mut self, message: &str);

    fn idle(&mut self);

    /// Stops all redrawing and prints `message`; a child process owns the
    /// terminal until the next `busy` or `idle`.
    fn hand_over(&mut self, message: &str);

    fn show_info(&mut self, title: &str, message: &str);

    fn show_error(&mut self, title: &str, message: &str);

    fn open_browser(&mut self, url: &str) -> std::io::Result<()>;
}

pub struct InstallerApp {
    client: Client,
    config: InstallerConfig,
    assume_yes: bool,
}

impl InstallerApp {
    pub fn new(config: InstallerConfig, assume_yes: bool) -> Result<Self> {
        let client = Client::builder().user_agent(config.user_agent.clone()).build()?;

        Ok(Self {
            client,
            config,
            assume_yes,
        })
    }

    pub async fn run<F: Frontend>(&self, frontend: &mut F) -> Result<Outcome> {
        if self.assume_yes {
            return Ok(match self.attempt(frontend).await {
                Ok(()) => Outcome::Installed,
                Err(_) => Outcome::Failed,
            });
        }

        loop {
            match frontend.choose_action()? {
                Action::Install => {
                    if self.attempt(frontend).await.is_ok() {
                        return Ok(Outcome::Installed);
                    }
                }
                Action::ManualDownload => self.open_manual_download(frontend),
                Action::Cancel => return Ok(Outcome::Cancelled),
            }
        }
    }

    /// One install attempt: spawn the worker, pump its events until it
    /// finishes, then show the matching dialog.
    async fn attempt<F: Frontend>(&self, frontend: &mut F) -> std::result::Result<(), InstallError> {
        let (handle, mut events) =
            worker::spawn_install(self.client.clone(), self.config.download_url.clone());
        frontend.busy("Preparing download...");

        let mut result = Err(InstallError::WorkerGone);
        while let Some(event) = events.recv().await {
            match event {
                InstallEvent::Downloading { url } => frontend.busy(&format!("Downloading {}", url)),
                InstallEvent::Running { path } => {
                    tracing::debug!("Installer saved to {}", path.display());
                    frontend.hand_over("Running installer, follow its prompts...")
                }
                InstallEvent::Finished(finished) => {
                    result = finished;
                    break;
                }
            }
        }
        frontend.idle();

        if let Err(e) = handle.await {
            tracing::error!("Installer task failed: {}", e);
        }

        match &result {
            Ok(()) => frontend.show_info("Installation complete", "MSS Downloader was installed successfully."),
            Err(e) => frontend.show_error(
                "Installation failed",
                &format!(
                    "{}\n\nUse \"Manual Download\" to get the installer from {}",
                    e, self.config.manual_url
                ),
            ),
        }

        result
    }

    fn open_manual_download<F: Frontend>(&self, frontend: &mut F) {
        let url = &self.config.manual_url;
        tracing::info!("Opening {}", url);

        if let Err(e) = frontend.open_browser(url) {
            frontend.show_error(
                "Manual Download",
                &format!("Could not open a browser: {}\n\nOpen {} manually.", e, url),
            );
        }
    }
}
