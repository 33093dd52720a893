mod cli;
mod config;
mod error;
mod installer;
mod probe;
#[cfg(test)]
mod test_support;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands};
use config::Config;
use installer::{InstallerApp, Outcome, TerminalFrontend};
use probe::{OutputFormat, Prober};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env().context("Failed to load configuration")?;

    match cli.command {
        Commands::Probe {
            ids,
            template,
            timeout,
            json,
            insecure,
        } => {
            if !ids.is_empty() {
                config.probe.ids = ids;
            }
            if let Some(template) = template {
                config.probe.url_template = template;
            }
            if let Some(timeout) = timeout {
                config.probe.timeout_secs = timeout;
            }
            if insecure {
                config.probe.accept_invalid_certs = true;
            }
            config.probe.validate()?;

            let format = if json {
                OutputFormat::Json
            } else {
                OutputFormat::Text
            };

            tracing::info!(
                "Probing {} IDs against {}",
                config.probe.ids.len(),
                config.probe.url_template
            );
            let prober = Prober::new(config.probe).context("Failed to build HTTP client")?;

            let mut stdout = std::io::stdout();
            let outcomes = prober
                .run(&mut stdout, format)
                .await
                .context("Failed to write probe output")?;

            let answered = outcomes.iter().filter(|o| o.is_ok()).count();
            tracing::info!(
                "Done: {} answered, {} failed",
                answered,
                outcomes.len() - answered
            );

            Ok(ExitCode::SUCCESS)
        }

        Commands::Install {
            url,
            manual_url,
            yes,
        } => {
            if let Some(url) = url {
                config.installer.download_url = url;
            }
            if let Some(manual_url) = manual_url {
                config.installer.manual_url = manual_url;
            }
            config.installer.validate()?;

            let app = InstallerApp::new(config.installer, yes)
                .context("Failed to build HTTP client")?;
            let mut frontend = TerminalFrontend::new("MSS Downloader Setup");

            // Installed and failed attempts already showed their own dialog.
            match app.run(&mut frontend).await? {
                Outcome::Installed => Ok(ExitCode::SUCCESS),
                Outcome::Cancelled => {
                    println!("Setup cancelled.");
                    Ok(ExitCode::SUCCESS)
                }
                Outcome::Failed => Ok(ExitCode::FAILURE),
            }
        }
    }
}
