//! Terminal front end: an `inquire` menu, an `indicatif` spinner while the
//! worker runs, and `console`-styled dialogs.

use crate::error::{Error, Result};
use crate::installer::app::{Action, Frontend};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use inquire::{InquireError, Select};
use std::time::Duration;

pub struct TerminalFrontend {
    title: String,
    spinner: Option<ProgressBar>,
}

impl TerminalFrontend {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            spinner: None,
        }
    }

    fn create_spinner() -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        pb
    }
}

impl Frontend for TerminalFrontend {
    fn choose_action(&mut self) -> Result<Action> {
        let selection = Select::new(&self.title, Action::ALL.to_vec())
            .with_help_message("↑↓ to move, Enter to select, Esc to cancel")
            .prompt();

        match selection {
            Ok(action) => Ok(action),
            // Esc and Ctrl-C close the window
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => {
                Ok(Action::Cancel)
            }
            Err(e) => Err(Error::from(e)),
        }
    }

    fn busy(&mut self, message: &str) {
        let pb = self.spinner.get_or_insert_with(Self::create_spinner);
        pb.set_message(message.to_string());
    }

    fn idle(&mut self) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
    }

    fn hand_over(&mut self, message: &str) {
        self.idle();
        println!("{} {}", style("→").cyan().bold(), message);
    }

    fn show_info(&mut self, title: &str, message: &str) {
        println!();
        println!("{} {}", style("✓").green().bold(), style(title).bold());
        for line in message.lines() {
            println!("  {}", line);
        }
        println!();
    }

    fn show_error(&mut self, title: &str, message: &str) {
        eprintln!();
        eprintln!("{} {}", style("✗").red().bold(), style(title).red().bold());
        for line in message.lines() {
            eprintln!("  {}", line);
        }
        eprintln!();
    }

    fn open_browser(&mut self, url: &str) -> std::io::Result<()> {
        open::that(url)?;
        println!("Opened {} in your browser.", style(url).cyan());
        Ok(())
    }
}

impl Drop for TerminalFrontend {
    fn drop(&mut self) {
        self.idle();
    }
}
