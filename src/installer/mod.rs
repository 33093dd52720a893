pub mod app;
pub mod terminal;
pub mod worker;

pub use app::{InstallerApp, Outcome};
pub use terminal::TerminalFrontend;
