use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "mss-tools")]
#[command(version, about = "Manifest endpoint probe and installer helper for MSS Downloader", long_about = None)]
pub struct Cli {
	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Send a HEAD request to the manifest endpoint for each ID and print the status
	Probe {
		/// ID to probe (can be specified multiple times; replaces the configured list)
		#[arg(long = "id")]
		ids: Vec<u64>,

		/// URL template with an {id} placeholder
		#[arg(long, env = "MSS_TOOLS_PROBE_TEMPLATE")]
		template: Option<String>,

		/// Per-request timeout in seconds
		#[arg(long)]
		timeout: Option<u64>,

		/// Print one JSON object per line instead of plain text
		#[arg(long)]
		json: bool,

		/// Accept invalid TLS certificates from any host
		#[arg(long)]
		insecure: bool,
	},

	/// Download the installer, run it, and report the result
	Install {
		/// Installer download URL
		#[arg(long, env = "MSS_TOOLS_INSTALLER_URL")]
		url: Option<String>,

		/// Page opened by "Manual Download"
		#[arg(long, env = "MSS_TOOLS_MANUAL_URL")]
		manual_url: Option<String>,

		/// Start installing right away instead of showing the menu
		#[arg(short, long)]
		yes: bool,
	},
}
