use crate::error::{Error, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_PROBE_TEMPLATE: &str =
	"https://www.nuovabibliotecamanoscritta.it/Generale/BibliotecaDigitale/caricaVolumi.html?codice={id}";
pub const DEFAULT_PROBE_IDS: [u64; 5] = [12, 14, 15, 16, 17];
pub const DEFAULT_INSTALLER_URL: &str =
	"https://github.com/evb0110/mss-downloader/releases/latest/download/MSS-Downloader-Setup.exe";
pub const DEFAULT_MANUAL_URL: &str = "https://github.com/evb0110/mss-downloader/releases/latest";
const DEFAULT_USER_AGENT: &str =
	"Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const ID_PLACEHOLDER: &str = "{id}";

/// Verona hosts whose certificate chains fail verification.
const INVALID_CERT_HOSTS: [&str; 2] = ["nuovabibliotecamanoscritta.it", "nbm.regione.veneto.it"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
	pub probe: ProbeConfig,
	pub installer: InstallerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
	/// Endpoint URL with an `{id}` placeholder
	pub url_template: String,
	pub ids: Vec<u64>,
	pub timeout_secs: u64,
	pub user_agent: String,
	/// Skip TLS certificate verification for every host
	pub accept_invalid_certs: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallerConfig {
	pub download_url: String,
	/// Page opened by "Manual Download"
	pub manual_url: String,
	pub user_agent: String,
}

impl Default for ProbeConfig {
	fn default() -> Self {
		Self {
			url_template: DEFAULT_PROBE_TEMPLATE.to_string(),
			ids: DEFAULT_PROBE_IDS.to_vec(),
			timeout_secs: 30,
			user_agent: DEFAULT_USER_AGENT.to_string(),
			accept_invalid_certs: false,
		}
	}
}

impl Default for InstallerConfig {
	fn default() -> Self {
		Self {
			download_url: DEFAULT_INSTALLER_URL.to_string(),
			manual_url: DEFAULT_MANUAL_URL.to_string(),
			user_agent: format!("mss-tools/{}", env!("CARGO_PKG_VERSION")),
		}
	}
}

impl Config {
	/// Loads `config.toml` from the platform config directory, or the file
	/// named by `MSS_TOOLS_CONFIG`. A missing file yields the defaults.
	pub fn from_env() -> Result<Self> {
		if let Ok(path) = std::env::var("MSS_TOOLS_CONFIG") {
			let path = PathBuf::from(path);
			if !path.exists() {
				return Err(Error::ConfigError(format!(
					"Config file {} does not exist",
					path.display()
				)));
			}
			return Self::load(&path);
		}

		let project_dirs = ProjectDirs::from("", "", "mss-tools")
			.ok_or_else(|| Error::ConfigError("Could not determine config directory".to_string()))?;
		let path = project_dirs.config_dir().join("config.toml");

		if path.exists() {
			Self::load(&path)
		} else {
			Ok(Self::default())
		}
	}

	pub fn load(path: &Path) -> Result<Self> {
		tracing::debug!("Loading config from {}", path.display());
		let content = std::fs::read_to_string(path)?;
		let config: Config = toml::from_str(&content)?;
		Ok(config)
	}
}

impl ProbeConfig {
	pub fn url_for(&self, id: u64) -> String {
		self.url_template.replace(ID_PLACEHOLDER, &id.to_string())
	}

	pub fn timeout(&self) -> Duration {
		Duration::from_secs(self.timeout_secs)
	}

	/// True when asked to, or when the template points at a host known to
	/// serve a broken certificate chain.
	pub fn accepts_invalid_certs(&self) -> bool {
		if self.accept_invalid_certs {
			return true;
		}
		let url = self.url_template.replace(ID_PLACEHOLDER, "0");
		reqwest::Url::parse(&url)
			.ok()
			.and_then(|url| url.host_str().map(str::to_string))
			.is_some_and(|host| {
				INVALID_CERT_HOSTS
					.iter()
					.any(|known| host == *known || host.ends_with(&format!(".{}", known)))
			})
	}

	pub fn validate(&self) -> Result<()> {
		if self.ids.is_empty() {
			return Err(Error::ConfigError("No IDs to probe".to_string()));
		}
		if !self.url_template.contains(ID_PLACEHOLDER) {
			return Err(Error::ConfigError(format!(
				"URL template must contain {}: {}",
				ID_PLACEHOLDER, self.url_template
			)));
		}
		if self.timeout_secs == 0 {
			return Err(Error::ConfigError("Timeout must be at least one second".to_string()));
		}
		check_http_url(&self.url_for(self.ids[0]))
	}
}

impl InstallerConfig {
	pub fn validate(&self) -> Result<()> {
		check_http_url(&self.download_url)?;
		check_http_url(&self.manual_url)
	}
}

fn check_http_url(url: &str) -> Result<()> {
	let parsed = reqwest::Url::parse(url)
		.map_err(|e| Error::ConfigError(format!("Invalid URL {}: {}", url, e)))?;
	match parsed.scheme() {
		"http" | "https" => Ok(()),
		other => Err(Error::ConfigError(format!(
			"Unsupported URL scheme '{}' in {}",
			other, url
		))),
	}
}
