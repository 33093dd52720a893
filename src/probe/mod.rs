use crate::config::ProbeConfig;
use crate::error::{error_chain, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{redirect, Client};
use std::io::Write;

const BROWSER_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const BROWSER_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Result of a single HEAD request: the status code, or why no response came back.
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub id: u64,
    pub url: String,
    pub result: std::result::Result<u16, String>,
}

impl ProbeOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    /// Renders the outcome as exactly one line, without the trailing newline.
    pub fn render(&self, format: OutputFormat) -> String {
        match format {
            OutputFormat::Text => match &self.result {
                Ok(status) => format!("{}: {}", self.id, status),
                Err(message) => format!("{}: error: {}", self.id, message),
            },
            OutputFormat::Json => {
                let value = match &self.result {
                    Ok(status) => serde_json::json!({
                        "id": self.id,
                        "url": self.url,
                        "status": status,
                    }),
                    Err(message) => serde_json::json!({
                        "id": self.id,
                        "url": self.url,
                        "error": message,
                    }),
                };
                value.to_string()
            }
        }
    }
}

pub struct Prober {
    client: Client,
    config: ProbeConfig,
    accept_invalid_certs: bool,
}

impl Prober {
    /// Redirects are not followed: a 3xx is the endpoint's answer.
    pub fn new(config: ProbeConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(BROWSER_ACCEPT));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(BROWSER_ACCEPT_LANGUAGE));

        let accept_invalid_certs = config.accepts_invalid_certs();
        if accept_invalid_certs {
            tracing::warn!("TLS certificate verification is disabled for this run");
        }

        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .redirect(redirect::Policy::none())
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()?;

        Ok(Self {
            client,
            config,
            accept_invalid_certs,
        })
    }

    pub fn accepts_invalid_certs(&self) -> bool {
        self.accept_invalid_certs
    }

    pub async fn probe_one(&self, id: u64) -> ProbeOutcome {
        let url = self.config.url_for(id);
        tracing::debug!("HEAD {}", url);

        let result = match self.client.head(&url).send().await {
            Ok(response) => Ok(response.status().as_u16()),
            Err(e) => Err(describe_request_error(&e)),
        };

        ProbeOutcome { id, url, result }
    }

    /// Probes every configured ID in order, one request at a time, writing a
    /// line per ID as soon as it completes. Only output errors abort the run.
    pub async fn run<W: Write>(&self, out: &mut W, format: OutputFormat) -> Result<Vec<ProbeOutcome>> {
        let mut outcomes = Vec::with_capacity(self.config.ids.len());

        for &id in &self.config.ids {
            let outcome = self.probe_one(id).await;
            writeln!(out, "{}", outcome.render(format))?;
            out.flush()?;
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }
}

fn describe_request_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("timed out ({})", error_chain(err))
    } else {
        error_chain(err)
    }
}
