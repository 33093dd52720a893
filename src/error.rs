use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
	#[error("Configuration error: {0}")]
	ConfigError(String),
	#[error("HTTP client error: {0}")]
	HttpError(#[from] reqwest::Error),
	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),
	#[error("Serialization error: {0}")]
	SerializationError(String),
	#[error("Prompt failed: {0}")]
	PromptError(String),
}

impl From<toml::de::Error> for Error {
	fn from(err: toml::de::Error) -> Self {
		Error::SerializationError(err.to_string())
	}
}

impl From<inquire::InquireError> for Error {
	fn from(err: inquire::InquireError) -> Self {
		Error::PromptError(err.to_string())
	}
}

pub type Result<T> = std::result::Result<T, Error>;

/// Flattens an error and its sources into one line, e.g.
/// `error sending request: connection refused`.
pub fn error_chain(err: &dyn std::error::Error) -> String {
	let mut message = err.to_string();
	let mut source = err.source();
	while let Some(inner) = source {
		let text = inner.to_string();
		if !message.contains(&text) {
			message.push_str(": ");
			message.push_str(&text);
		}
		source = inner.source();
	}
	message
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn error_chain_appends_sources() {
		let inner = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused");
		let outer = Error::IoError(inner);
		assert_eq!(error_chain(&outer), "IO error: connection refused");
	}

	#[test]
	fn toml_errors_become_serialization_errors() {
		let err: Error = toml::from_str::<toml::Table>("not = [valid").unwrap_err().into();
		assert!(matches!(err, Error::SerializationError(_)));
	}
}
