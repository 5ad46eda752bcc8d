// Errors surfaced by configuration handling and Hermes invocations

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building configs or running Hermes
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid chain address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Could not resolve the user home directory")]
    NoHomeDirectory,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Parse(String),

    #[error("Config encode error: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("Hermes extraction failed: {0}")]
    Extraction(String),

    #[error("Unsupported value for flag '{flag}': {value}")]
    UnsupportedFlagType { flag: String, value: String },

    #[error("Failed to launch {}: {source}", .program.display())]
    Launch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Hermes exited with {}: {stderr}", describe_exit(.exit_code))]
    Process {
        /// `None` when the process was terminated by a signal
        exit_code: Option<i32>,
        stderr: String,
    },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "a signal".to_string(),
    }
}

impl Error {
    pub(crate) fn invalid_address(address: &str, reason: impl ToString) -> Self {
        Error::InvalidAddress {
            address: address.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn extraction(reason: impl ToString) -> Self {
        Error::Extraction(reason.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_error_display() {
        let err = Error::Process {
            exit_code: Some(2),
            stderr: "chain not found".to_string(),
        };
        assert_eq!(err.to_string(), "Hermes exited with status 2: chain not found");

        let err = Error::Process {
            exit_code: None,
            stderr: String::new(),
        };
        assert!(err.to_string().contains("a signal"));
    }
}
