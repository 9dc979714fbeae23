//! Error types for cloudsite-cli
//!
//! Wraps library errors and adds the shell's own failure kinds, with
//! messages meant to be printed straight to the terminal.

use cloudsite_link::LinkError;
use std::fmt;

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CLIError>;

/// Errors that can occur in the CLI
#[derive(Debug)]
pub enum CLIError {
    /// Error from cloudsite-link
    LinkError(LinkError),

    /// Configuration file or flag error
    ConfigurationError(String),

    /// File I/O error
    FileError(String),

    /// Command could not be understood
    ParseError(String),

    /// Text value could not be converted to the attribute's type
    ValueError {
        attribute: String,
        value: String,
        expected: String,
    },

    /// User cancelled input (Ctrl-C / Ctrl-D)
    Cancelled,

    ReadlineError(String),

    FormatError(String),
}

impl CLIError {
    fn format_link_error(err: &LinkError) -> String {
        match err {
            LinkError::Execution { status, message } => {
                let message = Self::clean_nested_message(message);
                match status {
                    Some(code) => format!("Server error ({}): {}", code, message),
                    None => message,
                }
            }
            LinkError::Configuration(msg) => msg.clone(),
            other => other.to_string(),
        }
    }

    fn clean_nested_message(message: &str) -> String {
        let mut cleaned = message.trim();
        let prefixes = [
            "Execution failed:",
            "service unreachable:",
            "Service unreachable:",
        ];

        loop {
            let mut stripped = false;
            for prefix in &prefixes {
                if let Some(rest) = cleaned.strip_prefix(prefix) {
                    cleaned = rest.trim_start();
                    stripped = true;
                    break;
                }
            }

            if !stripped {
                break;
            }
        }

        cleaned.to_string()
    }
}

impl fmt::Display for CLIError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CLIError::LinkError(e) => write!(f, "{}", Self::format_link_error(e)),
            CLIError::ConfigurationError(msg) => write!(f, "Configuration error: {}", msg),
            CLIError::FileError(msg) => write!(f, "File error: {}", msg),
            CLIError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            CLIError::ValueError {
                attribute,
                value,
                expected,
            } => write!(
                f,
                "'{}' can't be cast to type '{}' for attribute '{}'",
                value, expected, attribute
            ),
            CLIError::Cancelled => write!(f, "Operation cancelled"),
            CLIError::ReadlineError(msg) => write!(f, "Input error: {}", msg),
            CLIError::FormatError(msg) => write!(f, "Format error: {}", msg),
        }
    }
}

impl std::error::Error for CLIError {}

impl From<LinkError> for CLIError {
    fn from(err: LinkError) -> Self {
        CLIError::LinkError(err)
    }
}

impl From<rustyline::error::ReadlineError> for CLIError {
    fn from(err: rustyline::error::ReadlineError) -> Self {
        match err {
            rustyline::error::ReadlineError::Interrupted => CLIError::Cancelled,
            rustyline::error::ReadlineError::Eof => CLIError::Cancelled,
            e => CLIError::ReadlineError(e.to_string()),
        }
    }
}

impl From<std::io::Error> for CLIError {
    fn from(err: std::io::Error) -> Self {
        CLIError::FileError(err.to_string())
    }
}

impl From<toml::de::Error> for CLIError {
    fn from(err: toml::de::Error) -> Self {
        CLIError::ConfigurationError(format!("TOML parse error: {}", err))
    }
}
