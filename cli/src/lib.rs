//! Library entry point for cloudsite-cli components.
//!
//! Exposes the shell's building blocks (parser, value conversion,
//! formatter, session) so integration tests can drive the shell without
//! going through the binary entry point.

pub mod completer;
pub mod config;
pub mod error;
pub mod formatter;
pub mod parser;
pub mod session;
pub mod values;

pub use config::CLIConfiguration;
pub use error::{CLIError, Result};
pub use formatter::{OutputFormat, OutputFormatter};
pub use parser::{Command, CommandParser, Verb};
pub use session::{CLISession, Outcome};
