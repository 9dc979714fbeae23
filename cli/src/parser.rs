//! Command parser for statement and meta commands
//!
//! Statement commands have the shape
//! `CREATE|READ|UPDATE|DELETE <app> <resource> [name=value ...]`; everything
//! else is a meta command (`HELP`, `LOGIN`, `SET TRUNCATE OFF`, ...).
//! Keywords are case-insensitive and values may be quoted.

use std::fmt;

use crate::error::{CLIError, Result};

/// Statement verbs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Create,
    Read,
    Update,
    Delete,
}

impl Verb {
    fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.to_ascii_uppercase().as_str() {
            "CREATE" => Some(Verb::Create),
            "READ" => Some(Verb::Read),
            "UPDATE" => Some(Verb::Update),
            "DELETE" => Some(Verb::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keyword = match self {
            Verb::Create => "CREATE",
            Verb::Read => "READ",
            Verb::Update => "UPDATE",
            Verb::Delete => "DELETE",
        };
        f.write_str(keyword)
    }
}

/// Parsed command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Statement against one resource
    Statement {
        verb: Verb,
        application: String,
        resource: String,
        /// `name=value` pairs in input order, values still text
        params: Vec<(String, String)>,
    },

    /// Next page of the last READ
    Next,
    Help,
    Exit,
    Login,
    Logout,
    /// Register the configured account
    Register,
    /// Renew the login cookies
    Refresh,
    /// Use the configured api key again
    Key,
    /// Stop sending the api key
    NoKey,
    SetTruncate(bool),
    SetFormat(String),
    Apps,
    Describe {
        application: String,
        resource: String,
    },
    Unknown(String),
}

/// Command parser
pub struct CommandParser;

impl CommandParser {
    /// Create a new parser
    pub fn new() -> Self {
        Self
    }

    /// Parse a command line
    pub fn parse(&self, line: &str) -> Result<Command> {
        let tokens = tokenize(line)?;
        let Some((keyword, args)) = tokens.split_first() else {
            return Err(CLIError::ParseError("Empty command".into()));
        };

        if let Some(verb) = Verb::from_keyword(keyword) {
            return self.parse_statement(verb, args);
        }

        match keyword.to_ascii_uppercase().as_str() {
            "NEXT" => Ok(Command::Next),
            "HELP" | "?" | "\\?" | "\\HELP" => Ok(Command::Help),
            "EXIT" | "QUIT" | "\\Q" | "\\QUIT" => Ok(Command::Exit),
            "LOGIN" => Ok(Command::Login),
            "LOGOUT" => Ok(Command::Logout),
            "REGISTER" => Ok(Command::Register),
            "REFRESH" => Ok(Command::Refresh),
            "KEY" => Ok(Command::Key),
            "NOKEY" => Ok(Command::NoKey),
            "APPS" => Ok(Command::Apps),
            "DESCRIBE" | "\\D" => match args {
                [application, resource] => Ok(Command::Describe {
                    application: application.clone(),
                    resource: resource.clone(),
                }),
                _ => Err(CLIError::ParseError(
                    "DESCRIBE requires <app> <resource>".into(),
                )),
            },
            "SET" => self.parse_set(args),
            _ => Ok(Command::Unknown(keyword.clone())),
        }
    }

    fn parse_statement(&self, verb: Verb, args: &[String]) -> Result<Command> {
        let (application, resource, rest) = match args {
            [application, resource, rest @ ..] => (application, resource, rest),
            _ => {
                return Err(CLIError::ParseError(format!(
                    "{} requires <app> <resource> [name=value ...]",
                    verb
                )))
            }
        };

        let mut params = Vec::with_capacity(rest.len());
        for token in rest {
            let Some((name, value)) = token.split_once('=') else {
                return Err(CLIError::ParseError(format!(
                    "'{}' is not a name=value pair",
                    token
                )));
            };
            if name.is_empty() {
                return Err(CLIError::ParseError(format!(
                    "missing parameter name in '{}'",
                    token
                )));
            }
            params.push((name.to_string(), value.to_string()));
        }

        Ok(Command::Statement {
            verb,
            application: application.clone(),
            resource: resource.clone(),
            params,
        })
    }

    fn parse_set(&self, args: &[String]) -> Result<Command> {
        let [option, value] = args else {
            return Err(CLIError::ParseError(
                "SET requires: TRUNCATE ON|OFF or FORMAT table|json|csv".into(),
            ));
        };
        match option.to_ascii_uppercase().as_str() {
            "TRUNCATE" => match value.to_ascii_uppercase().as_str() {
                "ON" | "TRUE" => Ok(Command::SetTruncate(true)),
                "OFF" | "FALSE" => Ok(Command::SetTruncate(false)),
                _ => Err(CLIError::ParseError(format!(
                    "SET TRUNCATE expects ON or OFF, got '{}'",
                    value
                ))),
            },
            "FORMAT" => Ok(Command::SetFormat(value.to_ascii_lowercase())),
            _ => Err(CLIError::ParseError(format!("Unknown option '{}'", option))),
        }
    }
}

impl Default for CommandParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Split a line on whitespace. Single or double quotes group text that
/// contains spaces (`firstName="Ann Lee"`); a backslash escapes the next
/// character inside quotes.
fn tokenize(line: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;
    let mut chars = line.trim().chars();

    while let Some(c) = chars.next() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) if c == '\\' => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_token = true;
            }
            None if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            None => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if quote.is_some() {
        return Err(CLIError::ParseError("Unterminated quoted value".into()));
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}
