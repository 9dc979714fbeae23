//! Interactive shell session
//!
//! Wraps a [`Session`], turns each parsed [`Command`] into statement calls
//! and renders the outcome with the [`OutputFormatter`]. The shell keeps
//! the little state a conversation needs: login cookies, the configured api
//! key for `KEY`/`NOKEY`, and the last READ so `NEXT` can page through it.

use cloudsite_link::statement::get::{
    ENTITY_ID_PARAM, EXPAND_RELATIONS_PARAM, LIMIT_PARAM, PAGE_STATE_PARAM,
};
use cloudsite_link::{GetStatement, Resource, ResultSet, Session, Statement};
use colored::*;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{CompletionType, Config, EditMode, Editor, Helper};
use serde_json::Value as JsonValue;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::{
    completer::AutoCompleter,
    config::AuthConfig,
    error::{CLIError, Result},
    formatter::{OutputFormat, OutputFormatter},
    parser::{Command, CommandParser, Verb},
    values,
};

/// Shell spelling of the expand option
const EXPAND_OPTION: &str = "_expand";
/// Shell option selecting a secondary view
const VIEW_OPTION: &str = "_view";

/// Grace period given to in-flight work on EXIT
const EXIT_GRACE: Duration = Duration::from_secs(30);

const HISTORY_FILE: &str = "~/.cloudsite/history";

/// What the caller should do after a command
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Print this and keep reading commands
    Output(String),
    Exit,
}

/// Interactive shell state
pub struct CLISession {
    session: Session,
    parser: CommandParser,
    formatter: OutputFormatter,
    color: bool,

    /// Key to restore on `KEY`
    api_key: Option<String>,

    /// Account used by `LOGIN` and `REGISTER`
    email: Option<String>,
    password: Option<String>,

    /// Session cookies from the last `LOGIN`; preferred over the api key
    cookies: Vec<String>,

    /// Last READ, kept for `NEXT`
    last_read: Option<GetStatement>,
}

impl CLISession {
    /// Create a shell over an already built (not yet initialized) session
    pub fn new(session: Session, formatter: OutputFormatter, color: bool, auth: AuthConfig) -> Self {
        let api_key = auth.api_key.or_else(|| session.api_key());
        Self {
            session,
            parser: CommandParser::new(),
            formatter,
            color,
            api_key,
            email: auth.email,
            password: auth.password,
            cookies: Vec::new(),
            last_read: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_logged_in(&self) -> bool {
        !self.cookies.is_empty()
    }

    /// Load the site schema
    pub async fn connect(&self) -> Result<()> {
        self.session.init().await?;
        Ok(())
    }

    /// Parse and run one command line
    pub async fn execute(&mut self, line: &str) -> Result<Outcome> {
        let command = self.parser.parse(line)?;
        log::debug!("Executing command: {:?}", command);
        self.execute_command(command).await
    }

    pub async fn execute_command(&mut self, command: Command) -> Result<Outcome> {
        let output = match command {
            Command::Statement {
                verb,
                application,
                resource,
                params,
            } => {
                let resource = self.session.resource(&application, &resource)?;
                match verb {
                    Verb::Read => self.read(&resource, &params).await?,
                    _ => self.write(verb, &resource, &params).await?,
                }
            }
            Command::Next => self.next_page().await?,
            Command::Help => Self::help_text(),
            Command::Exit => {
                if !self.session.close(EXIT_GRACE).await {
                    log::warn!("Pending statements did not finish before exit");
                }
                return Ok(Outcome::Exit);
            }
            Command::Login => self.login().await?,
            Command::Logout => self.logout().await?,
            Command::Register => self.register().await?,
            Command::Refresh => self.refresh().await?,
            Command::Key => {
                let key = self.api_key.clone().ok_or_else(|| {
                    CLIError::ConfigurationError("no api key configured (auth.api_key)".into())
                })?;
                self.session.set_api_key(Some(key));
                "api key enabled".to_string()
            }
            Command::NoKey => {
                self.session.set_api_key(None);
                "api key disabled".to_string()
            }
            Command::SetTruncate(on) => {
                self.formatter.set_truncate(on);
                format!("truncate {}", if on { "on" } else { "off" })
            }
            Command::SetFormat(name) => {
                let format: OutputFormat = name.parse()?;
                self.formatter.set_format(format);
                format!("format {}", name)
            }
            Command::Apps => self.apps()?,
            Command::Describe {
                application,
                resource,
            } => {
                let resource = self.session.resource(&application, &resource)?;
                self.formatter.format_describe(&resource)
            }
            Command::Unknown(keyword) => {
                return Err(CLIError::ParseError(format!(
                    "Unknown command '{}'. Type HELP for the command list",
                    keyword
                )))
            }
        };
        Ok(Outcome::Output(output))
    }

    /// Build a READ from shell parameters. Read options are mapped to the
    /// statement's typed setters; everything else is a key or filter.
    fn build_read(resource: &Arc<Resource>, params: &[(String, String)]) -> Result<GetStatement> {
        let mut read = match params.iter().rev().find(|(name, _)| name == VIEW_OPTION) {
            Some((_, view)) => resource.get_view(view)?,
            None => resource.get(),
        };

        for (name, raw) in params {
            match name.as_str() {
                VIEW_OPTION => {}
                LIMIT_PARAM => {
                    let limit: i64 = raw.trim().parse().map_err(|_| CLIError::ValueError {
                        attribute: name.clone(),
                        value: raw.clone(),
                        expected: "NUMBER_INTEGER".into(),
                    })?;
                    read.limit(limit)?;
                }
                EXPAND_OPTION | EXPAND_RELATIONS_PARAM => {
                    if values::coerce_typed(cloudsite_link::DataType::Boolean, name, raw)?
                        == JsonValue::Bool(true)
                    {
                        read.expand_relations()?;
                    }
                }
                ENTITY_ID_PARAM => {
                    let id = Uuid::parse_str(raw.trim()).map_err(|_| CLIError::ValueError {
                        attribute: name.clone(),
                        value: raw.clone(),
                        expected: "UUID".into(),
                    })?;
                    read.with_id(id)?;
                }
                PAGE_STATE_PARAM => {
                    read.page(raw.clone())?;
                }
                _ => {
                    let value = values::coerce(resource, name, raw)?;
                    read.with_param(name, value)?;
                }
            }
        }
        Ok(read)
    }

    async fn read(&mut self, resource: &Arc<Resource>, params: &[(String, String)]) -> Result<String> {
        let mut read = Self::build_read(resource, params)?;
        self.last_read = None;
        let output = self.run_read(&mut read).await?;
        self.last_read = Some(read);
        Ok(output)
    }

    async fn next_page(&mut self) -> Result<String> {
        let mut read = self
            .last_read
            .take()
            .ok_or_else(|| CLIError::ParseError("NEXT needs a previous READ".into()))?;
        if !read.has_more_pages() {
            self.last_read = Some(read);
            return Err(CLIError::ParseError("no more pages".into()));
        }
        read.next_page()?;
        let output = self.run_read(&mut read).await?;
        self.last_read = Some(read);
        Ok(output)
    }

    async fn run_read(&self, read: &mut GetStatement) -> Result<String> {
        let started = Instant::now();
        let mut result = self.run(read).await?;
        let columns: Vec<String> = result.column_names().into_iter().map(String::from).collect();
        let rows = result.all();
        log::info!(
            "Read {} rows from '{}' in {:?}",
            rows.len(),
            read.resource().name(),
            started.elapsed()
        );

        let mut output = self.formatter.format_rows(&columns, &rows)?;
        if read.has_more_pages() && self.formatter.format() == OutputFormat::Table {
            let hint = "More rows available: type NEXT";
            output.push('\n');
            if self.color {
                output.push_str(&hint.dimmed().to_string());
            } else {
                output.push_str(hint);
            }
        }
        Ok(output)
    }

    async fn write(
        &self,
        verb: Verb,
        resource: &Arc<Resource>,
        params: &[(String, String)],
    ) -> Result<String> {
        let mut coerced = Vec::with_capacity(params.len());
        for (name, raw) in params {
            coerced.push((name.clone(), values::coerce(resource, name, raw)?));
        }

        let result = match verb {
            Verb::Create => {
                let mut statement = resource.create();
                statement.with_params(coerced)?;
                self.run(&mut statement).await?
            }
            Verb::Update => {
                let mut statement = resource.save();
                statement.with_params(coerced)?;
                self.run(&mut statement).await?
            }
            Verb::Delete => {
                let mut statement = resource.delete();
                statement.with_params(coerced)?;
                self.run(&mut statement).await?
            }
            Verb::Read => {
                return Err(CLIError::ParseError("READ is not a write statement".into()))
            }
        };

        Ok(self
            .formatter
            .format_applied(&verb.to_string(), resource.name(), result.was_applied()))
    }

    /// Execute with the login cookies when present, otherwise with the api key
    async fn run<S: Statement>(&self, statement: &mut S) -> Result<ResultSet> {
        let result = if self.cookies.is_empty() {
            self.session.execute(statement).await?
        } else {
            self.session
                .execute_with_cookies(statement, &self.cookies)
                .await?
        };
        Ok(result)
    }

    fn account(&self) -> Result<(String, String)> {
        match (&self.email, &self.password) {
            (Some(email), Some(password)) => Ok((email.clone(), password.clone())),
            _ => Err(CLIError::ConfigurationError(
                "auth.email and auth.password must be configured".into(),
            )),
        }
    }

    async fn login(&mut self) -> Result<String> {
        let (email, password) = self.account()?;
        self.cookies = self.session.login(&email, &password).await?;
        Ok(format!("logged in as {}", email))
    }

    async fn logout(&mut self) -> Result<String> {
        if self.cookies.is_empty() {
            return Err(CLIError::ParseError("not logged in".into()));
        }
        self.session.logout(&self.cookies).await?;
        self.cookies.clear();
        Ok("logged out".to_string())
    }

    async fn register(&self) -> Result<String> {
        let (email, password) = self.account()?;
        self.session.register(&email, &password).await?;
        Ok(format!("registered {}", email))
    }

    async fn refresh(&mut self) -> Result<String> {
        if self.cookies.is_empty() {
            return Err(CLIError::ParseError("not logged in".into()));
        }
        self.cookies = self.session.refresh(&self.cookies).await?;
        Ok("session refreshed".to_string())
    }

    fn apps(&self) -> Result<String> {
        let schema = self.session.schema()?;
        let apps: Vec<(String, Vec<String>)> = schema
            .applications()
            .map(|app| {
                (
                    app.name().to_string(),
                    app.resource_names().into_iter().map(String::from).collect(),
                )
            })
            .collect();
        Ok(self.formatter.format_apps(&apps))
    }

    fn help_text() -> String {
        [
            "Statements:",
            "  CREATE <app> <resource> name=value ...",
            "  READ   <app> <resource> [name=value ...] [_limit=N] [_expand=true] [eid=ID] [_view=NAME] [pageState=CURSOR]",
            "  UPDATE <app> <resource> name=value ...",
            "  DELETE <app> <resource> name=value ...",
            "",
            "Commands:",
            "  NEXT                       next page of the last READ",
            "  APPS                       list applications and resources",
            "  DESCRIBE <app> <resource>  show attributes and views",
            "  LOGIN | LOGOUT | REFRESH   session cookies for the configured account",
            "  REGISTER                   register the configured account",
            "  KEY | NOKEY                send or stop sending the api key",
            "  SET TRUNCATE ON|OFF        shorten wide values in tables",
            "  SET FORMAT table|json|csv  output format",
            "  HELP                       this text",
            "  EXIT | QUIT                leave the shell",
            "",
            "Quote values containing spaces: firstName=\"Ann Lee\"",
        ]
        .join("\n")
    }

    fn completer(&self) -> AutoCompleter {
        let mut completer = AutoCompleter::new();
        if let Ok(schema) = self.session.schema() {
            for app in schema.applications() {
                completer.set_resources(
                    app.name().to_string(),
                    app.resource_names().into_iter().map(String::from).collect(),
                );
                for resource in app.resources() {
                    completer.set_attributes(
                        app.name().to_string(),
                        resource.name().to_string(),
                        resource
                            .all_attribute_names()
                            .into_iter()
                            .map(String::from)
                            .collect(),
                    );
                }
            }
        }
        completer
    }

    fn prompt(&self) -> String {
        let mode = if self.is_logged_in() {
            "user"
        } else if self.session.api_key().is_some() {
            "key"
        } else {
            "anon"
        };
        if self.color && cfg!(not(target_os = "windows")) {
            format!("{}({})> ", "cloudsite".bright_blue().bold(), mode.cyan())
        } else {
            format!("cloudsite({})> ", mode)
        }
    }

    fn print_banner(&self) {
        println!();
        println!("{}", "cloudsite shell".bright_blue().bold());
        println!(
            "  {}",
            format!("Connected to: {}", self.session.api_base()).cyan()
        );
        println!("  {}", format!("Site: {}", self.session.site_id()).cyan());
        println!("  {}", "Type HELP for commands, EXIT to quit".dimmed());
        println!();
    }

    /// Read-eval-print loop. Command errors are printed and the loop goes
    /// on; Ctrl-C clears the line and Ctrl-D exits.
    pub async fn run_interactive(&mut self) -> Result<()> {
        if let Err(e) = self.connect().await {
            eprintln!("{} {}", "Connection failed:".red().bold(), e);
            return Err(e);
        }
        self.print_banner();

        let config = Config::builder()
            .completion_type(CompletionType::List)
            .edit_mode(EditMode::Emacs)
            .auto_add_history(true)
            .build();
        let mut rl = Editor::<CLIHelper, DefaultHistory>::with_config(config)?;
        rl.set_helper(Some(CLIHelper {
            completer: self.completer(),
        }));

        let history_path = history_path();
        if rl.load_history(&history_path).is_err() {
            log::debug!("No history at {}", history_path.display());
        }

        loop {
            match rl.readline(&self.prompt()) {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match self.execute(&line).await {
                        Ok(Outcome::Output(output)) => println!("{}", output),
                        Ok(Outcome::Exit) => break,
                        Err(e) => eprintln!("{} {}", "ERROR".red().bold(), e),
                    }
                }
                Err(rustyline::error::ReadlineError::Interrupted) => continue,
                Err(rustyline::error::ReadlineError::Eof) => {
                    self.session.close(EXIT_GRACE).await;
                    break;
                }
                Err(e) => return Err(e.into()),
            }
        }

        if let Some(parent) = history_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        if let Err(e) = rl.save_history(&history_path) {
            log::warn!("Failed to save history: {}", e);
        }
        println!("Goodbye!");
        Ok(())
    }

    /// Run commands one per line, stopping at the first failure or EXIT.
    /// Blank lines and lines starting with `#` are skipped.
    pub async fn execute_batch(&mut self, script: &str) -> Result<()> {
        self.connect().await?;
        for line in script.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match self.execute(line).await? {
                Outcome::Output(output) => println!("{}", output),
                Outcome::Exit => return Ok(()),
            }
        }
        self.session.close(EXIT_GRACE).await;
        Ok(())
    }
}

fn history_path() -> PathBuf {
    crate::config::expand_config_path(std::path::Path::new(HISTORY_FILE))
}

/// rustyline helper providing schema-aware completion
struct CLIHelper {
    completer: AutoCompleter,
}

impl Completer for CLIHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        self.completer.complete(line, pos, ctx)
    }
}

impl Hinter for CLIHelper {
    type Hint = String;
}

impl Highlighter for CLIHelper {}

impl Validator for CLIHelper {}

impl Helper for CLIHelper {}
