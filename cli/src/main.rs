//! cloudsh - terminal client for cloudsite data services
//!
//! # Usage
//!
//! ```bash
//! # Interactive mode
//! cloudsh -u https://api.example.com --customer-id <UUID> --site-id <UUID> -k <KEY>
//!
//! # Single command, JSON output
//! cloudsh --json -c "READ crm persons pk=A _limit=10"
//!
//! # Command file
//! cloudsh -f commands.txt
//! ```

use clap::Parser;

use cloudsite_cli::{CLIConfiguration, CLIError, Outcome, Result};

mod args;
mod connect;

use args::Cli;
use connect::create_session;

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = CLIConfiguration::load(&cli.config)?;
    let mut session = create_session(&cli, &config)?;

    match (cli.file.as_ref(), cli.command.as_ref()) {
        (Some(file), None) => {
            let script = std::fs::read_to_string(file).map_err(|e| {
                CLIError::FileError(format!("Failed to read {}: {}", file.display(), e))
            })?;
            session.execute_batch(&script).await?;
        }

        (None, Some(command)) => {
            session.connect().await?;
            if let Outcome::Output(output) = session.execute(command).await? {
                println!("{}", output);
            }
            session.session().close_default().await;
        }

        (None, None) => {
            session.run_interactive().await?;
        }

        (Some(_), Some(_)) => {
            return Err(CLIError::ConfigurationError(
                "Cannot specify both --file and --command".into(),
            ));
        }
    }

    Ok(())
}
