use crate::args::Cli;
use cloudsite_cli::config::AuthConfig;
use cloudsite_cli::{CLIConfiguration, CLIError, CLISession, OutputFormat, OutputFormatter, Result};
use cloudsite_link::{LinkTimeouts, Session};

/// Build timeouts configuration from CLI arguments and the config file
fn build_timeouts(cli: &Cli, config: &CLIConfiguration) -> LinkTimeouts {
    if cli.fast_timeouts {
        return LinkTimeouts::fast();
    }
    if cli.relaxed_timeouts {
        return LinkTimeouts::relaxed();
    }

    let defaults = LinkTimeouts::default();
    let request_timeout = cli.timeout.unwrap_or(config.resolved_site().timeout);
    LinkTimeouts::builder()
        .connection_timeout_secs(
            cli.connection_timeout
                .unwrap_or(defaults.connection_timeout.as_secs()),
        )
        .request_timeout_secs(request_timeout)
        .build()
}

fn required(value: Option<String>, flag: &str, key: &str) -> Result<String> {
    value.ok_or_else(|| {
        CLIError::ConfigurationError(format!("missing {} (or '{}' in the config file)", flag, key))
    })
}

/// Resolve every setting (flags first, then the config file) and build the
/// shell. The schema is not loaded yet.
pub fn create_session(cli: &Cli, config: &CLIConfiguration) -> Result<CLISession> {
    let site = config.resolved_site();
    let ui = config.resolved_ui();
    let pool = config.resolved_pool();
    let file_auth = config.resolved_auth();

    let format = if cli.json {
        OutputFormat::Json
    } else if cli.csv {
        OutputFormat::Csv
    } else if let Some(format) = cli.format {
        format
    } else {
        ui.format.parse()?
    };
    let color = ui.color && !cli.no_color;
    let truncate = ui.truncate && !cli.no_truncate;

    let url = required(cli.url.clone().or(site.url), "--url", "site.url")?;
    let customer_id = required(
        cli.customer_id.clone().or(site.customer_id),
        "--customer-id",
        "site.customer_id",
    )?;
    let site_id = required(cli.site_id.clone().or(site.site_id), "--site-id", "site.site_id")?;

    let auth = AuthConfig {
        api_key: cli.api_key.clone().or(file_auth.api_key),
        email: cli.email.clone().or(file_auth.email),
        password: cli.password.clone().or(file_auth.password),
    };

    let mut builder = Session::builder()
        .base_url(url)
        .customer_id(customer_id)
        .site_id(site_id)
        .max_workers(cli.max_workers.unwrap_or(pool.max_workers))
        .timeouts(build_timeouts(cli, config));
    if let Some(key) = auth.api_key.clone() {
        builder = builder.api_key(key);
    }
    let session = builder.build()?;
    log::info!("Site session for {}", session.api_base());

    Ok(CLISession::new(
        session,
        OutputFormatter::new(format, color, truncate),
        color,
        auth,
    ))
}
