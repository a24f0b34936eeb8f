//! Admin API command-line client
//!
//! Single-binary front end for the admin dashboard's REST backend:
//! 1. Loads config (TOML + env overrides)
//! 2. Opens the persisted session (token file with max age)
//! 3. Runs one command through the authenticated client
//! 4. Prints the JSON result on stdout; failures become one error
//!    notification and a non-zero exit

mod cli;
mod config;
mod error;
mod metrics;

use std::io::BufRead;
use std::sync::Arc;

use admin_auth::{FileTokenStore, TokenStore};
use admin_client::{ApiClient, AuthSession, RequestOptions};
use anyhow::{Context, Result};
use clap::Parser;
use common::Secret;
use notifications::{LogSink, NotificationSink};
use serde_json::{Value, json};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Command};
use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // JSON logs on stderr so stdout stays the command's output
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let prometheus = if cli.metrics {
        Some(metrics::install_recorder()?)
    } else {
        None
    };

    let config_path = Config::resolve_path(cli.config_path.as_deref());
    info!(path = %config_path.display(), "loading configuration");
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let store = FileTokenStore::load(config.credentials.token_file.clone(), config.token_max_age())
        .await
        .with_context(|| {
            format!(
                "failed to open session file {}",
                config.credentials.token_file.display()
            )
        })?;
    if let Some(token) = config.access_token.clone() {
        store
            .set_access_token(Some(token))
            .await
            .context("failed to seed session from ADMIN_ACCESS_TOKEN")?;
    }

    let client = ApiClient::new(config.client_config(), Arc::new(store))
        .context("failed to build API client")?;

    let password = if cli.command.needs_password() {
        Some(read_password()?)
    } else {
        None
    };

    let notifier = LogSink;
    let outcome = run(cli.command, &client, password, &notifier).await;

    if let Some(handle) = prometheus {
        eprintln!("{}", handle.render());
    }

    match outcome {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        Err(e) => {
            error!(error = ?e, "command failed");
            eprintln!("{}", e.message());
            std::process::exit(1);
        }
    }
}

/// ADMIN_PASSWORD, or the first line of stdin.
fn read_password() -> Result<Secret<String>> {
    if let Ok(password) = std::env::var("ADMIN_PASSWORD") {
        return Ok(Secret::new(password));
    }
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read password from stdin")?;
    let password = line.trim_end_matches(['\r', '\n']).to_owned();
    if password.is_empty() {
        anyhow::bail!("no password given (set ADMIN_PASSWORD or pipe it on stdin)");
    }
    Ok(Secret::new(password))
}

/// Execute one command. Failures are reported once through `notifier`.
async fn run(
    command: Command,
    client: &ApiClient,
    password: Option<Secret<String>>,
    notifier: &dyn NotificationSink,
) -> admin_client::Result<Value> {
    let result = execute(command, client, password, notifier).await;
    if let Err(e) = &result {
        notifier.notify_error(&e.message());
    }
    result
}

async fn execute(
    command: Command,
    client: &ApiClient,
    password: Option<Secret<String>>,
    notifier: &dyn NotificationSink,
) -> admin_client::Result<Value> {
    let session = AuthSession::new(client.clone());
    let password = || {
        password
            .clone()
            .ok_or_else(|| admin_client::Error::InvalidRequest("password required".into()))
    };

    match command {
        Command::Login { email } => {
            let user = session.login(&email, password()?).await?;
            notifier.notify_success("Signed in");
            Ok(json!({ "user": user }))
        }
        Command::Register { name, email } => {
            let user = session.register(&name, &email, password()?).await?;
            notifier.notify_success("Account created");
            Ok(json!({ "user": user }))
        }
        Command::Logout => {
            session.logout().await?;
            notifier.notify_success("Signed out");
            Ok(json!({ "signedOut": true }))
        }
        Command::Me => {
            let user = session.fetch_me().await?;
            Ok(json!({ "user": user }))
        }
        Command::Request {
            method,
            path,
            body,
            query,
            no_auth,
        } => {
            let mut options = RequestOptions::new(method).query_payload(query);
            options.body = body;
            if no_auth {
                options = options.skip_auth();
            }
            client.request(&path, options).await
        }
    }
}
