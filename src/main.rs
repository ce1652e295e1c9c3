//! azure-oauth2 - command line host for the Azure AD OAuth2 client.
//!
//! Owns the collaborators the client depends on: configuration, the credential
//! store, and logging.

#![deny(clippy::all)]

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use azure_oauth2::auth::token::{format_duration, time_until_expiry};
use azure_oauth2::auth::{OAuth2Client, TokenResponse};
use azure_oauth2::bearer::ensure_bearer_token;
use azure_oauth2::config::Config;
use azure_oauth2::store::{keys, CredentialStore, FileStore};

#[derive(Parser)]
#[command(name = "azure-oauth2", version, about = "Azure AD OAuth2 authorization code client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Request an authorization code from the provider and store it.
    Authorize,
    /// Sign in through the browser and store the resulting tokens.
    Login {
        /// Print the sign-in URL instead of opening a browser.
        #[arg(long)]
        no_browser: bool,
    },
    /// Exchange an authorization code for tokens.
    Exchange {
        /// Authorization code. Defaults to the stored one.
        #[arg(long, env = "AZURE_AUTHORIZATION_CODE", hide_env_values = true)]
        code: Option<String>,
    },
    /// Refresh the stored access token.
    Refresh,
    /// Acquire an app-only bearer token with the client credentials grant.
    Bearer {
        /// Fetch a new token even if one is stored.
        #[arg(long)]
        force: bool,
    },
    /// Show the remaining lifetime of the stored access token.
    Status,
    /// Remove stored tokens.
    Logout,
}

#[tokio::main]
async fn main() {
    // Load .env file (if present) before anything else
    if let Err(e) = dotenvy::dotenv() {
        // .env file is optional - only log if it's not a "file not found" error
        if !e.not_found() {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            eprintln!("\nPlease set the following environment variables:");
            eprintln!("  AZURE_CLIENT_ID=<your-azure-ad-client-id>");
            eprintln!("  AZURE_TENANT_ID=<your-tenant-id>");
            eprintln!("  AZURE_CLIENT_SECRET=<your-client-secret>");
            std::process::exit(1);
        }
    };

    init_logging(&config.logging.level);
    info!("Starting azure-oauth2 v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(cli.command, config).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing/logging.
fn init_logging(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(io::stderr)
        .init();
}

async fn run(command: Command, config: Config) -> Result<()> {
    let store: Arc<dyn CredentialStore> = match &config.store.path {
        Some(path) => Arc::new(FileStore::new(path)),
        None => Arc::new(FileStore::default_location()?),
    };

    if let Command::Status = command {
        return status(store.as_ref());
    }
    if let Command::Logout = command {
        return logout(store.as_ref());
    }

    let client_config = config
        .client_config(store.as_ref())
        .context("Failed to build client configuration")?;
    let client = OAuth2Client::with_http(client_config, &config.transport_options())
        .context("Failed to create OAuth client")?;

    match command {
        Command::Authorize => authorize(&client, store.as_ref()).await,
        Command::Login { no_browser } => login(&client, store.as_ref(), no_browser).await,
        Command::Exchange { code } => exchange(&client, store.as_ref(), code).await,
        Command::Refresh => refresh(&client, store.as_ref()).await,
        Command::Bearer { force } => {
            let token = ensure_bearer_token(&client, store.as_ref(), force).await?;
            if token.was_fetched() {
                println!("Fetched and stored a new bearer token.");
            } else {
                println!("A bearer token is already stored. Use --force to fetch a new one.");
            }
            Ok(())
        }
        Command::Status | Command::Logout => Ok(()),
    }
}

async fn authorize(client: &OAuth2Client, store: &dyn CredentialStore) -> Result<()> {
    let code = client.get_authorization_code().await?;
    store.set(keys::AUTHORIZATION_CODE, code.as_str())?;
    println!("Authorization code received and stored. Run `azure-oauth2 exchange` next.");
    Ok(())
}

async fn login(client: &OAuth2Client, store: &dyn CredentialStore, no_browser: bool) -> Result<()> {
    let (url, state) = client.authorization_url()?;

    if no_browser || open::that(url.as_str()).is_err() {
        println!("Open this URL to sign in:\n{}", url);
    } else {
        println!("Opening browser for authentication...");
    }

    print!("Paste the full URL you were redirected to: ");
    io::stdout().flush()?;
    let mut callback = String::new();
    io::stdin()
        .lock()
        .read_line(&mut callback)
        .context("Failed to read redirect URL")?;

    let code = client.complete_authorization(callback.trim(), state)?;
    let token = client.get_access_token(code.as_str()).await?;
    save_tokens(store, &token)?;

    println!("Signed in. {}", describe_expiry(store));
    Ok(())
}

async fn exchange(
    client: &OAuth2Client,
    store: &dyn CredentialStore,
    code: Option<String>,
) -> Result<()> {
    let code = match code {
        Some(code) => code,
        None => store
            .require(keys::AUTHORIZATION_CODE)
            .context("No authorization code given or stored")?
            .as_str()
            .to_string(),
    };

    let token = client.get_access_token(&code).await?;
    // Codes are single-use
    store.delete(keys::AUTHORIZATION_CODE)?;
    save_tokens(store, &token)?;

    println!("Tokens stored. {}", describe_expiry(store));
    Ok(())
}

async fn refresh(client: &OAuth2Client, store: &dyn CredentialStore) -> Result<()> {
    let refresh_token = store
        .require(keys::REFRESH_TOKEN)
        .context("No refresh token found, sign in first")?;

    let token = match client.refresh_access_token(refresh_token.as_str()).await {
        Ok(token) => token,
        Err(e) if e.requires_sign_in() => {
            logout(store)?;
            return Err(e).context("Stored session is no longer valid, sign in again");
        }
        Err(e) => return Err(e.into()),
    };
    save_tokens(store, &token)?;

    println!("Token refreshed. {}", describe_expiry(store));
    Ok(())
}

/// Persist tokens, keeping the old refresh token when none was issued.
fn save_tokens(store: &dyn CredentialStore, token: &TokenResponse) -> Result<()> {
    store.set(keys::ACCESS_TOKEN, token.access_token.as_str())?;

    if let Some(refresh_token) = &token.refresh_token {
        store.set(keys::REFRESH_TOKEN, refresh_token.as_str())?;
    }

    match token.expires_at(Utc::now()) {
        Some(expires_at) => store.set(keys::TOKEN_EXPIRY, &expires_at.to_rfc3339())?,
        None => store.delete(keys::TOKEN_EXPIRY)?,
    }

    info!("Tokens saved to credential store");
    Ok(())
}

fn describe_expiry(store: &dyn CredentialStore) -> String {
    let expiry = store.get(keys::TOKEN_EXPIRY).ok().flatten();
    match expiry.as_ref().and_then(|e| time_until_expiry(e.as_str())) {
        Some(remaining) => format!("Access token expires in {}.", format_duration(remaining)),
        None if expiry.is_some() => "Access token has expired.".to_string(),
        None => "Access token expiry is unknown.".to_string(),
    }
}

fn status(store: &dyn CredentialStore) -> Result<()> {
    if store.get(keys::ACCESS_TOKEN)?.is_none() {
        println!("Not signed in.");
        return Ok(());
    }

    println!("Signed in. {}", describe_expiry(store));
    if store.get(keys::REFRESH_TOKEN)?.is_some() {
        println!("A refresh token is stored.");
    }
    Ok(())
}

fn logout(store: &dyn CredentialStore) -> Result<()> {
    for key in keys::SESSION {
        store.delete(key)?;
    }
    println!("Stored tokens removed.");
    Ok(())
}
