//! authn - drive an OTP session against a REST backend from the terminal.
//!
//! The session is persisted between invocations, so a passcode can be sent
//! with one command and verified with the next.

mod format;

use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use authn_core::{
    AuthState, AuthView, Config, FileStore, RestAdapter, RestAdapterConfig, SessionMonitor,
};
use format::{format_expiry, format_remaining, mask_identifier};

/// Environment variable overriding the configured REST base URL
const BASE_URL_ENV: &str = "AUTHN_BASE_URL";

const USAGE: &str = "\
Usage: authn <command>

Commands:
  send <identifier>           Send a one-time passcode
  verify <identifier> <code>  Verify a passcode and store the session
  status                      Show the stored session
  logout                      Revoke and forget the stored session
  watch                       Keep the session alive until it ends or Ctrl-C
  config <base_url>           Save the REST base URL to the config file";

enum Command {
    Send { identifier: String },
    Verify { identifier: String, code: String },
    Status,
    Logout,
    Watch,
    SetBaseUrl { base_url: String },
}

impl Command {
    fn parse(args: &[String]) -> Option<Self> {
        match args {
            [cmd, identifier] if cmd == "send" => Some(Command::Send {
                identifier: identifier.clone(),
            }),
            [cmd, identifier, code] if cmd == "verify" => Some(Command::Verify {
                identifier: identifier.clone(),
                code: code.clone(),
            }),
            [cmd] if cmd == "status" => Some(Command::Status),
            [cmd] if cmd == "logout" => Some(Command::Logout),
            [cmd] if cmd == "watch" => Some(Command::Watch),
            [cmd, base_url] if cmd == "config" => Some(Command::SetBaseUrl {
                base_url: base_url.clone(),
            }),
            _ => None,
        }
    }
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = Command::parse(&args) else {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    };

    if let Command::SetBaseUrl { ref base_url } = command {
        return save_base_url(base_url);
    }

    let config = load_config()?;
    let monitor = build_monitor(&config)?;

    let result = run(&monitor, command).await;
    monitor.shutdown().await;
    result
}

fn load_config() -> Result<Config> {
    let mut config = Config::load()?;
    if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
        config.set_base_url(base_url);
    }
    Ok(config)
}

/// Persist the base URL so later runs work without the environment variable
fn save_base_url(base_url: &str) -> Result<()> {
    // Reject a base URL the adapter would refuse
    RestAdapter::new(RestAdapterConfig::new(base_url))?;

    let mut config = Config::load()?;
    config.set_base_url(base_url);
    config.save()?;
    println!("Saved base URL to {}", Config::config_path()?.display());
    Ok(())
}

fn build_monitor(config: &Config) -> Result<SessionMonitor> {
    let rest = config.rest.clone().with_context(|| {
        format!(
            "No REST backend configured; set {}, run `authn config <base_url>` or edit {}",
            BASE_URL_ENV,
            Config::config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| "the config file".to_string())
        )
    })?;
    let adapter = RestAdapter::new(rest)?;
    let store = FileStore::in_dir(config.session_dir()?);
    info!(path = ?store.path(), "Using session file");

    Ok(SessionMonitor::builder(Arc::new(adapter), Arc::new(store))
        .config(config.monitor.clone())
        .build())
}

async fn run(monitor: &SessionMonitor, command: Command) -> Result<()> {
    match command {
        Command::Send { identifier } => {
            monitor.send_otp(&identifier).await?;
            println!("Passcode sent to {}", mask_identifier(&identifier));
        }
        Command::Verify { identifier, code } => {
            monitor.verify_otp(&identifier, &code).await?;
            println!("Signed in as {}", mask_identifier(&identifier));
            print_view(&monitor.view());
        }
        Command::Status => {
            monitor.hydrate().await?;
            print_view(&monitor.view());
        }
        Command::Logout => {
            // An unreadable session store must not prevent logging out
            if let Err(e) = monitor.hydrate().await {
                warn!(error = %e, "Could not load stored session");
            }
            monitor.logout().await;
            println!("Logged out");
        }
        Command::Watch => watch(monitor).await?,
        Command::SetBaseUrl { base_url } => save_base_url(&base_url)?,
    }
    Ok(())
}

async fn watch(monitor: &SessionMonitor) -> Result<()> {
    monitor.hydrate().await?;
    let mut rx = monitor.subscribe();
    print_view(&monitor.view());
    if rx.borrow_and_update().session.is_none() {
        return Ok(());
    }

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state: AuthState = rx.borrow_and_update().clone();
                print_view(&monitor.view());
                if state.session.is_none() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, leaving stored session in place");
                break;
            }
        }
    }
    Ok(())
}

fn print_view(view: &AuthView) {
    println!("status:        {}", view.status);
    println!("authenticated: {}", view.is_authenticated);
    if let Some(ref session) = view.session {
        println!("expires:       {}", format_expiry(session.expires_at));
        if session.expires_at.is_some() {
            println!("remaining:     {}", format_remaining(view.time_remaining_ms));
        }
    }
    if let Some(ref error) = view.error {
        println!("error:         {}", error);
    }
}
