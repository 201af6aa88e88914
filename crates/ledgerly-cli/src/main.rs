//! Ledgerly shell - a terminal front-end for the Ledgerly API.
//!
//! Restores the previous session on startup, then reads commands from
//! stdin. Every request goes through the session layer, so an expired
//! access token is refreshed transparently.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ledgerly_core::api::ApiRequest;
use ledgerly_core::auth::BootstrapOutcome;
use ledgerly_core::{Config, RouteDecision, SessionManager};

const HELP: &str = "\
Commands:
  login [email]     Sign in
  register          Create an account
  logout            Sign out
  whoami            Show the current session
  go <path>         Navigate to a page (asks you to sign in if needed)
  get <path>        Send an authenticated GET and print the response
  help              Show this help
  quit              Exit";

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

struct Shell {
    config: Config,
    session: SessionManager,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();
    info!("Ledgerly shell starting");

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "Failed to load config, using defaults");
            Config::default().with_env_overrides()
        }
    };
    let session = SessionManager::new(&config).context("Failed to create HTTP client")?;
    let mut shell = Shell { config, session };

    eprintln!("Restoring session...");
    match shell.session.bootstrap().wait().await {
        BootstrapOutcome::Restored(user) => println!("Welcome back, {}.", user.display_name()),
        BootstrapOutcome::Unauthenticated => println!("Not signed in. Type `login` to sign in."),
        BootstrapOutcome::Cancelled => println!("Session restore was cancelled."),
        BootstrapOutcome::Superseded => println!("Session changed while restoring; keeping the current one."),
    }

    // One-shot mode: `ledgerly get /invoices`
    let args: Vec<String> = std::env::args().skip(1).collect();
    if !args.is_empty() {
        return shell.dispatch(&args.join(" ")).await.map(|_| ());
    }

    println!("{}", HELP);
    let stdin = io::stdin();
    loop {
        print!("ledgerly> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        match shell.dispatch(line.trim()).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => eprintln!("Error: {:#}", e),
        }
    }

    info!("Ledgerly shell shutting down");
    Ok(())
}

impl Shell {
    /// Run one command. Returns `false` when the shell should exit.
    async fn dispatch(&mut self, line: &str) -> Result<bool> {
        let mut parts = line.split_whitespace();
        let command = parts.next().unwrap_or_default();
        let arg = parts.next();

        match command {
            "" => {}
            "login" => self.login(arg).await?,
            "register" => self.register().await?,
            "logout" => {
                self.session.sign_out().await;
                println!("Signed out.");
            }
            "whoami" => self.whoami(),
            "go" => self.go(arg.context("usage: go <path>")?).await?,
            "get" => self.get(arg.context("usage: get <path>")?).await?,
            "help" => println!("{}", HELP),
            "quit" | "exit" => return Ok(false),
            other => println!("Unknown command `{}`. Type `help`.", other),
        }
        Ok(true)
    }

    async fn login(&mut self, email: Option<&str>) -> Result<()> {
        let email = match email {
            Some(e) => e.to_string(),
            None => prompt_with_default("Email", self.config.last_email.as_deref())?,
        };
        let password = rpassword::prompt_password("Password: ")?;

        match self.session.sign_in(&email, &password).await {
            Ok(user) => {
                println!("Signed in as {}.", user.display_name());
                self.config.last_email = Some(email);
                if let Err(e) = self.config.save() {
                    warn!(error = %e, "Failed to save config");
                }
                self.resume().await
            }
            Err(e) => {
                println!("{}", e.user_message());
                Ok(())
            }
        }
    }

    async fn register(&mut self) -> Result<()> {
        let name = prompt("Name")?;
        let email = prompt("Email")?;
        let password = rpassword::prompt_password("Password: ")?;

        match self.session.sign_up(&name, &email, &password).await {
            Ok(user) => {
                println!("Account created. Signed in as {}.", user.display_name());
                self.resume().await
            }
            Err(e) => {
                println!("{}", e.user_message());
                Ok(())
            }
        }
    }

    /// Continue to the page the user wanted before signing in
    async fn resume(&self) -> Result<()> {
        if let Some(path) = self.session.replay_redirect() {
            println!("Continuing to {}", path);
            self.get(&path).await?;
        }
        Ok(())
    }

    fn whoami(&self) {
        let session = self.session.snapshot();
        match session.user {
            Some(user) => {
                println!("{} <{}> ({})", user.display_name(), user.email, user.role);
                if !user.is_email_verified {
                    println!("Email address not verified.");
                }
                if let Some(at) = session.authenticated_at {
                    println!("Token issued {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
                }
            }
            None => println!("Not signed in."),
        }
        if let Some(path) = session.redirect_path {
            println!("Pending redirect: {}", path);
        }
    }

    async fn go(&self, path: &str) -> Result<()> {
        match self.session.navigate(path) {
            RouteDecision::Proceed => self.get(path).await,
            RouteDecision::Wait => {
                println!("Still signing in, try again in a moment.");
                Ok(())
            }
            RouteDecision::RedirectToSignIn(route) => {
                println!("Sign in required ({}). Type `login`; you'll be returned to {}.", route, path);
                Ok(())
            }
        }
    }

    async fn get(&self, path: &str) -> Result<()> {
        let response = self
            .session
            .client()
            .execute(ApiRequest::get(path))
            .await
            .with_context(|| format!("GET {} failed", path))?;

        println!("{}", response.status);
        match serde_json::from_str::<serde_json::Value>(&response.body) {
            Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
            Err(_) => println!("{}", response.body),
        }

        if response.is_unauthorized() {
            println!("Your session has expired. Type `login` to sign in again.");
            self.session.set_redirect_path(path);
        }
        Ok(())
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn prompt_with_default(label: &str, default: Option<&str>) -> Result<String> {
    let Some(default) = default else {
        return prompt(label);
    };
    let input = prompt(&format!("{} [{}]", label, default))?;
    if input.is_empty() {
        Ok(default.to_string())
    } else {
        Ok(input)
    }
}
