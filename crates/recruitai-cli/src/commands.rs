//! Command parsing and handlers.

use std::io::{self, Write};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use recruitai_core::auth::session::{LOGIN_FAILED_MESSAGE, SIGNUP_FAILED_MESSAGE};
use recruitai_core::auth::SignupForm;
use recruitai_core::config::StorageBackend;
use recruitai_core::routes::{nav_links, Route};
use recruitai_core::utils::{age_display, mask_token};
use recruitai_core::{Config, Profile, SessionState};
use tracing::warn;

pub const USAGE: &str = "\
Usage: recruitai <command>

Commands:
  login [identifier]   Sign in with a username or email
  signup               Create a new account
  me                   Show your profile
  status               Show session and storage details
  logout               Forget the stored session
  help                 Show this message

Environment:
  RECRUITAI_API_BASE   API base URL (default http://localhost:8080/api)
  RUST_LOG             Log filter (default warn)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login { identifier: Option<String> },
    Signup,
    Logout,
    Me,
    Status,
    Help,
}

impl Command {
    pub fn parse(args: &[String]) -> Result<Self, String> {
        let (name, rest) = match args.split_first() {
            Some((name, rest)) => (name.as_str(), rest),
            None => return Ok(Command::Help),
        };

        let command = match name {
            "login" => Command::Login {
                identifier: rest.first().cloned(),
            },
            "signup" => Command::Signup,
            "logout" => Command::Logout,
            "me" | "profile" => Command::Me,
            "status" => Command::Status,
            "help" | "-h" | "--help" => Command::Help,
            other => return Err(format!("Unknown command: {}", other)),
        };

        let max_args = if matches!(command, Command::Login { .. }) { 1 } else { 0 };
        if rest.len() > max_args {
            return Err(format!("Too many arguments for `{}`", name));
        }
        Ok(command)
    }
}

pub async fn run(command: Command, session: &SessionState, config: &mut Config) -> Result<()> {
    match command {
        Command::Login { identifier } => login(session, config, identifier).await,
        Command::Signup => signup(session).await,
        Command::Logout => {
            session.logout().context("Failed to clear stored credentials")?;
            println!("Logged out.");
            Ok(())
        }
        Command::Me => me(session).await,
        Command::Status => status(session, config).await,
        Command::Help => {
            println!("{}", USAGE);
            Ok(())
        }
    }
}

async fn login(session: &SessionState, config: &mut Config, identifier: Option<String>) -> Result<()> {
    let identifier = match identifier {
        Some(identifier) => identifier,
        None => prompt("Username or email", config.last_identifier.as_deref())?,
    };
    let password = rpassword::prompt_password("Password: ").context("Failed to read password")?;

    let profile = match session.login(&identifier, &password).await {
        Ok(profile) => profile,
        Err(e) => bail!(e.user_message(LOGIN_FAILED_MESSAGE)),
    };

    config.last_identifier = Some(identifier.trim().to_string());
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save last identifier");
    }

    println!("Signed in as {} ({}).", profile.username, profile.role);
    Ok(())
}

async fn signup(session: &SessionState) -> Result<()> {
    let form = SignupForm {
        username: prompt("Username", None)?,
        email: prompt("Email", None)?,
        password: rpassword::prompt_password("Password: ").context("Failed to read password")?,
        confirm: rpassword::prompt_password("Confirm password: ")
            .context("Failed to read password")?,
    };
    if let Err(errors) = form.validate() {
        bail!(errors.to_string());
    }

    match session.signup(&form.username, &form.email, &form.password).await {
        Ok(profile) => {
            println!("Account created. Signed in as {}.", profile.username);
            Ok(())
        }
        Err(e) => bail!(e.user_message(SIGNUP_FAILED_MESSAGE)),
    }
}

async fn me(session: &SessionState) -> Result<()> {
    session
        .restore()
        .await
        .context("Failed to read stored credentials")?;

    match (Route::Profile.guard(session), session.user()) {
        (Route::Profile, Some(profile)) => {
            print!("{}", render_profile(&profile));
            Ok(())
        }
        _ => bail!("Not signed in. Run `recruitai login` first."),
    }
}

async fn status(session: &SessionState, config: &Config) -> Result<()> {
    let store = session.client().credential_store();
    let credentials = store.get().context("Failed to read stored credentials")?;

    println!("API:            {}", config.api_base);
    println!("Storage:        {}", storage_name(config.storage));
    println!("Access token:   {}", mask_token(&credentials.access_token));
    println!("Refresh token:  {}", mask_token(&credentials.refresh_token));
    if let Some(updated_at) = store.updated_at().context("Failed to read stored credentials")? {
        println!("Updated:        {}", age_display(updated_at, Utc::now()));
    }

    session
        .restore()
        .await
        .context("Failed to read stored credentials")?;
    match session.user() {
        Some(profile) => println!("Signed in as:   {} ({})", profile.username, profile.role),
        None => println!("Signed in as:   nobody"),
    }

    let links: Vec<&str> = nav_links(session.is_authenticated())
        .iter()
        .map(|r| r.title())
        .collect();
    println!("Available:      {}", links.join(", "));
    Ok(())
}

fn storage_name(backend: StorageBackend) -> &'static str {
    match backend {
        StorageBackend::File => "file",
        StorageBackend::Keyring => "keyring",
        StorageBackend::Memory => "memory (not persisted)",
    }
}

pub fn render_profile(profile: &Profile) -> String {
    format!(
        "My Profile\n\
         ID:       {}\n\
         Username: {}\n\
         Email:    {}\n\
         Role:     {}\n",
        profile.id, profile.username, profile.email, profile.role
    )
}

/// Read one line from stdin, offering `default` when the input is empty.
fn prompt(label: &str, default: Option<&str>) -> Result<String> {
    match default {
        Some(default) => print!("{} [{}]: ", label, default),
        None => print!("{}: ", label),
    }
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .with_context(|| format!("Failed to read {}", label.to_lowercase()))?;
    let value = line.trim();

    match (value.is_empty(), default) {
        (true, Some(default)) => Ok(default.to_string()),
        _ => Ok(value.to_string()),
    }
}
