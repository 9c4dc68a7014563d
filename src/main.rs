use anyhow::{Context, Result};
use dialoguer::Password;

use mirim_auth::config::{Command, Config};
use mirim_auth::{ApiError, AuthContext};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (for log level)
    let (config, command) = Config::load()?;
    config.validate()?;

    // Initialize logging with a configured level
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(api_url = %config.api_url, "Mirim Auth starting");

    let context = AuthContext::new(&config)?;
    let result = run(&context, command).await;
    context.dispose();

    result
}

async fn run(context: &AuthContext, command: Command) -> Result<()> {
    match command {
        Command::Login { nickname, password } => login(context, &nickname, password).await,
        Command::Logout => logout(context).await,
        Command::Whoami => whoami(context).await,
        Command::Clients => {
            let clients = context
                .oauth_clients()
                .list()
                .await
                .map_err(login_hint)?;
            if clients.is_empty() {
                println!("No OAuth clients registered");
            }
            for client in clients {
                println!(
                    "{:<36}  {}  ({})",
                    client.client_id, client.service_name, client.service_domain
                );
            }
            Ok(())
        }
        Command::Notices { all } => {
            let notices = context.notices().list(all).await.map_err(login_hint)?;
            if notices.is_empty() {
                println!("No notices");
            }
            for notice in notices {
                let marker = if notice.is_active { " " } else { "x" };
                println!("[{}] #{:<4} {}", marker, notice.id, notice.title);
            }
            Ok(())
        }
    }
}

async fn login(context: &AuthContext, nickname: &str, password: Option<String>) -> Result<()> {
    let password = match password {
        Some(password) => password,
        None => Password::new()
            .with_prompt(format!("Password for {}", nickname))
            .interact()
            .context("Failed to read password")?,
    };

    let tokens = context.auth().login(nickname, &password).await?;
    let session = context.session();
    session.login(&tokens.access_token, tokens.refresh_token.as_deref(), None)?;

    match session.refresh_user().await {
        Ok(user) => println!("Logged in as {} ({})", user.nickname, user.email),
        Err(e) => {
            tracing::warn!("Logged in but profile fetch failed: {}", e);
            println!("Logged in as {}", nickname);
        }
    }
    Ok(())
}

async fn logout(context: &AuthContext) -> Result<()> {
    if let Some(notify) = context.session().logout()? {
        notify
            .await
            .context("Server logout notification task failed")?;
    }
    println!("Logged out");
    Ok(())
}

async fn whoami(context: &AuthContext) -> Result<()> {
    let session = context.session();
    let Some(profile_fetch) = session.initialize() else {
        println!("Not logged in");
        return Ok(());
    };

    profile_fetch
        .await
        .context("Profile fetch task failed")?;

    if !session.is_authenticated() {
        println!("Session expired, log in again");
        return Ok(());
    }

    match session.user() {
        Some(user) => {
            println!("{} <{}>", user.nickname, user.email);
            println!("  role:  {}", user.role);
            if let Some(major) = user.major {
                println!("  major: {}", major);
            }
            if user.is_admin {
                println!("  admin");
            }
            Ok(())
        }
        None => anyhow::bail!("Could not load profile, see logs for details"),
    }
}

/// Turn a missing session into an actionable message
fn login_hint(error: ApiError) -> anyhow::Error {
    if error.requires_login() {
        anyhow::anyhow!("Not logged in ({}). Run `mirim-auth login <nickname>` first", error)
    } else {
        error.into()
    }
}
