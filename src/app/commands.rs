use anyhow::{Context, Result, anyhow, bail};
use serde_json::Value;
use tokio::sync::mpsc;

use super::context::AppContext;
use crate::domain::{RegisterRequest, Theme, Topic};
use crate::session::{AuthError, SessionEvent};
use crate::stream::StreamStatus;
use crate::utils::epoch_sec_to_utc_string;

/// Console counterpart of the views: each subcommand is one screen's worth of work.
#[derive(clap::Subcommand, Debug, Clone)]
pub enum Command {
    /// Sign in and persist the session.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "PROCURELENS_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account, then sign in.
    Register {
        #[arg(long)]
        email: String,
        #[arg(long, env = "PROCURELENS_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        company: Option<String>,
    },
    /// Show the signed-in user.
    Whoami,
    Logout,
    /// Show plan usage and limits.
    Quota,
    /// List uploaded documents.
    Documents,
    /// Print live events for a topic until Ctrl-C.
    Stream {
        topic: Topic,
        /// JSON object sent as subscription filters.
        #[arg(long)]
        filters: Option<String>,
        /// Stop after this many events.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show or set the theme preference.
    Theme { value: Option<Theme> },
}

pub async fn execute(app: &AppContext, command: Command) -> Result<()> {
    match command {
        Command::Login { email, password } => {
            let user = app
                .session
                .login(&email, &password)
                .await
                .map_err(form_failure)?;
            println!("Signed in as {}", user);
        }
        Command::Register {
            email,
            password,
            name,
            company,
        } => {
            let request = RegisterRequest {
                email,
                password,
                full_name: name,
                company,
            };
            let user = app
                .session
                .register(&request)
                .await
                .map_err(form_failure)?;
            println!("Welcome, {}", user.display_name());
        }
        Command::Whoami => match app.session.current_user() {
            Some(user) => {
                println!("{}", user);
                if let Some(exp) = app.session.access_expiry() {
                    println!("Access token valid until {}", epoch_sec_to_utc_string(exp));
                }
            }
            None => println!("Not signed in."),
        },
        Command::Logout => {
            app.session.logout().await;
            println!("Signed out.");
        }
        Command::Quota => {
            require_session(app)?;
            let quota = app
                .quota
                .refresh_now()
                .await
                .map_err(|e| anyhow!(e.user_message().to_string()))?;
            println!("Plan: {}", quota.tier);
            for (name, usage) in quota.entries() {
                println!("  {:<12} {}", name, usage);
            }
            if let Some(reset_at) = &quota.reset_at {
                println!("Resets at {}", reset_at);
            }
        }
        Command::Documents => {
            require_session(app)?;
            let documents = app
                .session
                .authorized(|api| async move { api.documents().await })
                .await
                .map_err(auth_failure)?;
            println!("{}", serde_json::to_string_pretty(&documents)?);
        }
        Command::Stream {
            topic,
            filters,
            limit,
        } => {
            require_session(app)?;
            let filters = filters
                .map(|raw| serde_json::from_str::<Value>(&raw))
                .transpose()
                .context("--filters must be a JSON object")?;
            follow_stream(app, topic, filters, limit).await?;
        }
        Command::Theme { value: Some(theme) } => {
            app.session.set_theme(theme);
            println!("Theme set to {}", theme);
        }
        Command::Theme { value: None } => println!("{}", app.session.theme()),
    }
    Ok(())
}

fn require_session(app: &AppContext) -> Result<()> {
    if !app.session.state().is_authenticated() {
        bail!("Not signed in. Run `procurelens login` first.");
    }
    Ok(())
}

fn form_failure(error: AuthError) -> anyhow::Error {
    anyhow!(error.form_message())
}

fn auth_failure(error: AuthError) -> anyhow::Error {
    anyhow!(error.user_message())
}

async fn follow_stream(
    app: &AppContext,
    topic: Topic,
    filters: Option<Value>,
    limit: Option<usize>,
) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let subscription = app
        .streams
        .subscribe(topic, filters, move |event| {
            let _ = tx.send(event.to_string());
        })
        .map_err(|e| anyhow!(e.to_string()))?;

    let client = app.streams.client(topic);
    let mut status = client.watch_status();
    let mut session_events = app.session.subscribe_events();
    let mut received = 0usize;

    let outcome = loop {
        tokio::select! {
            Some(line) = rx.recv() => {
                println!("{}", line);
                received += 1;
                if limit.is_some_and(|limit| received >= limit) {
                    break Ok(());
                }
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                if *status.borrow_and_update() == StreamStatus::Failed {
                    let reason = client.last_error().unwrap_or_else(|| "Connection failed".into());
                    break Err(anyhow!(reason));
                }
            }
            Ok(event) = session_events.recv() => {
                if let SessionEvent::Expired { message } = event {
                    break Err(anyhow!(message));
                }
            }
            _ = tokio::signal::ctrl_c() => break Ok(()),
        }
    };

    subscription.unsubscribe();
    client.stop();
    outcome
}
