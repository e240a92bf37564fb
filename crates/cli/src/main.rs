mod config;
mod output;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};
use tradedesk_api::HttpBackend;
use tradedesk_core::*;
use tradedesk_data::JsonFileSessionStorage;
use tradedesk_engine::{AuthError, MutationOutcome, RefreshOutcome, SyncEngine};

use crate::config::AppConfig;

#[derive(Parser)]
#[command(name = "tradedesk")]
#[command(about = "Trading account client — sign in, watch accounts and trades, manage MT5 accounts")]
#[command(version)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    /// Path to the TOML config file
    #[arg(short, long, env = "TRADEDESK_CONFIG")]
    config: Option<PathBuf>,

    /// Backend base URL (overrides the config file)
    #[arg(long, env = "TRADEDESK_API_URL")]
    base_url: Option<String>,

    /// Session file (overrides the config file)
    #[arg(long, env = "TRADEDESK_SESSION_FILE")]
    session_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and remember the session
    Login {
        /// Account email
        #[arg(short, long, required_unless_present_any = ["google_token", "facebook_token"])]
        email: Option<String>,

        /// Account password
        #[arg(short, long, env = "TRADEDESK_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Sign in with a Google ID token instead
        #[arg(long, conflicts_with_all = ["email", "facebook_token"])]
        google_token: Option<String>,

        /// Sign in with a Facebook access token instead
        #[arg(long, conflicts_with = "email")]
        facebook_token: Option<String>,
    },

    /// Create a user. Without --otp a verification code is emailed first.
    Register {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "TRADEDESK_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Code received by email
        #[arg(long)]
        otp: Option<String>,

        #[arg(long)]
        phone: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Show the signed-in user and profile completeness
    Whoami,

    /// Update profile fields
    Profile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        address: Option<String>,
        /// National ID / passport number
        #[arg(long)]
        id_number: Option<String>,
        /// Date of birth (YYYY-MM-DD)
        #[arg(long)]
        date_of_birth: Option<String>,
    },

    /// Change the password of the signed-in user
    ChangePassword {
        #[arg(long)]
        current: String,
        #[arg(long)]
        new: String,
    },

    /// Reset a forgotten password. Without --otp a reset code is emailed first.
    ResetPassword {
        #[arg(short, long)]
        email: String,
        #[arg(long)]
        otp: Option<String>,
        #[arg(long, requires = "otp")]
        new_password: Option<String>,
    },

    /// Refresh once and print every account with its open trades
    Accounts {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Print closed trades across all accounts, newest first
    History {
        /// Only this account
        #[arg(short, long)]
        account: Option<i64>,

        #[arg(long)]
        json: bool,
    },

    /// Keep refreshing until Ctrl-C
    Watch,

    /// Link a new MT5 account
    AddAccount {
        /// Display name
        #[arg(long)]
        name: Option<String>,

        /// MT5 login number
        #[arg(short, long)]
        login: i64,

        /// MT5 password
        #[arg(short, long, env = "TRADEDESK_MT5_PASSWORD", hide_env_values = true)]
        password: String,

        /// Server ID known to the backend
        #[arg(long, required_unless_present = "server_name")]
        server_id: Option<i64>,

        /// MT5 server name (e.g. "MetaQuotes-Demo")
        #[arg(long)]
        server_name: Option<String>,

        /// Risk per trade in percent (0-10)
        #[arg(long, default_value = "1")]
        risk: Decimal,

        /// Strategy: "All", "FVG + Trend" or "Voting"
        #[arg(long, default_value = "All")]
        strategy: String,
    },

    /// Unlink an account
    RemoveAccount {
        /// Account ID
        id: i64,
    },

    /// Close an open trade
    CloseTrade {
        /// MT5 ticket number
        ticket: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_overrides(cli.base_url, cli.session_file);

    let backend = Arc::new(
        HttpBackend::new(config.api.clone()).context("Failed to create HTTP client")?,
    );
    let session_file = config.session_file()?;
    let storage = Arc::new(JsonFileSessionStorage::new(&session_file));
    let engine = SyncEngine::new(backend, storage, config.sync.clone());

    tracing::debug!(
        base_url = %config.api.base_url,
        session_file = %session_file.display(),
        "Configured"
    );

    match cli.command {
        Commands::Login {
            email,
            password,
            google_token,
            facebook_token,
        } => {
            let result = if let Some(token) = google_token {
                engine.auth.sign_in_with_google(&token).await
            } else if let Some(token) = facebook_token {
                engine.auth.sign_in_with_facebook(&token).await
            } else {
                let email = email.unwrap_or_default();
                let password = password.context("--password (or TRADEDESK_PASSWORD) is required")?;
                engine.auth.sign_in(&email, &password).await
            };
            let session = auth_result(result, "Login failed")?;
            println!("Signed in as {} <{}>", session.display_name, session.email_address);
            if !session.is_profile_complete() {
                println!("Your profile is incomplete: run `tradedesk profile` to finish it.");
            }
        }
        Commands::Register {
            name,
            email,
            password,
            otp,
            phone,
        } => match otp {
            None => {
                let message = auth_result(engine.auth.send_otp(&email, &name).await, "Failed to send OTP")?;
                println!("{message}");
                println!("Re-run with --otp <code> to finish registering.");
            }
            Some(otp) => {
                let password = password.context("--password (or TRADEDESK_PASSWORD) is required")?;
                let request = RegisterRequest {
                    name,
                    email,
                    password,
                    otp,
                    phone_number: phone,
                    ..Default::default()
                };
                let session = auth_result(engine.auth.register(&request).await, "Registration failed")?;
                println!("Registered and signed in as {}", session.display_name);
            }
        },
        Commands::Logout => {
            engine.session.restore().await;
            engine.sign_out().await;
            println!("Signed out.");
        }
        Commands::Whoami => match engine.session.restore().await {
            Some(session) => print!("{}", output::profile(&session)),
            None => println!("Not signed in."),
        },
        Commands::Profile {
            name,
            phone,
            address,
            id_number,
            date_of_birth,
        } => {
            require_session(&engine).await?;
            let update = ProfileUpdate {
                display_name: name,
                phone,
                address,
                id_document_number: id_number,
                date_of_birth,
            };
            let session = auth_result(engine.auth.update_profile(&update).await, "Profile update failed")?;
            print!("{}", output::profile(&session));
        }
        Commands::ChangePassword { current, new } => {
            require_session(&engine).await?;
            let message = auth_result(
                engine.auth.change_password(&current, &new).await,
                "Failed to change password",
            )?;
            println!("{message}");
        }
        Commands::ResetPassword {
            email,
            otp,
            new_password,
        } => {
            let result = match (otp, new_password) {
                (Some(otp), Some(new_password)) => {
                    engine.auth.reset_password(&email, &otp, &new_password).await
                }
                (Some(_), None) => bail!("--new-password is required with --otp"),
                (None, _) => engine.auth.forgot_password(&email).await,
            };
            println!("{}", auth_result(result, "Password reset failed")?);
        }
        Commands::Accounts { json } => {
            require_session(&engine).await?;
            refresh_or_bail(&engine).await?;
            let snapshot = engine.aggregator.snapshot();
            if json {
                let open: Vec<&Trade> = snapshot
                    .accounts
                    .iter()
                    .flat_map(|a| snapshot.trades_for(a.id))
                    .collect();
                let value = serde_json::json!({
                    "refreshed_at": snapshot.refreshed_at,
                    "accounts": snapshot.accounts,
                    "open_trades": open,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                print!("{}", output::dashboard(&snapshot));
            }
        }
        Commands::History { account, json } => {
            require_session(&engine).await?;
            refresh_or_bail(&engine).await?;
            let trades = match account {
                Some(id) => engine.aggregator.history_for(id),
                None => engine.aggregator.all_history(),
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&trades)?);
            } else {
                print!("{}", output::history(&trades));
            }
        }
        Commands::Watch => watch(&engine).await?,
        Commands::AddAccount {
            name,
            login,
            password,
            server_id,
            server_name,
            risk,
            strategy,
        } => {
            require_session(&engine).await?;
            let strategy = TradingStrategy::parse(&strategy).with_context(|| {
                format!("Unknown strategy {strategy:?} (expected \"All\", \"FVG + Trend\" or \"Voting\")")
            })?;
            let draft = AccountDraft {
                name,
                login_number: Some(login),
                password,
                server_id,
                server_name,
                risk_percentage: risk,
                strategy,
            };
            report(engine.gateway.add_account(&draft).await)?;
        }
        Commands::RemoveAccount { id } => {
            require_session(&engine).await?;
            report(engine.gateway.remove_account(id).await)?;
        }
        Commands::CloseTrade { ticket } => {
            require_session(&engine).await?;
            report(engine.gateway.close_trade(ticket).await)?;
        }
    }

    Ok(())
}

async fn require_session(engine: &SyncEngine) -> Result<Session> {
    match engine.session.restore().await {
        Some(session) if session.token().is_some() => Ok(session),
        _ => bail!("Not signed in: run `tradedesk login` first"),
    }
}

async fn refresh_or_bail(engine: &SyncEngine) -> Result<()> {
    match engine.aggregator.refresh(false).await {
        RefreshOutcome::Refreshed { failed_accounts, .. } => {
            if failed_accounts > 0 {
                eprintln!("warning: trades for {failed_accounts} account(s) could not be loaded");
            }
            Ok(())
        }
        RefreshOutcome::Failed { message } => bail!(message),
        RefreshOutcome::NoSession => bail!("Not signed in: run `tradedesk login` first"),
        RefreshOutcome::Busy => Ok(()),
    }
}

async fn watch(engine: &SyncEngine) -> Result<()> {
    if engine.start().await.is_none() {
        bail!("Not signed in: run `tradedesk login` first");
    }
    let mut snapshots = engine.aggregator.subscribe();
    let mut events = engine.subscribe_events();
    println!("Watching accounts (Ctrl-C to stop)...");

    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                print!("{}", output::dashboard(&snapshot));
            }
            event = events.recv() => {
                if let Ok(SyncEvent::Session(SessionEvent::Cleared)) = event {
                    println!("Session ended.");
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
        }
        if !engine.aggregator.is_polling() {
            println!("Polling stopped.");
            break;
        }
    }

    engine.aggregator.stop_polling();
    Ok(())
}

fn auth_result<T>(result: Result<T, AuthError>, fallback: &str) -> Result<T> {
    result.map_err(|e| anyhow::anyhow!(e.user_message(fallback)))
}

fn report(outcome: MutationOutcome) -> Result<()> {
    let text = output::outcome(&outcome);
    if outcome.success {
        print!("{text}");
        Ok(())
    } else {
        bail!("{}", text.trim_end())
    }
}
