//! nkap - command-line client for the nkap tontine and wallet platform.
//!
//! Every command runs through a [`Session`], so a token the server rejects
//! is cleared from the keychain and reported as an expired session.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use nkap_core::api::ApiError;
use nkap_core::auth::{CredentialStore, KeyringStore, MemoryStore};
use nkap_core::models::{NewTontine, Tontine};
use nkap_core::{ApiClient, Config, Session, SessionStatus};

/// Printed whenever the server turned the session away.
const SESSION_EXPIRED: &str = "Session expired. Please log in again.";

/// Log file name prefix for the rolling appender
const LOG_FILE_PREFIX: &str = "nkap.log";

#[derive(Parser, Debug)]
#[command(name = "nkap", version, about = "nkap tontine, wallet and marketplace client")]
struct Cli {
    /// API base URL, e.g. https://example.com/api/nkap
    #[arg(long, env = "NKAP_BASE_URL", global = true)]
    base_url: Option<String>,

    /// Keep the session in memory instead of the OS keychain
    #[arg(long, global = true)]
    memory_store: bool,

    /// Directory receiving daily log files in addition to stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in with an email address or phone number
    Login { identifier: Option<String> },
    Logout,
    /// Show the signed-in account
    Whoami,
    /// Show the wallet balance
    Balance,
    /// List wallet transactions
    History {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    #[command(subcommand)]
    Tontines(TontineCommand),
    /// Show referral statistics and referees
    Referrals,
    /// Upload product images and print their URLs
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Count unread messages
    Unread,
}

#[derive(Subcommand, Debug)]
enum TontineCommand {
    /// Tontines you created
    Created,
    /// Tontines you joined
    Joined,
    /// Look up a tontine by invitation code
    Search { code: String },
    Join { code: String },
    Create {
        name: String,
        price: f64,
        members: u32,
    },
}

/// Initialize the tracing subscriber for logging
///
/// Use RUST_LOG to control the level (e.g. RUST_LOG=nkap_core=debug).
fn init_tracing(log_dir: Option<&PathBuf>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_file.as_ref());
    info!("nkap starting");

    let session = match open_session(&cli) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(&session, cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&session, &e);
            ExitCode::FAILURE
        }
    }
}

fn open_session(cli: &Cli) -> Result<Session> {
    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(ref url) = cli.base_url {
        config.base_url = Some(url.clone());
    }

    let store: Arc<dyn CredentialStore> = if cli.memory_store {
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(KeyringStore::new(config.keyring_service()))
    };

    let client_config = config.client_config();
    debug!(base_url = %client_config.base_url, "Using API endpoint");
    let api = ApiClient::new(client_config, store)?;
    Ok(Session::new(api))
}

fn report(session: &Session, err: &anyhow::Error) {
    match err.downcast_ref::<ApiError>() {
        Some(_) if session.status() == SessionStatus::Expired => eprintln!("{}", SESSION_EXPIRED),
        Some(api_err) => eprintln!("{}", api_err.user_message()),
        None => eprintln!("{:#}", err),
    }
}

async fn run(session: &Session, command: Command) -> Result<()> {
    let api = session.api();

    if !matches!(command, Command::Login { .. }) {
        let had_token = api.is_authenticated();
        if !session.restore().await? && !matches!(command, Command::Logout) {
            if had_token {
                anyhow::bail!(SESSION_EXPIRED);
            }
            anyhow::bail!("Not logged in. Run `nkap login` first.");
        }
    }

    match command {
        Command::Login { identifier } => login(session, identifier).await?,
        Command::Logout => {
            session.logout().await;
            println!("Logged out.");
        }
        Command::Whoami => match session.user() {
            Some(user) => {
                println!("{} (#{})", user.full_name(), user.id);
                if let Some(email) = user.email {
                    println!("  email:    {}", email);
                }
                if let Some(phone) = user.telephone {
                    println!("  phone:    {}", phone);
                }
                if let Some(code) = user.code_parrainage {
                    println!("  referral: {}", code);
                }
            }
            None => println!("Signed in (profile unavailable offline)."),
        },
        Command::Balance => {
            let solde = api.fetch_balance().await?;
            println!("{}", format_amount(solde));
        }
        Command::History { page } => {
            let history = api.fetch_transactions(page).await?.transactions;
            if history.data.is_empty() {
                println!("No transactions.");
            }
            for tx in &history.data {
                println!(
                    "{:>6}  {:<12} {:>14}  {}",
                    tx.id,
                    tx.kind,
                    format_amount(tx.montant),
                    tx.description.as_deref().unwrap_or("")
                );
            }
            if history.has_more() {
                println!("More: nkap history --page {}", page + 1);
            }
        }
        Command::Tontines(command) => tontines(session, command).await?,
        Command::Referrals => {
            let stats = api.fetch_referral_stats().await?;
            if let Some(code) = stats.code_parrainage {
                println!("Your code: {}", code);
            }
            println!(
                "Referees: {} ({} active), bonus earned: {}",
                stats.nombre_filleuls.unwrap_or(0),
                stats.filleuls_actifs.unwrap_or(0),
                format_amount(stats.total_bonus.unwrap_or(0.0))
            );
            for referee in api.fetch_referees().await?.filleuls {
                let joined = referee
                    .joined_on()
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default();
                let marker = if referee.is_active() { "*" } else { " " };
                println!("{} {:<30} {}", marker, referee.nom_complet, joined);
            }
        }
        Command::Upload { files } => {
            for url in api.upload_images(&files).await? {
                println!("{}", url);
            }
        }
        Command::Unread => {
            println!("{}", api.fetch_unread_count().await?);
        }
    }
    Ok(())
}

async fn login(session: &Session, identifier: Option<String>) -> Result<()> {
    let mut config = Config::load().unwrap_or_default();

    let identifier = match identifier.or_else(|| config.last_identifier.clone()) {
        Some(identifier) => identifier,
        None => prompt("Email or phone: ")?,
    };
    let password = rpassword::prompt_password("Password: ").context("Failed to read password")?;

    let user = session.login(&identifier, &password).await?;
    println!("Welcome, {}.", user.full_name());

    config.last_identifier = Some(identifier);
    if let Err(e) = config.save() {
        debug!(error = %e, "Failed to remember identifier");
    }
    Ok(())
}

async fn tontines(session: &Session, command: TontineCommand) -> Result<()> {
    let api = session.api();
    match command {
        TontineCommand::Created => print_tontines(&api.fetch_created_tontines().await?),
        TontineCommand::Joined => print_tontines(&api.fetch_joined_tontines().await?),
        TontineCommand::Search { code } => {
            let tontine = api.search_tontine(&code).await?;
            print_tontines(std::slice::from_ref(&tontine));
            if let Some(creator) = tontine.createur {
                println!("Created by {}", creator.full_name());
            }
        }
        TontineCommand::Join { code } => {
            api.join_tontine(&code).await?;
            println!("Joined tontine {}.", code);
        }
        TontineCommand::Create {
            name,
            price,
            members,
        } => {
            let message = api
                .create_tontine(&NewTontine {
                    nom: name,
                    prix: price,
                    nombre_membres: members,
                })
                .await?;
            println!("{}", message.unwrap_or_else(|| "Tontine created.".to_string()));
        }
    }
    Ok(())
}

fn print_tontines(tontines: &[Tontine]) {
    if tontines.is_empty() {
        println!("No tontines.");
        return;
    }
    for t in tontines {
        let places = if t.is_full() {
            "full".to_string()
        } else {
            format!("{} left", t.places_left())
        };
        println!(
            "{:<10} {:<24} {:>12}  {}/{} ({})",
            t.code,
            t.nom,
            format_amount(t.prix),
            t.members(),
            t.nombre_membres,
            places
        );
    }
}

fn format_amount(amount: f64) -> String {
    format!("{:.0} FCFA", amount)
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    let line = line.trim().to_string();
    if line.is_empty() {
        anyhow::bail!("No identifier given");
    }
    Ok(line)
}
