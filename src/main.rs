//! firebase-account - command-line access to the Firebase account admin API.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use firebase_account::core::middleware::default_client;
use firebase_account::{Account, AuthConfig, Endpoints, Instance, SimpleLoginUser};
use serde::Serialize;
use std::sync::Arc;

/// Manage Firebase databases, their security rules, secrets and users.
#[derive(Parser)]
#[command(name = "firebase-account")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    auth: AuthArgs,

    /// Output format (text or json)
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    format: OutputFormat,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,
}

#[derive(Args)]
struct AuthArgs {
    /// Admin token; takes precedence over email and password
    #[arg(long = "token", env = "FIREBASE_ADMIN_TOKEN", global = true, hide_env_values = true)]
    admin_token: Option<String>,

    /// Account email
    #[arg(long = "email", env = "FIREBASE_EMAIL", global = true)]
    account_email: Option<String>,

    /// Account password
    #[arg(long = "password", env = "FIREBASE_PASSWORD", global = true, hide_env_values = true)]
    account_password: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and print the admin token
    Login,
    /// Create a database
    CreateDatabase { name: String },
    /// Delete a database
    DeleteDatabase { name: String },
    /// Print the security rules of a database
    GetRules {
        database: String,
        /// Write the rules to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Replace the security rules of a database from a JSON file
    SetRules { database: String, file: PathBuf },
    /// Print the auth provider configuration of a database
    GetAuthConfig {
        database: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Replace the auth provider configuration from a JSON file
    SetAuthConfig { database: String, file: PathBuf },
    /// List the auth tokens (secrets) of a database
    ListTokens { database: String },
    /// Create a new auth token
    AddToken { database: String },
    /// Revoke an auth token
    RemoveToken { database: String, token: String },
    /// Create a Simple Login user
    CreateUser {
        database: String,
        email: String,
        password: String,
    },
    /// Remove a Simple Login user
    RemoveUser { database: String, email: String },
    /// Set a new password for a Simple Login user
    ChangePassword {
        database: String,
        email: String,
        new_password: String,
    },
    /// List the Simple Login users of a database
    ListUsers { database: String },
    /// Email a password reset link to a Simple Login user
    ResetPassword { database: String, email: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let format = cli.format;
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match format {
                OutputFormat::Text => eprintln!("Error: {:#}", e),
                OutputFormat::Json => eprintln!(
                    "{}",
                    serde_json::json!({ "status": "error", "message": format!("{:#}", e) })
                ),
            }
            ExitCode::FAILURE
        }
    }
}

fn init_logging(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact()
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut account = authenticate(&cli.auth).await?;
    let format = cli.format;

    match cli.command {
        Command::Login => print_value(&account.admin_token(), format),
        Command::CreateDatabase { name } => {
            let instance = account.create_database(&name).await?;
            print_value(&instance.url(), format)
        }
        Command::DeleteDatabase { name } => {
            let instance = account.get_database(&name).await?;
            account.delete_database(&instance).await?;
            print_success(&format!("deleted {}", name), format)
        }
        Command::GetRules { database, output } => {
            let rules = open(&mut account, &database).await?.rules().await?;
            write_json(&rules, output.as_deref(), format)
        }
        Command::SetRules { database, file } => {
            let rules: serde_json::Value = read_json_file(&file)?;
            open(&mut account, &database).await?.set_rules(rules).await?;
            print_success("rules updated", format)
        }
        Command::GetAuthConfig { database, output } => {
            let config = open(&mut account, &database).await?.auth_config().await?;
            write_json(&config, output.as_deref(), format)
        }
        Command::SetAuthConfig { database, file } => {
            let config: AuthConfig = read_json_file(&file)?;
            open(&mut account, &database)
                .await?
                .set_auth_config(&config)
                .await?;
            print_success("auth config updated", format)
        }
        Command::ListTokens { database } => {
            let tokens = open(&mut account, &database).await?.auth_tokens().await?;
            match format {
                OutputFormat::Text => tokens.iter().for_each(|token| println!("{}", token)),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&tokens)?),
            }
            Ok(())
        }
        Command::AddToken { database } => {
            let token = open(&mut account, &database).await?.add_auth_token().await?;
            print_value(&token, format)
        }
        Command::RemoveToken { database, token } => {
            open(&mut account, &database)
                .await?
                .remove_auth_token(&token)
                .await?;
            print_success("token removed", format)
        }
        Command::CreateUser {
            database,
            email,
            password,
        } => {
            let user = open(&mut account, &database)
                .await?
                .create_user(&email, &password)
                .await?;
            print_users(&[user], format)
        }
        Command::RemoveUser { database, email } => {
            open(&mut account, &database).await?.remove_user(&email).await?;
            print_success(&format!("removed {}", email), format)
        }
        Command::ChangePassword {
            database,
            email,
            new_password,
        } => {
            open(&mut account, &database)
                .await?
                .change_user_password(&email, &new_password)
                .await?;
            print_success("password changed", format)
        }
        Command::ListUsers { database } => {
            let users = open(&mut account, &database).await?.list_users().await?;
            print_users(&users, format)
        }
        Command::ResetPassword { database, email } => {
            open(&mut account, &database)
                .await?
                .send_reset_email(&email)
                .await?;
            print_success(&format!("reset email sent to {}", email), format)
        }
    }
}

async fn authenticate(auth: &AuthArgs) -> anyhow::Result<Account> {
    let endpoints = Endpoints::from_env();
    let client = default_client();

    if let Some(token) = &auth.admin_token {
        return Ok(Account::with_client(client, endpoints, token.clone()));
    }

    match (&auth.account_email, &auth.account_password) {
        (Some(email), Some(password)) => {
            Ok(Account::login_with_client(client, endpoints, email, password).await?)
        }
        _ => bail!("no credentials: pass --token, or --email and --password"),
    }
}

async fn open(account: &mut Account, database: &str) -> anyhow::Result<Arc<Instance>> {
    account
        .get_database(database)
        .await
        .with_context(|| format!("failed to open database {}", database))
}

fn read_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not valid JSON", path.display()))
}

fn write_json<T: Serialize>(
    value: &T,
    output: Option<&Path>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            std::fs::write(path, text + "\n")
                .with_context(|| format!("failed to write {}", path.display()))?;
            print_success(&format!("wrote {}", path.display()), format)
        }
        None => {
            println!("{}", text);
            Ok(())
        }
    }
}

fn print_value<T: Serialize + std::fmt::Display + ?Sized>(
    value: &T,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => println!("{}", value),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}

fn print_success(message: &str, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => println!("{}", message),
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({ "status": "success", "message": message })
        ),
    }
    Ok(())
}

fn print_users(users: &[SimpleLoginUser], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(users)?),
        OutputFormat::Text => {
            println!("{:<40} {}", "EMAIL", "UID");
            for user in users {
                println!(
                    "{:<40} {}",
                    user.email.as_deref().unwrap_or("-"),
                    user.uid.as_deref().unwrap_or("-")
                );
            }
        }
    }
    Ok(())
}
