//! Brickyard CLI - Database migrations and operator tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! brickyard migrate
//!
//! # Encrypt an integration key with the operator secret
//! brickyard secret encrypt sk_live_...
//!
//! # Decrypt a stored token
//! brickyard secret decrypt '<nonce>.<ciphertext>.<tag>'
//!
//! # Grant licenses for a paid session whose webhook never arrived
//! brickyard licenses reconcile --session cs_live_...
//!
//! # Show a user's licenses
//! brickyard licenses list --user 6f1c2a9e-... --asset-type retail
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `secret encrypt|decrypt` - Secret codec round trips
//! - `licenses reconcile|list` - License maintenance

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "brickyard")]
#[command(author, version, about = "Brickyard CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Encrypt or decrypt integration secrets
    Secret {
        #[command(subcommand)]
        action: SecretAction,
    },
    /// Maintain licenses
    Licenses {
        #[command(subcommand)]
        action: LicenseAction,
    },
}

#[derive(Subcommand)]
enum SecretAction {
    /// Encrypt a plaintext value (reads stdin when omitted)
    Encrypt { value: Option<String> },
    /// Decrypt a stored token (reads stdin when omitted)
    Decrypt { token: Option<String> },
}

#[derive(Subcommand)]
enum LicenseAction {
    /// Re-read a checkout session and grant its licenses if it is paid
    Reconcile {
        /// Checkout session ID
        #[arg(short, long)]
        session: String,
    },
    /// List a user's licenses
    List {
        /// User ID (UUID)
        #[arg(short, long)]
        user: String,

        /// Restrict to one asset type slug
        #[arg(short, long)]
        asset_type: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Secret { action } => match action {
            SecretAction::Encrypt { value } => commands::secret::encrypt(value)?,
            SecretAction::Decrypt { token } => commands::secret::decrypt(token)?,
        },
        Commands::Licenses { action } => match action {
            LicenseAction::Reconcile { session } => {
                commands::licenses::reconcile(&session).await?;
            }
            LicenseAction::List { user, asset_type } => {
                commands::licenses::list(&user, asset_type.as_deref()).await?;
            }
        },
    }
    Ok(())
}
