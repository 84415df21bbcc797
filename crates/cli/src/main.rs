//! Wholesale storefront CLI - database migrations, seed data and smoke checks.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations
//! wh-cli migrate
//!
//! # Load demo catalog data (wipe catalog tables first with --reset)
//! wh-cli seed --reset
//!
//! # Check a running server end to end
//! wh-cli smoke api --base-url http://localhost:5000 --phone 9876543210 --otp 123456
//!
//! # Check Delhivery credentials
//! wh-cli smoke delhivery --pincode 110001
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed` - Seed demo categories, products, a coupon and a warehouse
//! - `admin promote` - Give an existing user the admin role
//! - `smoke api` / `smoke delhivery` - Exercise a live deployment

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "wh-cli")]
#[command(author, version, about = "Wholesale storefront CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the database with demo data
    Seed {
        /// Delete existing catalog, coupon and warehouse rows first
        #[arg(long)]
        reset: bool,
    },
    /// Manage admin users
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Smoke-test a deployment
    Smoke {
        #[command(subcommand)]
        target: SmokeTarget,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Give the user with this phone number the admin role
    Promote {
        /// Mobile number the user signs in with
        #[arg(short, long)]
        phone: String,
    },
}

#[derive(Subcommand)]
enum SmokeTarget {
    /// Walk the public API, and the signed-in cart flow when an OTP is given
    Api {
        /// Storefront base URL
        #[arg(long, default_value = "http://localhost:5000")]
        base_url: String,

        /// Phone number to sign in with
        #[arg(long)]
        phone: Option<String>,

        /// OTP for that phone (see the server log in OTP dev mode)
        #[arg(long)]
        otp: Option<String>,
    },
    /// Call Delhivery directly with the configured token
    Delhivery {
        /// Destination pincode to check
        #[arg(long, default_value = "110001")]
        pincode: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

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
        Commands::Seed { reset } => commands::seed::run(reset).await?,
        Commands::Admin { action } => match action {
            AdminAction::Promote { phone } => commands::admin::promote(&phone).await?,
        },
        Commands::Smoke { target } => match target {
            SmokeTarget::Api {
                base_url,
                phone,
                otp,
            } => {
                let login = phone.zip(otp);
                commands::smoke::api(&base_url, login).await?;
            }
            SmokeTarget::Delhivery { pincode } => commands::smoke::delhivery(&pincode).await?,
        },
    }
    Ok(())
}
