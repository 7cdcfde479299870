use anyhow::Result;
use clap::{Parser, Subcommand};
use session_gate::config::Config;
use session_gate::services::auth::Identity;
use session_gate::services::auth::factory::build_session_issuer;
use uuid::Uuid;

mod secret;

/// Helper tool for operating session-gate: signing secrets and service tokens.
#[derive(Parser, Debug)]
#[command(name = "tokengen", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a random symmetric signing secret
    Secret {
        /// Number of characters (minimum 8)
        #[arg(long, default_value_t = 32)]
        length: usize,

        /// Only letters and digits (for places that choke on punctuation)
        #[arg(long, default_value_t = false)]
        no_specials: bool,
    },

    /// Print a long-lived access token for a non-interactive caller.
    ///
    /// Reads the signing configuration from the environment (.env supported),
    /// exactly as the server does.
    ServiceToken {
        /// Subject id carried in the token
        #[arg(long)]
        id: Uuid,

        #[arg(long, default_value = "")]
        first_name: String,

        #[arg(long, default_value = "")]
        last_name: String,

        /// Role granted to the caller (repeatable)
        #[arg(long = "role")]
        roles: Vec<String>,
    },
}

fn main() -> Result<()> {
    match Cli::parse().command {
        Command::Secret {
            length,
            no_specials,
        } => {
            let secret = secret::generate_secret(&mut rand::rng(), length, !no_specials)?;
            println!("{secret}");
        }
        Command::ServiceToken {
            id,
            first_name,
            last_name,
            roles,
        } => {
            let config = Config::from_env()?;
            let issuer = build_session_issuer(&config);
            let identity = Identity::new(id, first_name, last_name, roles);
            println!("{}", issuer.issue_access_token(&identity, true)?);
        }
    }

    Ok(())
}
