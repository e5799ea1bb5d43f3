//! Command-line interface.

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "chatwidget-gateway", version, about = "Embeddable chat widget backend")]
pub struct Cli {
    /// Address to bind (overrides HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides PORT)
    #[arg(long)]
    pub port: Option<u16>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print a bcrypt hash suitable for ADMIN_PASSWORD_HASH and exit
    HashPassword {
        /// Plain-text admin password
        password: String,
    },
}

/// Hash `password` with bcrypt at the default cost.
pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
}
