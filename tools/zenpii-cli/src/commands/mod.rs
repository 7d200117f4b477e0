//! CLI command implementations.

pub mod checkout;
pub mod config;
pub mod quote;

use clap::{Args, Subcommand, ValueEnum};

/// Arguments for the quote command.
#[derive(Args)]
pub struct QuoteArgs {
    /// Cart file (TOML or JSON).
    #[arg(long)]
    pub cart: String,
}

/// How the buyer pays in a live checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CheckoutMethod {
    /// Cash on delivery.
    Cod,
    /// Redirect to the bank gateway.
    Gateway,
}

/// Arguments for the checkout command.
#[derive(Args)]
pub struct CheckoutArgs {
    /// Cart file (TOML or JSON).
    #[arg(long)]
    pub cart: String,

    /// Payment method.
    #[arg(short, long, value_enum, default_value = "cod")]
    pub method: CheckoutMethod,

    /// Deliver to this address instead of the buyer's default.
    #[arg(short, long)]
    pub address: Option<String>,

    /// Skip confirmation prompt.
    #[arg(short, long)]
    pub yes: bool,
}

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show,

    /// Write a default zenpii.toml
    Init {
        /// Overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Validate configuration
    Validate,
}
