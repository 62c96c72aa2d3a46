pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "dashctl")]
#[command(about = "Operator CLI for the Funnel Dashboard API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(
        long,
        global = true,
        env = "DASHBOARD_API_URL",
        default_value = "http://localhost:3000",
        help = "Base URL of the API server"
    )]
    pub url: String,

    #[arg(long, global = true, env = "DASHBOARD_TOKEN", hide_env_values = true, help = "Bearer token for remote calls")]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Mint a session token (development and testing)")]
    Token(commands::token::TokenArgs),

    #[command(about = "Show the pages and export rights of a role")]
    Pages {
        #[arg(help = "Role name, e.g. sga or capital_partner")]
        role: String,
    },

    #[command(about = "Cache maintenance on a running server")]
    Cache {
        #[command(subcommand)]
        cmd: commands::cache::CacheCommands,
    },

    #[command(about = "Check server health from the /health endpoint")]
    Health,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// Remote server coordinates shared by the commands that make HTTP calls
#[derive(Debug, Clone)]
pub struct Remote {
    pub url: String,
    pub token: Option<String>,
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let remote = Remote {
        url: cli.url.trim_end_matches('/').to_string(),
        token: cli.token,
    };

    match cli.command {
        Commands::Token(args) => commands::token::handle(args, output_format),
        Commands::Pages { role } => commands::pages::handle(&role, output_format),
        Commands::Cache { cmd } => commands::cache::handle(cmd, &remote, output_format).await,
        Commands::Health => commands::cache::health(&remote, output_format).await,
    }
}
