use clap::{Parser, Subcommand};

mod commands;
mod util;

use commands::simulate::SimulateArgs;

#[derive(Parser)]
#[command(
    name = "bridge",
    version,
    about = "Chatra AI bridge CLI: health, conversation history and webhook simulation"
)]
struct Cli {
    /// API base URL
    #[arg(long, env = "BRIDGE_API_URL", default_value = "http://localhost:8080")]
    api_url: String,

    /// Shared webhook secret sent as X-Webhook-Secret
    #[arg(long, env = "BRIDGE_WEBHOOK_SECRET", hide_env_values = true)]
    secret: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check API and message store health
    Health,
    /// Show the stored turns of a conversation
    History {
        /// Chatra chat id
        conversation_id: String,
    },
    /// Post a synthetic chatFragment webhook
    Simulate(SimulateArgs),
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    let secret = cli.secret.as_deref();

    let code = match cli.command {
        Commands::Health => commands::health::run(&cli.api_url).await,
        Commands::History { conversation_id } => {
            commands::history::run(&cli.api_url, secret, &conversation_id).await
        }
        Commands::Simulate(args) => commands::simulate::run(&cli.api_url, secret, args).await,
    };

    std::process::exit(code);
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn simulate_parses_flags() {
        let cli = Cli::try_parse_from([
            "bridge",
            "--api-url",
            "http://bridge.internal",
            "simulate",
            "--conversation",
            "chat-1",
            "--text",
            "hello",
            "--agent",
        ])
        .expect("simulate should parse");

        assert_eq!(cli.api_url, "http://bridge.internal");
        match cli.command {
            Commands::Simulate(args) => {
                assert_eq!(args.conversation, "chat-1");
                assert_eq!(args.client_id, "cli-client");
                assert!(args.agent);
            }
            _ => panic!("expected simulate"),
        }
    }
}
