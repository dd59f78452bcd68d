use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gatekeeper-cli")]
#[command(about = "Management CLI for the API gatekeeper", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[arg(short, long, env = "GATEKEEPER_ADMIN_KEY")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show gate status and active policy
    Status,
    /// Count tracked and blocked clients
    Clients,
    /// Inspect one client's rate-limit window
    Client { key: String },
    /// Forget a client's window, lifting any block
    Reset { key: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let request = match &cli.command {
        Commands::Status => client.get(format!("{}/admin/status", cli.url)),
        Commands::Clients => client.get(format!("{}/admin/clients", cli.url)),
        Commands::Client { key } => client.get(format!("{}/admin/clients/{}", cli.url, key)),
        Commands::Reset { key } => client.delete(format!("{}/admin/clients/{}", cli.url, key)),
    };

    let res = request.headers(headers).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            if !text.is_empty() {
                eprintln!("Response: {}", text);
            }
        }
        return Ok(());
    }

    if status == reqwest::StatusCode::NO_CONTENT {
        println!("OK");
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_key_from_env() {
        std::env::set_var("GATEKEEPER_ADMIN_KEY", "secret");
        let cli = Cli::try_parse_from(["gatekeeper-cli", "reset", "203.0.113.7"]).unwrap();
        std::env::remove_var("GATEKEEPER_ADMIN_KEY");

        assert_eq!(cli.key, "secret");
        assert_eq!(cli.url, "http://localhost:8081");
        assert!(matches!(cli.command, Commands::Reset { key } if key == "203.0.113.7"));
    }
}
