use std::path::PathBuf;

use clap::{Parser, Subcommand};
use futures_util::future::join_all;
use serde::Deserialize;
use serde_json::Value;
use service_relay::relay::{CheckRequest, ResultDescriptor};

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Reachability checks through a running service relay", long_about = None)]
struct Cli {
    /// Base URL of the relay.
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a single target
    Check {
        target: String,
        #[arg(short, long, default_value = "GET")]
        method: String,
        #[arg(long)]
        timeout_ms: Option<u64>,
        /// Mirror the upstream status on the relay response
        #[arg(long)]
        passthrough: bool,
        /// Do not retry a rejected HEAD as GET
        #[arg(long)]
        no_fallback: bool,
        #[arg(long)]
        no_browser_headers: bool,
        /// Verify TLS certificates
        #[arg(long)]
        secure: bool,
    },
    /// Check every target listed in a TOML file
    Batch { file: PathBuf },
    /// Relay liveness
    Health,
}

/// `[[targets]]` entries of a batch file.
#[derive(Debug, Deserialize)]
struct BatchFile {
    targets: Vec<BatchTarget>,
}

#[derive(Debug, Deserialize)]
struct BatchTarget {
    name: String,
    url: String,
    method: Option<String>,
    timeout_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::builder().no_proxy().build()?;
    let base = cli.url.trim_end_matches('/').to_string();

    match cli.command {
        Commands::Check {
            target,
            method,
            timeout_ms,
            passthrough,
            no_fallback,
            no_browser_headers,
            secure,
        } => {
            let mut request = CheckRequest::for_url(target);
            request.method = Some(method);
            request.timeout_ms = timeout_ms;
            request.passthrough_status = Some(passthrough);
            request.head_fallback_to_get = Some(!no_fallback);
            request.send_browser_headers = Some(!no_browser_headers);
            request.insecure_tls = Some(!secure);

            let res = client
                .post(format!("{}/relay/check", base))
                .json(&request)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Batch { file } => {
            let batch: BatchFile = toml::from_str(&std::fs::read_to_string(&file)?)?;
            let checks = batch.targets.iter().map(|target| {
                let mut request = CheckRequest::for_url(target.url.clone());
                request.method = target.method.clone();
                request.timeout_ms = target.timeout_ms;
                let client = client.clone();
                let endpoint = format!("{}/relay/check", base);
                async move {
                    let res = client.post(endpoint).json(&request).send().await?;
                    res.json::<ResultDescriptor>().await
                }
            });

            for (target, outcome) in batch.targets.iter().zip(join_all(checks).await) {
                match outcome {
                    Ok(result) => println!(
                        "{:<24} {:<8} {:>5} {:>7}ms  {}",
                        target.name,
                        result.status.as_str(),
                        result
                            .http_status
                            .map(|s| s.to_string())
                            .unwrap_or_else(|| "-".to_string()),
                        result.time_cost_ms,
                        result.message
                    ),
                    Err(e) => println!("{:<24} relay unreachable: {}", target.name, e),
                }
            }
        }
        Commands::Health => {
            let res = client.get(format!("{}/healthz", base)).send().await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Relay returned status {}", status);
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
