//! Run a single CyberGuardian flow from the command line and print the
//! structured result.
//!
//! Reads the API key from the `OPENROUTER_KEY` environment variable.
//!
//! # Examples
//!
//! ```sh
//! # List available flows
//! cyberguardian --list
//!
//! # Inline JSON input
//! cyberguardian --flow security-query --input '{"question": "What is MFA fatigue?"}'
//!
//! # Pipe input from a file
//! cat suspicious-email.json | cyberguardian --flow phishing-analysis --stdin
//!
//! # Show the output contract the model must satisfy
//! cyberguardian --flow config-audit --schema
//! ```

use std::io::{self, Read};
use std::path::PathBuf;
use std::process;

use clap::Parser;
use cyberguardian::OpenRouterClient;
use cyberguardian::config::GuardianConfig;
use cyberguardian::flow::{FlowKind, FlowRunner};
use tracing_subscriber::EnvFilter;

/// Run a CyberGuardian analysis flow and print the JSON result.
#[derive(Parser)]
#[command(name = "cyberguardian")]
struct Cli {
    /// List the available flows and exit
    #[arg(long)]
    list: bool,

    /// Flow to run, e.g. phishing-analysis
    #[arg(long)]
    flow: Option<String>,

    /// Flow input as a JSON object
    #[arg(long, conflicts_with = "stdin")]
    input: Option<String>,

    /// Read the JSON input from stdin
    #[arg(long)]
    stdin: bool,

    /// Print the flow's output JSON Schema instead of running it
    #[arg(long)]
    schema: bool,

    /// Override the configured model
    #[arg(long)]
    model: Option<String>,

    /// Path to a TOML config file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut config = match GuardianConfig::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => fail(&format!("failed to load config: {e}")),
    };
    if let Some(model) = cli.model {
        config.model.model = model;
    }
    if let Err(e) = config.validate() {
        fail(&format!("invalid config: {e}"));
    }

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str())),
        )
        .init();

    if cli.list {
        for kind in FlowKind::ALL {
            let info = kind.info();
            println!("{:<26} {}", info.name, info.description);
        }
        return;
    }

    let Some(name) = cli.flow else {
        fail("--flow is required (use --list to see flows)");
    };
    let kind: FlowKind = match name.parse() {
        Ok(k) => k,
        Err(e) => fail(&format!("{e} (use --list to see flows)")),
    };

    if cli.schema {
        print_json(&kind.output_schema());
        return;
    }

    let raw = if cli.stdin {
        let mut buf = String::new();
        if let Err(e) = io::stdin().read_to_string(&mut buf) {
            fail(&format!("failed to read stdin: {e}"));
        }
        buf
    } else if let Some(input) = cli.input {
        input
    } else {
        fail("provide the flow input with --input or --stdin");
    };

    let input: serde_json::Value = match serde_json::from_str(&raw) {
        Ok(v) => v,
        Err(e) => fail(&format!("input is not valid JSON: {e}")),
    };

    let Some(api_key) = config.api_key.clone() else {
        fail("OPENROUTER_KEY environment variable is not set");
    };
    let client = match OpenRouterClient::with_endpoint(api_key, &config.model.endpoint) {
        Ok(c) => c,
        Err(e) => fail(&format!("failed to create API client: {e}")),
    };

    let settings = config.model_settings();
    let runner = FlowRunner::new(&client, &settings);
    match kind.run_json(&runner, input).await {
        Ok(outcome) => print_json(&outcome),
        Err(e) => fail(&e.to_string()),
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => fail(&format!("failed to serialize output: {e}")),
    }
}

fn fail(message: &str) -> ! {
    eprintln!("Error: {message}");
    process::exit(1);
}
