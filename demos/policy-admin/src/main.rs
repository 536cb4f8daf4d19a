//! Walks a policy server through the full client lifecycle: upload a policy
//! and a base document, patch the document, read it back, and delete the policy.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use opa_client::OpaClient;
use opa_config::OpaConfig;
use serde_json::Value;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "policy-admin", version)]
#[command(about = "Exercise policy and base document management against an OPA server")]
struct Cli {
    /// Server host; overrides `OPA_SERVER`.
    #[arg(long)]
    server: Option<String>,
    /// Server port; overrides `OPA_PORT`.
    #[arg(long)]
    port: Option<u16>,
    /// Policy name, `/` separated for nested packages.
    #[arg(long, default_value = "example/authz")]
    policy: String,
    /// Body of the generated `allow` rule.
    #[arg(long, default_value = "data.users[_][input.user]")]
    rule: String,
    /// Data packages imported by the policy.
    #[arg(long = "import", default_value = "users")]
    imports: Vec<String>,
    /// Base document name.
    #[arg(long, default_value = "users")]
    document: String,
    /// JSON file holding the base document; a small user list is used otherwise.
    #[arg(long)]
    document_file: Option<PathBuf>,
    /// Leave the policy on the server instead of deleting it at the end.
    #[arg(long)]
    keep: bool,
}

const SAMPLE_DOCUMENT: &str = r#"{"users":[{"alice":1},{"bob":2}]}"#;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = opa_telemetry::init(opa_telemetry::DEFAULT_DIRECTIVE);
    let cli = Cli::parse();

    let mut config = OpaConfig::from_env()?;
    if let Some(server) = cli.server {
        config = config.with_server(server)?;
    }
    if let Some(port) = cli.port {
        config = config.with_port(port)?;
    }
    info!(base_url = %config.base_url(), "connecting");
    let client = OpaClient::new(config)?;

    let payload = match &cli.document_file {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?,
        None => SAMPLE_DOCUMENT.to_owned(),
    };

    let policy = client
        .create_policy(&cli.policy, &cli.rule, cli.imports.iter().cloned())
        .await
        .context("creating policy")?;
    info!(name = policy.name(), version = policy.version(), "policy uploaded");

    let mut data = client
        .create_base_document(&cli.document, payload)
        .await
        .context("creating base document")?;
    info!(name = data.name(), "base document uploaded");

    let added = data.add_path("/demo", Value::Bool(true)).await?;
    info!(message = added.message(), "patched");
    let removed = data.remove_path("/demo").await?;
    info!(message = removed.message(), "patched");

    let current = data.refresh().await?;
    info!(document = current, "server copy");

    let source = policy.fetch_source().await?;
    info!(lines = source.lines().count(), "policy source");

    if cli.keep {
        info!(name = policy.name(), "keeping policy");
    } else {
        let deleted = policy.delete().await?;
        info!(message = deleted.message(), "done");
    }
    Ok(())
}
