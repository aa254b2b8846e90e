// kube-gate-cli/src/main.rs
// ============================================================================
// Module: Kube Gate CLI Entry Point
// Description: Command dispatcher for the Kube Gate MCP bridge.
// Purpose: Wire configuration, policies, clusters, and the server together.
// Dependencies: clap, kube-gate-config, kube-gate-mcp, tokio
// ============================================================================

//! ## Overview
//! The CLI starts the MCP bridge (`serve`) or checks a configuration document
//! without starting anything (`config validate`). Startup is fail-closed: an
//! invalid configuration, an uncompilable policy, or an unloadable context
//! exits non-zero before any request is accepted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use kube_gate_clusters::ClientManager;
use kube_gate_config::Configuration;
use kube_gate_core::Evaluator;
use kube_gate_mcp::McpServer;
use kube_gate_mcp::StderrAuditSink;
use kube_gate_mcp::ToolRouter;
use kube_gate_mcp::ToolRouterConfig;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "kube-gate", version, about = "Policy-gated Kubernetes MCP bridge")]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the MCP bridge on the configured transport.
    Serve(ConfigArgs),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Parse and validate a configuration document, then exit.
    Validate(ConfigArgs),
}

/// Shared configuration path argument.
#[derive(Args, Debug)]
struct ConfigArgs {
    /// Path to the YAML configuration document.
    #[arg(long, value_name = "PATH")]
    config: PathBuf,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Fatal CLI errors.
#[derive(Debug, Error)]
enum CliError {
    /// Configuration loading or validation failed.
    #[error(transparent)]
    Config(#[from] kube_gate_config::ConfigError),
    /// Policy compilation failed.
    #[error(transparent)]
    Authz(#[from] kube_gate_core::AuthzError),
    /// Cluster context loading failed.
    #[error(transparent)]
    Clusters(#[from] kube_gate_clusters::ClusterError),
    /// The server failed while serving.
    #[error(transparent)]
    Server(#[from] kube_gate_mcp::ServerError),
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Serve(args) => serve(args).await,
        Commands::Config {
            command: ConfigCommand::Validate(args),
        } => validate(&args),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes stderr logging from the environment filter.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
}

/// Builds the full stack and serves until shutdown.
async fn serve(args: ConfigArgs) -> Result<(), CliError> {
    let config = Configuration::read_file(&args.config)?;
    let authz = Evaluator::new(
        config.authorization.policies.clone(),
        config.authorization.allow_anonymous,
    )?;
    let clusters = Arc::new(ClientManager::new(&config.kubernetes).await?);
    tracing::info!(contexts = ?clusters.contexts(), "registered Kubernetes contexts");

    let router = ToolRouter::new(ToolRouterConfig {
        clusters: Arc::clone(&clusters),
        authz: Arc::new(authz),
        identity_claim: config.authorization.identity_claim.clone(),
        audit: Arc::new(StderrAuditSink),
    });
    let server = McpServer::new(config, router);
    let result = server.serve().await;
    clusters.shutdown();
    Ok(result?)
}

/// Validates a configuration document, including policy compilation.
fn validate(args: &ConfigArgs) -> Result<(), CliError> {
    let config = Configuration::read_file(&args.config)?;
    Evaluator::new(config.authorization.policies.clone(), config.authorization.allow_anonymous)?;
    println!("configuration is valid");
    Ok(())
}
