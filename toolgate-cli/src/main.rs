// toolgate-cli/src/main.rs
// ============================================================================
// Module: Toolgate CLI
// Description: Command-line entry point for the toolgate gateway.
// Purpose: Load configuration, initialize telemetry, and serve.
// Dependencies: clap, tokio, toolgate-config, toolgate-mcp
// ============================================================================

//! ## Overview
//! `toolgate serve` loads the TOML configuration, connects to the backend,
//! runs discovery, and serves the JSON-RPC surface. `toolgate
//! check-descriptor` loads an offline descriptor set and prints the tools it
//! would publish, which is useful when preparing a descriptor file for the
//! offline discovery path.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use clap::Subcommand;
use toolgate_config::GatewayConfig;
use toolgate_core::SchemaProjector;
use toolgate_mcp::McpServer;
use tracing_subscriber::EnvFilter;

// ============================================================================
// SECTION: Arguments
// ============================================================================

/// Gateway exposing a gRPC backend as JSON-RPC tools.
#[derive(Debug, Parser)]
#[command(name = "toolgate", version, about)]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Command to run; defaults to serving.
    #[command(subcommand)]
    command: Option<Command>,
}

/// Top-level commands.
#[derive(Debug, Subcommand)]
enum Command {
    /// Connect to the backend and serve the JSON-RPC surface.
    Serve,
    /// Load a descriptor set and print the tools it would publish.
    CheckDescriptor {
        /// Path to the serialized descriptor set.
        path: PathBuf,
    },
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            tracing::error!("{message}");
            eprintln!("toolgate: {message}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the tracing subscriber from the environment.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

/// Runs the selected command.
fn run(cli: Cli) -> Result<(), String> {
    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(cli.config.as_deref()),
        Command::CheckDescriptor {
            path,
        } => check_descriptor(&path),
    }
}

/// Loads configuration and serves until the transport stops.
fn serve(config_path: Option<&Path>) -> Result<(), String> {
    let config = GatewayConfig::load(config_path).map_err(|err| err.to_string())?;
    let runtime =
        tokio::runtime::Runtime::new().map_err(|err| format!("runtime start failed: {err}"))?;
    runtime.block_on(async {
        let server = McpServer::from_config(config).map_err(|err| err.to_string())?;
        server.serve().await.map_err(|err| err.to_string())
    })
}

/// Loads a descriptor set and prints the tool listing it would produce.
fn check_descriptor(path: &Path) -> Result<(), String> {
    let registry = toolgate_core::load_descriptor_file(path).map_err(|err| err.to_string())?;
    let records = toolgate_core::methods_from_registry(&registry);
    let projector = SchemaProjector::new(registry.comments());
    let mut published = 0_usize;
    for record in &records {
        if toolgate_core::is_internal_service(record.declared_service()) {
            continue;
        }
        let streaming = if record.is_streaming() { " (streaming, not invokable)" } else { "" };
        println!("{}  {}{streaming}", record.tool_id, record.full_name);
        if !record.is_streaming() {
            projector.project(&record.input).map_err(|err| {
                format!("input schema of {} failed to project: {err}", record.full_name)
            })?;
            published += 1;
        }
    }
    println!("{published} invokable tools from {} methods", records.len());
    Ok(())
}
