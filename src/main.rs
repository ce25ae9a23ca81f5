mod acp;
mod cli;
mod config;
mod discovery;
mod dispatch;
mod error;
mod orchestrator;
mod state_machine;
mod ui;

use std::process::ExitCode;

use anyhow::Result;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use acp::AcpClient;
use cli::{Invocation, Tool, parse_invocation};
use config::AcpConfig;
use ui::JobProgress;

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    let (tool, verbose) = match parse_invocation(std::env::args_os()) {
        Ok(Invocation::Run { tool, verbose }) => (tool, verbose),
        Ok(Invocation::Info(usage)) => return emit(Ok(usage)),
        Err(e) => return emit(Err(e.to_string())),
    };

    init_tracing(verbose);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => return emit(Err(e.to_string())),
    };

    let result = runtime.block_on(invoke(tool));
    emit(result.map_err(|e| e.to_string()))
}

async fn invoke(tool: Tool) -> Result<Value> {
    let config = AcpConfig::load()?;
    let request_id = uuid::Uuid::new_v4().to_string();
    tracing::debug!(%request_id, gateway = %config.gateway_url, "starting tool call");

    let mut progress = if matches!(tool, Tool::ExecuteAcpJob { .. }) {
        JobProgress::for_stderr()
    } else {
        None
    };

    let value = dispatch::dispatch(
        tool,
        &config,
        |credentials, config| AcpClient::build(credentials, &config.gateway_url, &request_id),
        &mut progress,
    )
    .await?;
    Ok(value)
}

fn emit(result: std::result::Result<Value, String>) -> ExitCode {
    if let Err(message) = &result {
        tracing::error!(%message, "tool call failed");
    }
    let (line, code) = dispatch::render(result);
    println!("{line}");
    code
}

// Logs go to stderr; stdout only carries the JSON result.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("ACP_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
