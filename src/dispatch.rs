use std::process::ExitCode;

use serde_json::{Value, json};

use crate::acp::{AcpApi, Fare, FareAmount, JobRequest};
use crate::cli::Tool;
use crate::config::{AcpConfig, Credentials};
use crate::discovery;
use crate::error::AcpError;
use crate::orchestrator::{JobObserver, JobOrchestrator};

/// Validate credentials, connect, and run one tool call.
///
/// `connect` is only called once the credentials are complete.
pub async fn dispatch<C, F>(
    tool: Tool,
    config: &AcpConfig,
    connect: F,
    observer: &mut dyn JobObserver,
) -> Result<Value, AcpError>
where
    C: AcpApi,
    F: FnOnce(&Credentials, &AcpConfig) -> Result<C, AcpError>,
{
    let credentials = config.credentials()?;
    let client = connect(&credentials, config)?;
    run_tool(tool, &client, config, observer).await
}

pub async fn run_tool(
    tool: Tool,
    client: &impl AcpApi,
    config: &AcpConfig,
    observer: &mut dyn JobObserver,
) -> Result<Value, AcpError> {
    match tool {
        Tool::BrowseAgents { query } => {
            let agents = discovery::browse_agents(client, &query).await?;
            Ok(serde_json::to_value(agents)?)
        }
        Tool::ExecuteAcpJob {
            agent_wallet_address,
            service_requirements,
            offering,
        } => {
            let request = JobRequest {
                provider_address: agent_wallet_address,
                service_requirement: service_requirements,
                fare_amount: FareAmount::new(0.0, Fare::from(&config.base_fare)),
                job_offering: offering,
            };
            let orchestrator = JobOrchestrator::new(config.poll_interval(), config.job_timeout());
            let report = orchestrator.run_job(client, &request, observer).await?;
            Ok(report.deliverable)
        }
        Tool::GetWalletBalance => Ok(client
            .token_balances()
            .await?
            .unwrap_or_else(|| Value::Object(Default::default()))),
    }
}

/// Render the single stdout line and exit code for an invocation.
pub fn render(result: Result<Value, String>) -> (String, ExitCode) {
    match result {
        Ok(value) => (value.to_string(), ExitCode::SUCCESS),
        Err(message) => (json!({ "error": message }).to_string(), ExitCode::FAILURE),
    }
}
