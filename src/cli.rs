//! Interface de linha de comando baseada em clap.
//!
//! Define a struct [`Cli`] com os três subcomandos [`Command`] e a flag global
//! `--verbose`. [`Command::validate`] converte os argumentos brutos em um
//! [`Tool`] validado antes de qualquer acesso à configuração ou à rede.

use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use serde_json::{Value, json};

use crate::error::AcpError;

pub const USAGE: &str = "Usage: browse_agents <query> | execute_acp_job <agentWalletAddress> [<serviceRequirementsJson>] [--offering <name>] | get_wallet_balance";

const BROWSE_USAGE: &str = "Usage: browse_agents \"<query>\"";
const EXECUTE_USAGE: &str =
    "Usage: execute_acp_job \"<agentWalletAddress>\" ['<serviceRequirementsJson>']";

/// Drives agent-commerce protocol jobs and prints one JSON value per call.
#[derive(Debug, Parser)]
#[command(name = "acp-skill", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Habilita logs detalhados em stderr.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Busca agentes de serviço pelo texto informado.
    #[command(name = "browse_agents")]
    BrowseAgents {
        /// Texto livre da busca.
        #[arg(allow_hyphen_values = true)]
        query: Option<String>,
    },

    /// Cria um job com um agente, paga na negociação e espera o entregável.
    #[command(name = "execute_acp_job")]
    ExecuteAcpJob {
        /// Endereço da carteira do agente prestador.
        agent_wallet_address: Option<String>,

        /// Requisitos do serviço em JSON. Padrão: `{}`.
        #[arg(allow_hyphen_values = true)]
        service_requirements: Option<String>,

        /// Nome da oferta de job do agente.
        #[arg(long)]
        offering: Option<String>,
    },

    /// Mostra os saldos de tokens da carteira.
    #[command(name = "get_wallet_balance")]
    GetWalletBalance,
}

/// A validated tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum Tool {
    BrowseAgents {
        query: String,
    },
    ExecuteAcpJob {
        agent_wallet_address: String,
        service_requirements: Value,
        offering: Option<String>,
    },
    GetWalletBalance,
}

impl Command {
    pub fn validate(self) -> Result<Tool, AcpError> {
        match self {
            Command::BrowseAgents { query } => {
                let query = non_empty(query).ok_or_else(|| AcpError::Usage(BROWSE_USAGE.into()))?;
                Ok(Tool::BrowseAgents { query })
            }
            Command::ExecuteAcpJob {
                agent_wallet_address,
                service_requirements,
                offering,
            } => {
                let agent_wallet_address = non_empty(agent_wallet_address)
                    .ok_or_else(|| AcpError::Usage(EXECUTE_USAGE.into()))?;
                let service_requirements = match service_requirements {
                    Some(raw) if !raw.is_empty() => {
                        serde_json::from_str(&raw).map_err(AcpError::InvalidRequirements)?
                    }
                    _ => Value::Object(Default::default()),
                };
                Ok(Tool::ExecuteAcpJob {
                    agent_wallet_address,
                    service_requirements,
                    offering: non_empty(offering),
                })
            }
            Command::GetWalletBalance => Ok(Tool::GetWalletBalance),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Outcome of reading the command line.
#[derive(Debug)]
pub enum Invocation {
    /// A validated tool call.
    Run { tool: Tool, verbose: bool },
    /// `--help` or `--version`, rendered as a `{"usage": ...}` document.
    Info(Value),
}

/// Parse and validate arguments. Any failure other than help/version is a
/// usage error.
pub fn parse_invocation<I, T>(args: I) -> Result<Invocation, AcpError>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let text = e.render().to_string();
            return Ok(Invocation::Info(json!({ "usage": text.trim_end() })));
        }
        Err(e) => {
            tracing::debug!(kind = ?e.kind(), "argument parsing failed");
            return Err(AcpError::Usage(USAGE.into()));
        }
    };

    let tool = cli.command.validate()?;
    Ok(Invocation::Run {
        tool,
        verbose: cli.verbose,
    })
}
