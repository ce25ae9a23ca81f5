//! Agent discovery: a fixed search followed by a reshape into [`AgentSummary`].

use serde::Serialize;
use serde_json::Value;

use crate::acp::{AcpApi, Agent, AgentSort, BrowseOptions, GraduationStatus, OnlineStatus};
use crate::error::AcpError;

pub const TOP_K: u32 = 5;

/// Search configuration used by `browse_agents`.
pub fn browse_options() -> BrowseOptions {
    BrowseOptions {
        sort_by: AgentSort::SuccessfulJobCount,
        top_k: TOP_K,
        graduation_status: GraduationStatus::All,
        online_status: OnlineStatus::All,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferingSummary {
    pub name: String,
    pub price: Option<Value>,
    pub price_type: Option<String>,
    pub requirement: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSummary {
    pub id: Value,
    pub name: String,
    pub wallet_address: String,
    pub description: Option<String>,
    pub job_offerings: Vec<OfferingSummary>,
}

impl From<Agent> for AgentSummary {
    fn from(agent: Agent) -> Self {
        Self {
            id: agent.id,
            name: agent.name,
            wallet_address: agent.wallet_address,
            description: agent.description,
            job_offerings: agent
                .job_offerings
                .unwrap_or_default()
                .into_iter()
                .map(|offering| OfferingSummary {
                    name: offering.name,
                    price: offering.price,
                    price_type: offering.price_type,
                    requirement: offering.requirement,
                })
                .collect(),
        }
    }
}

/// Search agents matching `query`. An empty result is [`AcpError::NoAgents`].
pub async fn browse_agents(
    client: &impl AcpApi,
    query: &str,
) -> Result<Vec<AgentSummary>, AcpError> {
    let agents = client.browse_agents(query, &browse_options()).await?;
    tracing::debug!(query, found = agents.len(), "agent search finished");

    if agents.is_empty() {
        return Err(AcpError::NoAgents);
    }

    Ok(agents.into_iter().map(AgentSummary::from).collect())
}
