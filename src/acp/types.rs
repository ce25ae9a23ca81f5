//! Tipos de dados trocados com o gateway ACP.
//!
//! Todas as structs usam `camelCase` no JSON, no formato exposto pelo
//! gateway. [`JobPhase`] é serializada como o código inteiro da fase.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Fases do ciclo de vida de um job no protocolo.
///
/// O fluxo feliz é REQUEST → NEGOTIATION → TRANSACTION → EVALUATION → COMPLETED.
/// `Rejected` e `Expired` são terminais de falha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum JobPhase {
    Request,
    Negotiation,
    Transaction,
    Evaluation,
    Completed,
    Rejected,
    Expired,
}

impl JobPhase {
    /// `true` para as fases que encerram o job sem entregável.
    pub fn is_failure(self) -> bool {
        matches!(self, JobPhase::Rejected | JobPhase::Expired)
    }
}

impl TryFrom<u8> for JobPhase {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(JobPhase::Request),
            1 => Ok(JobPhase::Negotiation),
            2 => Ok(JobPhase::Transaction),
            3 => Ok(JobPhase::Evaluation),
            4 => Ok(JobPhase::Completed),
            5 => Ok(JobPhase::Rejected),
            6 => Ok(JobPhase::Expired),
            other => Err(format!("unknown job phase code {other}")),
        }
    }
}

impl From<JobPhase> for u8 {
    fn from(phase: JobPhase) -> Self {
        match phase {
            JobPhase::Request => 0,
            JobPhase::Negotiation => 1,
            JobPhase::Transaction => 2,
            JobPhase::Evaluation => 3,
            JobPhase::Completed => 4,
            JobPhase::Rejected => 5,
            JobPhase::Expired => 6,
        }
    }
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobPhase::Request => write!(f, "REQUEST"),
            JobPhase::Negotiation => write!(f, "NEGOTIATION"),
            JobPhase::Transaction => write!(f, "TRANSACTION"),
            JobPhase::Evaluation => write!(f, "EVALUATION"),
            JobPhase::Completed => write!(f, "COMPLETED"),
            JobPhase::Rejected => write!(f, "REJECTED"),
            JobPhase::Expired => write!(f, "EXPIRED"),
        }
    }
}

/// Mensagem de negociação mais recente anexada a um job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Memo {
    #[serde(default)]
    pub id: Option<u64>,
    /// Fase para a qual a contraparte espera avançar.
    pub next_phase: JobPhase,
    #[serde(default)]
    pub content: Option<String>,
}

/// Visão somente-leitura de um job, obtida a cada poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    #[serde(deserialize_with = "job_id")]
    pub id: String,
    pub phase: JobPhase,
    #[serde(default)]
    pub latest_memo: Option<Memo>,
    /// Presente apenas quando o job chega a `Completed`.
    #[serde(default)]
    pub deliverable: Option<Value>,
}

/// Token usado como base de preço (endereço do contrato e casas decimais).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fare {
    pub contract_address: String,
    pub decimals: u8,
}

/// Valor associado à criação do job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FareAmount {
    pub amount: f64,
    pub fare: Fare,
}

impl FareAmount {
    pub fn new(amount: f64, fare: Fare) -> Self {
        Self { amount, fare }
    }
}

/// Corpo de `POST /jobs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRequest {
    pub provider_address: String,
    pub service_requirement: Value,
    pub fare_amount: FareAmount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_offering: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobCreated {
    #[serde(deserialize_with = "job_id")]
    pub job_id: String,
}

/// Ids de job chegam como número ou como texto, conforme o gateway.
fn job_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(u64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(id) => id,
        RawId::Number(id) => id.to_string(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AgentSort {
    SuccessfulJobCount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum GraduationStatus {
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OnlineStatus {
    All,
}

/// Parâmetros da busca de agentes, enviados como query string.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowseOptions {
    pub sort_by: AgentSort,
    pub top_k: u32,
    pub graduation_status: GraduationStatus,
    pub online_status: OnlineStatus,
}

/// Oferta de serviço publicada por um agente.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOffering {
    pub name: String,
    #[serde(default)]
    pub price: Option<Value>,
    #[serde(default)]
    pub price_type: Option<String>,
    #[serde(default)]
    pub requirement: Option<Value>,
    #[serde(default)]
    pub deliverable: Option<Value>,
}

/// Agente retornado pelo diretório.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: Value,
    pub name: String,
    pub wallet_address: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub job_offerings: Option<Vec<JobOffering>>,
    #[serde(default)]
    pub twitter_handle: Option<String>,
}
