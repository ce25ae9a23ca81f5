use std::time::Duration;

use thiserror::Error;

use crate::acp::{GatewayError, JobPhase};

#[derive(Debug, Error)]
pub enum AcpError {
    #[error("Missing configuration: set {}", .0.join(", "))]
    MissingConfig(Vec<&'static str>),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{0}")]
    Usage(String),

    #[error("Invalid serviceRequirements JSON: {0}")]
    InvalidRequirements(#[source] serde_json::Error),

    #[error("No agents found")]
    NoAgents,

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Job {job_id} ended in phase {phase}")]
    JobFailed { job_id: String, phase: JobPhase },

    #[error("Job {job_id} did not complete within {}s (last phase {last_phase})", .elapsed.as_secs())]
    Timeout {
        job_id: String,
        last_phase: JobPhase,
        elapsed: Duration,
    },

    #[error("Failed to encode result: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}
