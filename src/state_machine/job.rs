use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::acp::JobPhase;

/// Bookkeeping for one job while the driver polls it.
#[derive(Debug, Clone)]
pub struct JobRun {
    pub job_id: String,
    pub provider_address: String,
    pub phase_history: Vec<JobPhase>,
    pub polls: u32,
    pub payments: u32,
    pub started_at: DateTime<Utc>,
}

impl JobRun {
    pub fn new(job_id: String, provider_address: String) -> Self {
        Self {
            job_id,
            provider_address,
            phase_history: Vec::new(),
            polls: 0,
            payments: 0,
            started_at: Utc::now(),
        }
    }

    /// Count a poll. Returns `true` when `phase` differs from the last one seen.
    pub fn record(&mut self, phase: JobPhase) -> bool {
        self.polls += 1;
        if self.phase_history.last() == Some(&phase) {
            return false;
        }
        self.phase_history.push(phase);
        true
    }

    pub fn last_phase(&self) -> Option<JobPhase> {
        self.phase_history.last().copied()
    }

    pub fn finish(self, deliverable: Value) -> JobReport {
        let now = Utc::now();
        JobReport {
            duration_ms: (now - self.started_at).num_milliseconds(),
            job_id: self.job_id,
            provider_address: self.provider_address,
            phase_history: self.phase_history,
            polls: self.polls,
            payments: self.payments,
            started_at: self.started_at,
            completed_at: now,
            deliverable,
        }
    }
}

/// Record of a job that reached `Completed`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReport {
    pub job_id: String,
    pub provider_address: String,
    pub phase_history: Vec<JobPhase>,
    pub polls: u32,
    pub payments: u32,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: i64,
    pub deliverable: Value,
}
