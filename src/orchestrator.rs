use std::time::Duration;

use tokio::time::{Instant, sleep};

use crate::acp::{AcpApi, JobPhase, JobRequest};
use crate::error::AcpError;
use crate::state_machine::{JobReport, JobRun, StateMachine, Transition};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Receives progress notifications while a job is being driven.
pub trait JobObserver {
    fn job_created(&mut self, _job_id: &str) {}
    fn phase_changed(&mut self, _phase: JobPhase) {}
    fn payment_sent(&mut self, _job_id: &str) {}
}

impl JobObserver for () {}

impl<T: JobObserver> JobObserver for Option<T> {
    fn job_created(&mut self, job_id: &str) {
        if let Some(inner) = self {
            inner.job_created(job_id);
        }
    }

    fn phase_changed(&mut self, phase: JobPhase) {
        if let Some(inner) = self {
            inner.phase_changed(phase);
        }
    }

    fn payment_sent(&mut self, job_id: &str) {
        if let Some(inner) = self {
            inner.payment_sent(job_id);
        }
    }
}

/// Drives a remote job from creation to a terminal phase.
pub struct JobOrchestrator {
    /// Wait between two polls of the job.
    pub poll_interval: Duration,
    /// Give up once this much time has passed since the job was created.
    pub deadline: Option<Duration>,
}

impl Default for JobOrchestrator {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            deadline: None,
        }
    }
}

impl JobOrchestrator {
    pub fn new(poll_interval: Duration, deadline: Option<Duration>) -> Self {
        Self {
            poll_interval,
            deadline,
        }
    }

    /// Create the job, then poll it until it completes, fails, or the deadline passes.
    ///
    /// Errors from the client abort the run as-is; nothing is retried here.
    pub async fn run_job(
        &self,
        client: &impl AcpApi,
        request: &JobRequest,
        observer: &mut dyn JobObserver,
    ) -> Result<JobReport, AcpError> {
        let job_id = client.initiate_job(request).await?;
        tracing::info!(%job_id, provider = %request.provider_address, "job created");
        observer.job_created(&job_id);

        let mut run = JobRun::new(job_id, request.provider_address.clone());
        let started = Instant::now();

        loop {
            let job = client
                .get_job(&run.job_id)
                .await?
                .ok_or_else(|| AcpError::JobNotFound(run.job_id.clone()))?;

            if run.record(job.phase) {
                tracing::info!(job_id = %run.job_id, phase = %job.phase, "phase changed");
                observer.phase_changed(job.phase);
            } else {
                tracing::debug!(job_id = %run.job_id, phase = %job.phase, polls = run.polls, "no change");
            }

            match StateMachine::step(&job) {
                Transition::PayAndAccept => {
                    tracing::info!(job_id = %run.job_id, "accepting requirement and paying");
                    client.pay_and_accept(&run.job_id).await?;
                    run.payments += 1;
                    observer.payment_sent(&run.job_id);
                }
                Transition::Complete(deliverable) => {
                    let report = run.finish(deliverable);
                    tracing::info!(
                        job_id = %report.job_id,
                        polls = report.polls,
                        payments = report.payments,
                        duration_ms = report.duration_ms,
                        "job completed"
                    );
                    return Ok(report);
                }
                Transition::Fail(phase) => {
                    tracing::warn!(job_id = %run.job_id, %phase, "job ended without a deliverable");
                    return Err(AcpError::JobFailed {
                        job_id: run.job_id,
                        phase,
                    });
                }
                Transition::Wait => {}
            }

            let mut wait = self.poll_interval;
            if let Some(deadline) = self.deadline {
                let elapsed = started.elapsed();
                if elapsed >= deadline {
                    return Err(AcpError::Timeout {
                        last_phase: run.last_phase().unwrap_or(job.phase),
                        job_id: run.job_id,
                        elapsed,
                    });
                }
                // Last poll lands on the deadline itself.
                wait = wait.min(deadline - elapsed);
            }

            sleep(wait).await;
        }
    }
}
