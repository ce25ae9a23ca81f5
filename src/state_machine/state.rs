use serde_json::Value;

use crate::acp::{JobPhase, JobSnapshot};

/// What the driver should do after observing one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// The counterparty is ready to transact: accept the requirement and pay.
    PayAndAccept,
    /// Nothing to do this tick.
    Wait,
    /// The job reached `Completed`; carries the deliverable.
    Complete(Value),
    /// The job ended in a failure phase.
    Fail(JobPhase),
}

/// Decides the driver's action for a job snapshot.
pub struct StateMachine;

impl StateMachine {
    /// Compute the transition for the given snapshot.
    ///
    /// - `Negotiation` with a memo proposing `Transaction` pays.
    /// - `Completed` returns the deliverable, or `{}` when the job has none.
    /// - `Rejected` and `Expired` fail.
    /// - Every other combination waits for the next poll.
    pub fn step(job: &JobSnapshot) -> Transition {
        match job.phase {
            JobPhase::Negotiation if Self::ready_to_transact(job) => Transition::PayAndAccept,
            JobPhase::Completed => Transition::Complete(
                job.deliverable
                    .clone()
                    .filter(|d| !d.is_null())
                    .unwrap_or_else(|| Value::Object(Default::default())),
            ),
            phase if phase.is_failure() => Transition::Fail(phase),
            _ => Transition::Wait,
        }
    }

    fn ready_to_transact(job: &JobSnapshot) -> bool {
        job.latest_memo
            .as_ref()
            .is_some_and(|memo| memo.next_phase == JobPhase::Transaction)
    }
}
