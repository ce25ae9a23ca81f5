mod job;
mod state;

pub use job::{JobReport, JobRun};
pub use state::{StateMachine, Transition};
