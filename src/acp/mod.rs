pub mod client;
pub mod error;
pub mod types;

pub use client::{AcpApi, AcpClient, DEFAULT_GATEWAY_URL};
pub use error::GatewayError;
pub use types::{
    Agent, AgentSort, BrowseOptions, Fare, FareAmount, GraduationStatus, JobPhase, JobRequest,
    JobSnapshot, OnlineStatus,
};
