//! Collaborator interfaces the domain depends on.

pub mod config_port;
pub mod data_port;
pub mod proposal_port;
pub mod report_port;
