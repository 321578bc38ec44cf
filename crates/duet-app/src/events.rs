use std::path::PathBuf;
use crate::job::{JobParams, JobStatus};

/// Everything the foreground loop reacts to arrives as one of these.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    Ui(UiCommand),
    Job(JobEvent),
}

#[derive(Debug, Clone)]
pub enum UiCommand {
    Submit(JobParams),
    Cancel,
    History,
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    State(JobStatus),
    Progress(u8),
    Log(String),

    // Terminal, exactly one per job
    Completed { path: PathBuf },
    Failed { message: String },
    Cancelled { path: Option<PathBuf> },
}

impl JobEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. } | Self::Cancelled { .. })
    }
}
