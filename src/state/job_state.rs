/// Crawl job lifecycle definitions
///
/// A job starts `in_progress`, may be paused and resumed any number of times,
/// and ends `completed` once its crawl session runs out of pages.
use std::fmt;

/// Represents the current status of a crawl job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    /// The crawler may run for this job
    InProgress,

    /// The job was paused by a user; no new session may start
    Paused,

    /// Pagination was exhausted; terminal
    Completed,
}

/// A requested change to a job's status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobAction {
    Pause,
    Resume,
    Complete,
}

impl JobStatus {
    /// Returns true if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Returns true if a crawl session may run in this status
    pub fn can_crawl(&self) -> bool {
        matches!(self, Self::InProgress)
    }

    /// Applies an action and returns the resulting status
    ///
    /// Requests that would leave the status unchanged (pausing a paused job,
    /// resuming a running one, completing a completed one) are accepted as
    /// no-ops. Anything leaving `completed`, or completing a paused job, is
    /// rejected with the offending status.
    pub fn apply(self, action: JobAction) -> Result<JobStatus, JobStatus> {
        match (self, action) {
            (Self::InProgress, JobAction::Pause) => Ok(Self::Paused),
            (Self::Paused, JobAction::Pause) => Ok(Self::Paused),
            (Self::Paused, JobAction::Resume) => Ok(Self::InProgress),
            (Self::InProgress, JobAction::Resume) => Ok(Self::InProgress),
            (Self::InProgress, JobAction::Complete) => Ok(Self::Completed),
            (Self::Completed, JobAction::Complete) => Ok(Self::Completed),
            (from, _) => Err(from),
        }
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Paused => "paused",
            Self::Completed => "completed",
        }
    }

    /// Parses a status from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "in_progress" => Some(Self::InProgress),
            "paused" => Some(Self::Paused),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }

    /// Returns all possible job statuses
    pub fn all_statuses() -> [Self; 3] {
        [Self::InProgress, Self::Paused, Self::Completed]
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

impl fmt::Display for JobAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Complete => "complete",
        };
        write!(f, "{}", name)
    }
}
