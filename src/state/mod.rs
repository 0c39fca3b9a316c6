//! State module for tracking crawl job progress
//!
//! - `JobStatus`: lifecycle of a crawl job (in_progress, paused, completed)
//! - `JobAction`: the pause/resume/complete requests that move between them

mod job_state;

pub use job_state::{JobAction, JobStatus};
