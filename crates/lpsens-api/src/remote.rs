//! Remote solving through a submit-and-poll job queue.
//!
//! The model travels as MPS text and the remote answer comes back as raw
//! solver output. A job moves through
//! `Submitted -> Polling -> Done | TimedOut | Failed`; no state is shared
//! between jobs. Dropping the future returned by [`RemoteSolver::submit`]
//! cancels the job on our side.

use std::time::Duration;

use log::{debug, info, warn};
use thiserror::Error;
use tokio::time::{Instant, sleep_until, timeout_at};

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Remote solver did not finish within {0:?}")]
    Timeout(Duration),
    #[error("Remote job failed: {0}")]
    Failed(String),
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Unexpected reply from remote solver: {0}")]
    Protocol(String),
}

/// Anything that turns MPS text into the remote solver's raw output
pub trait RemoteSolver {
    fn submit(&self, mps: &str) -> impl Future<Output = Result<String, RemoteError>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub number: i64,
    pub password: String,
}

/// Status as reported by the queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Waiting,
    Running,
    Done,
    Failed(String),
}

/// The three calls a submit-and-poll service exposes.
pub trait JobQueue: Send + Sync {
    fn submit_job(&self, mps: &str) -> impl Future<Output = Result<JobHandle, RemoteError>> + Send;
    fn job_status(&self, job: &JobHandle) -> impl Future<Output = Result<JobStatus, RemoteError>> + Send;
    fn fetch_result(&self, job: &JobHandle) -> impl Future<Output = Result<String, RemoteError>> + Send;
}

#[derive(Debug, Clone, PartialEq)]
pub struct PollingConfig {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    /// Multiplier applied to the interval after each unfinished poll
    pub backoff: f64,
    /// Budget for the whole job, submission included
    pub timeout: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(5),
            max_interval: Duration::from_secs(30),
            backoff: 1.5,
            timeout: Duration::from_secs(300),
        }
    }
}

impl PollingConfig {
    pub fn next_interval(&self, current: Duration) -> Duration {
        current.mul_f64(self.backoff.max(1.0)).min(self.max_interval)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Submitted(JobHandle),
    Polling { job: JobHandle, attempt: u32 },
    Done(String),
    TimedOut,
    Failed(String),
}

/// [`RemoteSolver`] driving a [`JobQueue`] until the job settles
pub struct PollingSolver<Q> {
    queue: Q,
    config: PollingConfig,
}

impl<Q: JobQueue> PollingSolver<Q> {
    pub fn new(queue: Q, config: PollingConfig) -> Self {
        Self { queue, config }
    }

    pub fn queue(&self) -> &Q {
        &self.queue
    }

    async fn run(&self, mps: &str) -> Result<String, RemoteError> {
        let deadline = Instant::now() + self.config.timeout;
        let mut interval = self.config.initial_interval;

        let mut state = match timeout_at(deadline, self.queue.submit_job(mps)).await {
            Ok(job) => JobState::Submitted(job?),
            Err(_) => JobState::TimedOut,
        };

        loop {
            state = match state {
                JobState::Submitted(job) => {
                    info!("remote job {} submitted", job.number);
                    JobState::Polling { job, attempt: 0 }
                }
                JobState::Polling { job, attempt } => {
                    match timeout_at(deadline, self.queue.job_status(&job)).await {
                        Err(_) => JobState::TimedOut,
                        Ok(status) => match status? {
                            JobStatus::Done => match timeout_at(deadline, self.queue.fetch_result(&job)).await {
                                Ok(output) => JobState::Done(output?),
                                Err(_) => JobState::TimedOut,
                            },
                            JobStatus::Failed(reason) => JobState::Failed(reason),
                            pending => {
                                debug!("remote job {} is {:?} (poll {})", job.number, pending, attempt + 1);
                                let wake = Instant::now() + interval;
                                if wake >= deadline {
                                    sleep_until(deadline).await;
                                    JobState::TimedOut
                                } else {
                                    sleep_until(wake).await;
                                    interval = self.config.next_interval(interval);
                                    JobState::Polling {
                                        job,
                                        attempt: attempt + 1,
                                    }
                                }
                            }
                        },
                    }
                }
                JobState::Done(output) => {
                    info!("remote job finished ({} bytes of output)", output.len());
                    return Ok(output);
                }
                JobState::TimedOut => {
                    warn!("remote job abandoned after {:?}", self.config.timeout);
                    return Err(RemoteError::Timeout(self.config.timeout));
                }
                JobState::Failed(reason) => {
                    warn!("remote job failed: {}", reason);
                    return Err(RemoteError::Failed(reason));
                }
            };
        }
    }
}

impl<Q: JobQueue> RemoteSolver for PollingSolver<Q> {
    async fn submit(&self, mps: &str) -> Result<String, RemoteError> {
        self.run(mps).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Queue that replays a scripted list of statuses
    struct ScriptedQueue {
        statuses: Mutex<VecDeque<JobStatus>>,
        polls: Mutex<u32>,
        submitted: Mutex<Option<String>>,
    }

    impl ScriptedQueue {
        fn new(statuses: Vec<JobStatus>) -> Self {
            Self {
                statuses: Mutex::new(statuses.into()),
                polls: Mutex::new(0),
                submitted: Mutex::new(None),
            }
        }
    }

    impl JobQueue for ScriptedQueue {
        async fn submit_job(&self, mps: &str) -> Result<JobHandle, RemoteError> {
            *self.submitted.lock().unwrap() = Some(mps.to_string());
            Ok(JobHandle {
                number: 42,
                password: "secret".to_string(),
            })
        }

        async fn job_status(&self, job: &JobHandle) -> Result<JobStatus, RemoteError> {
            assert_eq!(job.number, 42);
            *self.polls.lock().unwrap() += 1;
            Ok(self
                .statuses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(JobStatus::Running))
        }

        async fn fetch_result(&self, job: &JobHandle) -> Result<String, RemoteError> {
            Ok(format!("result of job {}", job.number))
        }
    }

    fn fast_config(timeout_ms: u64) -> PollingConfig {
        PollingConfig {
            initial_interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(4),
            backoff: 2.0,
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    #[tokio::test]
    async fn test_polls_until_done() {
        let queue = ScriptedQueue::new(vec![JobStatus::Waiting, JobStatus::Running, JobStatus::Done]);
        let solver = PollingSolver::new(queue, fast_config(5_000));

        let output = solver.submit("NAME T\nENDATA\n").await.unwrap();

        assert_eq!(output, "result of job 42");
        assert_eq!(*solver.queue().polls.lock().unwrap(), 3);
        assert_eq!(
            solver.queue().submitted.lock().unwrap().as_deref(),
            Some("NAME T\nENDATA\n")
        );
    }

    #[tokio::test]
    async fn test_failed_job_is_reported() {
        let queue = ScriptedQueue::new(vec![JobStatus::Running, JobStatus::Failed("bad input".to_string())]);
        let solver = PollingSolver::new(queue, fast_config(5_000));

        match solver.submit("").await {
            Err(RemoteError::Failed(reason)) => assert_eq!(reason, "bad input"),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_never_finishing_job_times_out() {
        let solver = PollingSolver::new(ScriptedQueue::new(vec![]), fast_config(20));

        match solver.submit("").await {
            Err(RemoteError::Timeout(limit)) => assert_eq!(limit, Duration::from_millis(20)),
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[test]
    fn test_backoff_is_capped() {
        let config = fast_config(0);
        let mut interval = config.initial_interval;
        let mut seen = Vec::new();
        for _ in 0..4 {
            interval = config.next_interval(interval);
            seen.push(interval.as_millis());
        }
        assert_eq!(seen, vec![2, 4, 4, 4]);
    }
}
