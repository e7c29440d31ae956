//! Background jobs spawned by a module while it runs

use crate::library::EmptyResult;
use futures::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Signal handed to jobs which resolves once they are asked to terminate
#[derive(Clone)]
pub struct TerminationSignal {
    rx: watch::Receiver<bool>,
}

impl TerminationSignal {
    /// Waits until termination has been requested
    pub async fn requested(mut self) {
        while !*self.rx.borrow() {
            // The sender lives as long as the job set, losing it means termination as well
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

struct SpawnedJob {
    name: &'static str,
    handle: JoinHandle<()>,
}

/// Collection of background jobs which are terminated together
pub struct JobSet {
    termination: watch::Sender<bool>,
    jobs: Vec<SpawnedJob>,
}

impl Default for JobSet {
    fn default() -> Self {
        let (termination, _) = watch::channel(false);

        Self {
            termination,
            jobs: Vec::new(),
        }
    }
}

impl JobSet {
    /// Spawns a job onto the runtime
    ///
    /// The job receives a [`TerminationSignal`] it should observe to exit gracefully.
    /// Errors returned by the job are logged.
    pub fn spawn<F, Fut>(&mut self, name: &'static str, job: F)
    where
        F: FnOnce(TerminationSignal) -> Fut,
        Fut: Future<Output = EmptyResult> + Send + 'static,
    {
        let signal = TerminationSignal {
            rx: self.termination.subscribe(),
        };
        let future = job(signal);

        let handle = tokio::spawn(async move {
            debug!(job = name, "Job started");

            match future.await {
                Ok(()) => debug!(job = name, "Job finished"),
                Err(error) => error!(job = name, ?error, "Job failed"),
            }
        });

        self.jobs.push(SpawnedJob { name, handle });
    }

    /// Number of jobs that have been spawned
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Whether no job has been spawned
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Requests all jobs to terminate and waits up to `grace_period` for each of them,
    /// jobs still running afterwards are aborted
    pub async fn terminate(&mut self, grace_period: Duration) {
        self.termination.send_replace(true);

        for SpawnedJob { name, mut handle } in self.jobs.drain(..) {
            match timeout(grace_period, &mut handle).await {
                Ok(_) => info!(job = name, "Job terminated"),
                Err(_) => {
                    warn!(job = name, "Job did not terminate in time, aborting");
                    handle.abort();
                }
            }
        }
    }
}

#[cfg(test)]
mod does {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn signal_termination_to_jobs() {
        let mut jobs = JobSet::default();
        let exited = Arc::new(AtomicBool::new(false));

        let flag = exited.clone();
        jobs.spawn("waiting", move |signal| async move {
            signal.requested().await;
            flag.store(true, Ordering::SeqCst);
            Ok(())
        });

        assert_eq!(jobs.len(), 1);
        jobs.terminate(Duration::from_secs(1)).await;

        assert!(exited.load(Ordering::SeqCst));
        assert!(jobs.is_empty());
    }

    #[tokio::test]
    async fn abort_jobs_ignoring_termination() {
        let mut jobs = JobSet::default();

        jobs.spawn("stubborn", |_| async {
            futures::future::pending::<()>().await;
            Ok(())
        });

        jobs.terminate(Duration::from_millis(10)).await;
        assert!(jobs.is_empty());
    }
}
