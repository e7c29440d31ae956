use super::{DeathReason, Heart, JobSet};
use crate::library::{BoxedError, EmptyResult};
use async_trait::async_trait;
use std::any::type_name;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, error, info, instrument};

/// Executable module
#[async_trait]
pub trait Module {
    /// Executed before running the core loop
    async fn pre_startup(&mut self) -> EmptyResult {
        Ok(())
    }

    /// Core run loop of the module
    ///
    /// When the function returns `Some(_)` the death of the returned [`Heart`] is awaited before calling the shutdown hook.
    /// Useful for situations where you spawn background jobs in the run loop but want to hand-off the program lifecycle management.
    ///
    /// Returning `None` results in the program entering a shutdown state and calling the `post_shutdown` hook.
    async fn run(&mut self, jobs: &mut JobSet) -> Result<Option<Heart>, BoxedError>;

    /// Shutdown hook executed after the core loop and all associated jobs have terminated
    #[instrument(skip(self))]
    async fn post_shutdown(&mut self, termination_reason: ModuleTerminationReason) {
        match termination_reason {
            ModuleTerminationReason::HeartDied(_) | ModuleTerminationReason::ExitedNormally => {
                info!("Module exited normally")
            }
            _ => error!("Module terminated with an error"),
        }
    }
}

/// Reason why a module has terminated
#[derive(Error, Debug)]
pub enum ModuleTerminationReason {
    /// Startup routine threw an error
    #[error("startup routine threw an error")]
    StartupFailed(#[source] BoxedError),
    /// Core run loop threw an error
    #[error("error during operation")]
    OperationalError(#[source] BoxedError),
    /// [`Heart`] provided by module died
    #[error("heart provided by module died: {0}")]
    HeartDied(DeathReason),
    /// Run loop exited cleanly
    #[error("run loop exited cleanly")]
    ExitedNormally,
    /// Timeout during startup
    #[error("timeout during startup")]
    Timeout,
}

impl ModuleTerminationReason {
    /// Whether the module ended without an error
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            ModuleTerminationReason::HeartDied(_) | ModuleTerminationReason::ExitedNormally
        )
    }
}

/// Runner for [`Module`] implementations
pub struct ModuleRunner {
    startup_timeout: Duration,
    shutdown_timeout: Duration,
}

impl Default for ModuleRunner {
    fn default() -> Self {
        Self {
            startup_timeout: Duration::from_secs(60),
            shutdown_timeout: Duration::from_secs(10),
        }
    }
}

impl ModuleRunner {
    /// Executes a [`Module`] until it exits by calling the corresponding lifecycle functions in order.
    /// Returns whether the module terminated without an error.
    #[instrument(skip(self, module), fields(module_name = type_name::<M>()))]
    pub async fn run<M: Module + Send + Sync>(&self, mut module: M) -> bool {
        let mut jobs = JobSet::default();

        info!("Commencing module startup sequence");
        let startup = timeout(self.startup_timeout, module.pre_startup()).await;

        let termination_reason = match startup {
            Ok(Ok(_)) => self.run_loop(&mut module, &mut jobs).await,
            Ok(Err(error)) => {
                error!(?error, "Module startup sequence encountered an error");
                ModuleTerminationReason::StartupFailed(error)
            }
            Err(_) => {
                error!("Module startup sequence timed out");
                ModuleTerminationReason::Timeout
            }
        };

        let success = termination_reason.is_success();

        info!("Terminating remaining jobs");
        jobs.terminate(self.shutdown_timeout).await;

        info!("Commencing module shutdown sequence");
        let result = timeout(
            self.shutdown_timeout,
            module.post_shutdown(termination_reason),
        )
        .await;

        if result.is_err() {
            error!("Module shutdown sequence timed out");
        }

        success
    }

    #[instrument(skip(self, module, jobs))]
    async fn run_loop<M: Module + Send + Sync>(
        &self,
        module: &mut M,
        jobs: &mut JobSet,
    ) -> ModuleTerminationReason {
        info!("Executing module run procedure");
        match module.run(jobs).await {
            Ok(None) => {
                debug!("Module run procedure completed successfully");
                ModuleTerminationReason::ExitedNormally
            }
            Ok(Some(mut heart)) => {
                debug!("Module run procedure completed successfully, entering run loop");
                let death_reason = heart.death().await;
                info!(%death_reason, "Heart provided by run procedure died");
                ModuleTerminationReason::HeartDied(death_reason)
            }
            Err(error) => {
                error!(?error, "Module run procedure encountered an error");
                ModuleTerminationReason::OperationalError(error)
            }
        }
    }
}

#[cfg(test)]
mod does {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    struct Killable {
        job_terminated: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Module for Killable {
        async fn run(&mut self, jobs: &mut JobSet) -> Result<Option<Heart>, BoxedError> {
            let (heart, mut stone) = Heart::new();

            let flag = self.job_terminated.clone();
            jobs.spawn("flag", move |signal| async move {
                signal.requested().await;
                flag.store(true, Ordering::SeqCst);
                Ok(())
            });

            stone.kill("done".into()).await;
            Ok(Some(heart))
        }
    }

    struct FailingStartup;

    #[async_trait]
    impl Module for FailingStartup {
        async fn pre_startup(&mut self) -> EmptyResult {
            Err("no log".into())
        }

        async fn run(&mut self, _jobs: &mut JobSet) -> Result<Option<Heart>, BoxedError> {
            panic!("run must not be called after a failed startup")
        }
    }

    #[tokio::test]
    async fn terminate_jobs_once_heart_died() {
        let job_terminated = Arc::new(AtomicBool::new(false));
        let module = Killable {
            job_terminated: job_terminated.clone(),
        };

        assert!(ModuleRunner::default().run(module).await);
        assert!(job_terminated.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn skip_run_after_failed_startup() {
        assert!(!ModuleRunner::default().run(FailingStartup).await);
    }
}
