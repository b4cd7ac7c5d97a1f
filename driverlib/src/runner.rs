use crate::clock::{Clock, Sleeper, SystemClock, TokioSleeper};
use crate::config::RunnerConfig;
use crate::control::RunnerControl;
use crate::controller::ControllerChannel;
use crate::descriptor::JobDescriptor;
use crate::errors::Result;
use crate::events::{DriverOutcome, DriverStateChanged, DriverStatus, LoopExit};
use crate::launcher::{self, CommandBuilder, DefaultCommandBuilder, LaunchCommand};
use crate::process::{ProcessStarter, TokioProcessStarter};
use crate::stager::{self, ArtifactTransport, LocalTransport};
use crate::supervisor::Supervisor;
use crate::types::JobId;

use std::sync::Arc;
use tracing::{info, warn};

/// Supervises a single driver on behalf of the controller.
///
/// The runner is a cheap handle: clones share the same job. `start` spawns
/// the worker task which stages the artifact, launches the driver, relaunches
/// it under supervision and finally reports exactly one terminal state.
/// `kill` may be called from anywhere at any time.
#[derive(Clone)]
pub struct DriverRunner {
    inner: Arc<Inner>,
}

struct Inner {
    job_id: JobId,
    job: JobDescriptor,
    config: RunnerConfig,
    transport: Arc<dyn ArtifactTransport>,
    command_builder: Arc<dyn CommandBuilder>,
    starter: Arc<dyn ProcessStarter>,
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn Sleeper>,
    controller: Arc<dyn ControllerChannel>,
    control: RunnerControl,
}

/// Builds a [`DriverRunner`], with production collaborators unless replaced.
pub struct DriverRunnerBuilder {
    job_id: JobId,
    job: JobDescriptor,
    config: RunnerConfig,
    transport: Arc<dyn ArtifactTransport>,
    command_builder: Arc<dyn CommandBuilder>,
    starter: Arc<dyn ProcessStarter>,
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn Sleeper>,
    controller: Arc<dyn ControllerChannel>,
}

impl DriverRunnerBuilder {
    pub fn transport(mut self, transport: Arc<dyn ArtifactTransport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn command_builder(mut self, command_builder: Arc<dyn CommandBuilder>) -> Self {
        self.command_builder = command_builder;
        self
    }

    pub fn process_starter(mut self, starter: Arc<dyn ProcessStarter>) -> Self {
        self.starter = starter;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn build(self) -> DriverRunner {
        DriverRunner {
            inner: Arc::new(Inner {
                job_id: self.job_id,
                job: self.job,
                config: self.config,
                transport: self.transport,
                command_builder: self.command_builder,
                starter: self.starter,
                clock: self.clock,
                sleeper: self.sleeper,
                controller: self.controller,
                control: RunnerControl::default(),
            }),
        }
    }
}

impl DriverRunner {
    pub fn builder(
        job_id: impl Into<JobId>,
        job: JobDescriptor,
        config: RunnerConfig,
        controller: Arc<dyn ControllerChannel>,
    ) -> DriverRunnerBuilder {
        DriverRunnerBuilder {
            job_id: job_id.into(),
            job,
            config,
            transport: Arc::new(LocalTransport),
            command_builder: Arc::new(DefaultCommandBuilder),
            starter: Arc::new(TokioProcessStarter),
            clock: Arc::new(SystemClock),
            sleeper: Arc::new(TokioSleeper),
            controller,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.inner.job_id
    }

    /// Spawns the worker task and returns immediately. Only the first call
    /// has an effect. Must be called from within a tokio runtime.
    pub fn start(&self) {
        if !self.inner.control.mark_started() {
            warn!(job_id = %self.inner.job_id, "driver runner already started");
            return;
        }
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.run().await });
    }

    /// Requests cancellation. Idempotent, never blocks, and does nothing once
    /// the terminal state has been reached.
    pub fn kill(&self) {
        if self.inner.control.kill() {
            info!(job_id = %self.inner.job_id, "kill requested");
        }
    }

    pub fn status(&self) -> DriverStatus {
        self.inner.control.status()
    }
}

impl Inner {
    async fn run(&self) {
        let result = self.prepare_and_supervise().await;
        let outcome = DriverOutcome::classify(self.control.is_killed(), result);
        self.finish(outcome);
    }

    async fn prepare_and_supervise(&self) -> Result<LoopExit> {
        let command = tokio::select! {
            biased;
            _ = self.control.cancelled() => {
                info!(job_id = %self.job_id, "killed during setup");
                return Ok(LoopExit::Cancelled);
            }
            command = self.prepare() => command?,
        };

        let supervisor = Supervisor {
            job_id: &self.job_id,
            control: &self.control,
            starter: self.starter.as_ref(),
            clock: self.clock.as_ref(),
            sleeper: self.sleeper.as_ref(),
            terminate_timeout: self.config.terminate_timeout,
        };
        supervisor.run(&command, self.job.supervise).await
    }

    async fn prepare(&self) -> Result<LaunchCommand> {
        let work_dir = stager::create_work_dir(&self.config.work_dir, &self.job_id).await?;
        let artifact =
            stager::stage_artifact(self.transport.as_ref(), &self.job.artifact_url, &work_dir)
                .await?;
        launcher::prepare(
            &self.job,
            &self.config,
            self.command_builder.as_ref(),
            &work_dir,
            &artifact,
        )
    }

    fn finish(&self, outcome: DriverOutcome) {
        let state = outcome.state();
        let exception = outcome.exception();
        if !self.control.set_outcome(outcome) {
            return;
        }
        match &exception {
            Some(e) => warn!(job_id = %self.job_id, %state, error = %e, "driver finished"),
            None => info!(job_id = %self.job_id, %state, "driver finished"),
        }
        self.controller.send(DriverStateChanged {
            job_id: self.job_id.clone(),
            state,
            exception,
        });
    }
}
