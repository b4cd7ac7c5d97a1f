use driverlib::{
    CommandTemplate, DriverRunner, DriverState, DriverStateChanged, JobDescriptor, RunnerConfig,
};
use std::{error, sync::Arc};
use tokio::sync::mpsc;
use tracing::{info, warn};

pub struct DriverCli {
    config: RunnerConfig,
}

impl DriverCli {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    /// Runs one driver to completion, killing it on Ctrl-C, and returns its terminal report.
    pub async fn run(
        &self,
        job_id: String,
        job: JobDescriptor,
    ) -> Result<DriverStateChanged, Box<dyn error::Error>> {
        let (tx, mut updates) = mpsc::unbounded_channel();
        let runner = DriverRunner::builder(job_id, job, self.config.clone(), Arc::new(tx)).build();
        runner.start();
        info!(job_id = runner.job_id(), "driver submitted");

        loop {
            tokio::select! {
                update = updates.recv() => {
                    return update.ok_or_else(|| "driver runner exited without a report".into());
                }
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            warn!(job_id = runner.job_id(), "interrupted, killing driver");
                            runner.kill();
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
            }
        }
    }
}

pub fn job_descriptor(
    artifact: String,
    supervise: bool,
    memory_mb: u64,
    classpath: Vec<String>,
    envs: Vec<(String, String)>,
    mut command: Vec<String>,
) -> JobDescriptor {
    let program = if command.is_empty() {
        String::new()
    } else {
        command.remove(0)
    };
    let mut template = CommandTemplate::new(program, command);
    template.envs = envs;
    template.classpath = classpath;
    JobDescriptor::new(artifact, template)
        .supervised(supervise)
        .with_memory_mb(memory_mb)
}

/// Process exit status for a terminal state.
pub fn exit_status(state: DriverState) -> i32 {
    match state {
        DriverState::Finished => 0,
        DriverState::Failed => 1,
        DriverState::Error => 2,
        DriverState::Killed => 130,
    }
}
