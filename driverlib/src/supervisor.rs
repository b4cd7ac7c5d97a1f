use crate::clock::{Clock, Sleeper};
use crate::control::RunnerControl;
use crate::errors::{DriverError, Result};
use crate::events::LoopExit;
use crate::launcher::LaunchCommand;
use crate::process::{ProcessHandle, ProcessStarter};
use crate::types::ExitCode;

use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// An attempt that runs longer than this is considered healthy and resets the backoff.
pub const SUCCESSFUL_RUN_DURATION: Duration = Duration::from_secs(5);
pub const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Doubling delay between relaunches. No cap and no jitter.
#[derive(Clone, Copy, Debug)]
pub struct Backoff {
    current: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            current: INITIAL_BACKOFF,
        }
    }
}

impl Backoff {
    /// Returns the delay to wait now and doubles the next one.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2);
        delay
    }

    pub fn reset(&mut self) {
        self.current = INITIAL_BACKOFF;
    }
}

/// Launches a command, waits for it, and relaunches it with backoff while
/// it keeps failing under supervision.
pub(crate) struct Supervisor<'a> {
    pub job_id: &'a str,
    pub control: &'a RunnerControl,
    pub starter: &'a dyn ProcessStarter,
    pub clock: &'a dyn Clock,
    pub sleeper: &'a dyn Sleeper,
    pub terminate_timeout: Duration,
}

impl Supervisor<'_> {
    pub async fn run(&self, command: &LaunchCommand, supervise: bool) -> Result<LoopExit> {
        let job_id = self.job_id;
        let mut backoff = Backoff::default();
        loop {
            let launched = self
                .control
                .launch_unless_killed(|| self.starter.start(command))
                .map_err(|source| DriverError::Launch {
                    program: command.program.clone(),
                    source,
                })?;
            let (mut process, kill_rx) = match launched {
                Some(launched) => launched,
                None => {
                    debug!(%job_id, "killed before launch");
                    return Ok(LoopExit::Cancelled);
                }
            };
            info!(%job_id, command = %command.display_redacted(), "launched driver");

            let started = self.clock.now();
            let exited = self.wait_for_exit(process.as_mut(), kill_rx).await;
            self.control.process_exited(exited.as_ref().ok().copied());
            let exit_code = exited?;
            let elapsed = self.clock.now().saturating_duration_since(started);
            info!(%job_id, exit_code, elapsed_ms = elapsed.as_millis() as u64, "driver exited");

            if elapsed > SUCCESSFUL_RUN_DURATION {
                backoff.reset();
            }
            let relaunch = supervise && exit_code != 0 && !self.control.is_killed();
            if !relaunch {
                return Ok(LoopExit::Exited(exit_code));
            }

            let delay = backoff.next_delay();
            warn!(%job_id, exit_code, backoff_secs = delay.as_secs(), "relaunching driver after backoff");
            tokio::select! {
                biased;
                _ = self.control.cancelled() => debug!(%job_id, "backoff interrupted by kill"),
                _ = self.sleeper.sleep(delay) => {}
            }
        }
    }

    async fn wait_for_exit(
        &self,
        process: &mut dyn ProcessHandle,
        kill_rx: oneshot::Receiver<()>,
    ) -> Result<ExitCode> {
        tokio::select! {
            // a dropped switch is not a kill request, keep waiting
            Ok(()) = kill_rx => {}
            exited = process.wait() => return exited.map_err(DriverError::Wait),
        }

        info!(job_id = %self.job_id, "terminating driver process");
        if !self.terminate_timeout.is_zero() {
            match process.request_termination() {
                Ok(()) => {
                    if let Ok(exited) =
                        tokio::time::timeout(self.terminate_timeout, process.wait()).await
                    {
                        return exited.map_err(DriverError::Wait);
                    }
                    warn!(
                        job_id = %self.job_id,
                        timeout_ms = self.terminate_timeout.as_millis() as u64,
                        "driver ignored termination request, killing"
                    );
                }
                Err(e) => warn!(job_id = %self.job_id, error = %e, "termination request failed"),
            }
        }
        process.kill().await.map_err(DriverError::Terminate)?;
        process.wait().await.map_err(DriverError::Wait)
    }
}
