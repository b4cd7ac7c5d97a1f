use crate::events::{DriverOutcome, DriverStatus};
use crate::process::ProcessHandle;
use crate::types::ExitCode;

use std::io;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::{oneshot, Notify};

/// Job-scoped mutable state, shared between the worker task and `kill()` callers.
///
/// The lock is only held for short, non-blocking sections. Waiting for a
/// process and sleeping between attempts happen outside of it.
#[derive(Debug, Default)]
pub(crate) struct RunnerControl {
    state: Mutex<SharedState>,
    cancelled: Notify,
}

#[derive(Debug, Default)]
struct SharedState {
    started: bool,
    killed: bool,
    /// Present only while a process is in flight.
    kill_switch: Option<oneshot::Sender<()>>,
    exit_code: Option<ExitCode>,
    outcome: Option<DriverOutcome>,
}

pub(crate) type Launched = (Box<dyn ProcessHandle>, oneshot::Receiver<()>);

impl RunnerControl {
    fn lock(&self) -> MutexGuard<'_, SharedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns false if the runner was already started.
    pub fn mark_started(&self) -> bool {
        let mut state = self.lock();
        !std::mem::replace(&mut state.started, true)
    }

    pub fn is_killed(&self) -> bool {
        self.lock().killed
    }

    /// Sets the kill flag and asks the in-flight process, if any, to stop.
    ///
    /// Returns false when the call had no effect: the runner was already
    /// killed or has already reached its terminal state.
    pub fn kill(&self) -> bool {
        {
            let mut state = self.lock();
            if state.killed || state.outcome.is_some() {
                return false;
            }
            state.killed = true;
            if let Some(kill_switch) = state.kill_switch.take() {
                let _ = kill_switch.send(());
            }
        }
        self.cancelled.notify_waiters();
        true
    }

    /// Runs `start` unless the runner has been killed, publishing the new
    /// process's kill switch before the lock is released.
    pub fn launch_unless_killed<F>(&self, start: F) -> io::Result<Option<Launched>>
    where
        F: FnOnce() -> io::Result<Box<dyn ProcessHandle>>,
    {
        let mut state = self.lock();
        if state.killed {
            return Ok(None);
        }
        let process = start()?;
        let (kill_tx, kill_rx) = oneshot::channel();
        state.kill_switch = Some(kill_tx);
        Ok(Some((process, kill_rx)))
    }

    pub fn process_exited(&self, exit_code: Option<ExitCode>) {
        let mut state = self.lock();
        state.kill_switch = None;
        if exit_code.is_some() {
            state.exit_code = exit_code;
        }
    }

    /// Resolves once `kill()` has been called, immediately if it already was.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.cancelled.notified();
            tokio::pin!(notified);
            // register before checking the flag so a concurrent kill is not missed
            notified.as_mut().enable();
            if self.is_killed() {
                return;
            }
            notified.await;
        }
    }

    /// Records the terminal outcome. Returns false if one was already set.
    pub fn set_outcome(&self, outcome: DriverOutcome) -> bool {
        let mut state = self.lock();
        if state.outcome.is_some() {
            return false;
        }
        state.outcome = Some(outcome);
        true
    }

    pub fn status(&self) -> DriverStatus {
        let state = self.lock();
        DriverStatus {
            state: state.outcome.as_ref().map(DriverOutcome::state),
            exception: state.outcome.as_ref().and_then(DriverOutcome::exception),
            exit_code: state.exit_code,
        }
    }
}
