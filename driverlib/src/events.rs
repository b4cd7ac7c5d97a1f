use crate::errors::DriverError;
use crate::types::{ExitCode, JobId};
use std::{fmt, sync::Arc};

/// Terminal classification reported to the controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DriverState {
    Killed,
    Error,
    Finished,
    Failed,
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DriverState::Killed => "KILLED",
            DriverState::Error => "ERROR",
            DriverState::Finished => "FINISHED",
            DriverState::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// How the supervision loop ended, before classification.
#[derive(Debug)]
pub(crate) enum LoopExit {
    /// The last attempt exited and no relaunch followed.
    Exited(ExitCode),
    /// Cancellation was observed before another launch.
    Cancelled,
}

/// The single outcome of a job, set once when the worker task finishes.
#[derive(Clone, Debug)]
pub enum DriverOutcome {
    Killed,
    Error(Arc<DriverError>),
    Finished,
    Failed { code: ExitCode },
}

impl DriverOutcome {
    /// Cancellation wins over everything, then setup/runtime failures, then the exit code.
    pub(crate) fn classify(killed: bool, result: Result<LoopExit, DriverError>) -> Self {
        if killed {
            return DriverOutcome::Killed;
        }
        match result {
            Err(e) => DriverOutcome::Error(Arc::new(e)),
            Ok(LoopExit::Exited(0)) => DriverOutcome::Finished,
            Ok(LoopExit::Exited(code)) => DriverOutcome::Failed { code },
            // only produced after the kill flag was observed
            Ok(LoopExit::Cancelled) => DriverOutcome::Killed,
        }
    }

    pub fn state(&self) -> DriverState {
        match self {
            DriverOutcome::Killed => DriverState::Killed,
            DriverOutcome::Error(_) => DriverState::Error,
            DriverOutcome::Finished => DriverState::Finished,
            DriverOutcome::Failed { .. } => DriverState::Failed,
        }
    }

    pub fn exception(&self) -> Option<Arc<DriverError>> {
        match self {
            DriverOutcome::Error(e) => Some(Arc::clone(e)),
            _ => None,
        }
    }
}

/// Message sent to the controller exactly once per job.
#[derive(Clone, Debug)]
pub struct DriverStateChanged {
    pub job_id: JobId,
    pub state: DriverState,
    pub exception: Option<Arc<DriverError>>,
}

/// Point-in-time view of a runner, for status queries.
#[derive(Clone, Debug, Default)]
pub struct DriverStatus {
    pub state: Option<DriverState>,
    pub exception: Option<Arc<DriverError>>,
    pub exit_code: Option<ExitCode>,
}
