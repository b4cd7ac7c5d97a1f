use crate::launcher::LaunchCommand;
use crate::types::ExitCode;

use futures::future::{BoxFuture, FutureExt};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::io;
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;
use tokio::process;

/// A running driver process.
pub trait ProcessHandle: Send {
    /// Resolves once the process has exited.
    fn wait(&mut self) -> BoxFuture<'_, io::Result<ExitCode>>;

    /// Politely ask the process to stop. Does not wait.
    fn request_termination(&mut self) -> io::Result<()>;

    /// Forcibly stop the process.
    fn kill(&mut self) -> BoxFuture<'_, io::Result<()>>;
}

/// Creates processes from a prepared [`LaunchCommand`].
///
/// `start` is synchronous: the supervisor calls it while holding the runner
/// lock so that a concurrent kill either prevents the launch or sees the new
/// process.
pub trait ProcessStarter: Send + Sync {
    fn start(&self, command: &LaunchCommand) -> io::Result<Box<dyn ProcessHandle>>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TokioProcessStarter;

impl ProcessStarter for TokioProcessStarter {
    fn start(&self, command: &LaunchCommand) -> io::Result<Box<dyn ProcessHandle>> {
        let (stdout, stderr) = command.open_streams()?;
        let child = process::Command::new(&command.program)
            .args(&command.args)
            .envs(command.envs.iter().cloned())
            .current_dir(&command.dir)
            .stdout(stdout)
            .stderr(stderr)
            .kill_on_drop(true)
            .spawn()?;
        Ok(Box::new(TokioProcess { child }))
    }
}

struct TokioProcess {
    child: process::Child,
}

impl ProcessHandle for TokioProcess {
    fn wait(&mut self) -> BoxFuture<'_, io::Result<ExitCode>> {
        async move { self.child.wait().await.map(exit_code) }.boxed()
    }

    fn request_termination(&mut self) -> io::Result<()> {
        match self.child.id() {
            Some(pid) => signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM)
                .map_err(io::Error::from),
            // already reaped
            None => Ok(()),
        }
    }

    fn kill(&mut self) -> BoxFuture<'_, io::Result<()>> {
        self.child.kill().boxed()
    }
}

/// Signal deaths are mapped to `128 + signal`, as a shell would report them.
pub(crate) fn exit_code(status: ExitStatus) -> ExitCode {
    match (status.code(), status.signal()) {
        (Some(code), _) => code,
        (None, Some(signal)) => 128 + signal,
        (None, None) => -1,
    }
}
