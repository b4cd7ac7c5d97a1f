//! Fake collaborators for driving the supervisor without real processes or time.

use crate::clock::{Clock, Sleeper};
use crate::launcher::LaunchCommand;
use crate::process::{ProcessHandle, ProcessStarter};
use crate::stager::ArtifactTransport;
use crate::types::ExitCode;

use futures::future::{self, BoxFuture, FutureExt};
use std::collections::VecDeque;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Reports success without producing a file.
pub(crate) struct NoopTransport;

impl ArtifactTransport for NoopTransport {
    fn fetch<'a>(&'a self, _location: &'a str, _destination: &'a Path) -> BoxFuture<'a, io::Result<()>> {
        future::ready(Ok(())).boxed()
    }
}

/// Writes a placeholder artifact, standing in for a remote store.
pub(crate) struct StubTransport;

impl ArtifactTransport for StubTransport {
    fn fetch<'a>(&'a self, _location: &'a str, destination: &'a Path) -> BoxFuture<'a, io::Result<()>> {
        tokio::fs::write(destination, b"artifact").boxed()
    }
}

#[derive(Clone, Debug)]
pub(crate) struct FakeClock {
    now: Arc<Mutex<Instant>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap()
    }
}

/// Records every requested delay and returns immediately, except for the
/// sleep at index `block_at`, which never finishes on its own.
#[derive(Default)]
pub(crate) struct FakeSleeper {
    slept: Mutex<Vec<Duration>>,
    block_at: Option<usize>,
    entered: Option<mpsc::UnboundedSender<usize>>,
}

impl FakeSleeper {
    pub fn blocking_at(index: usize) -> (Self, mpsc::UnboundedReceiver<usize>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sleeper = Self {
            slept: Mutex::default(),
            block_at: Some(index),
            entered: Some(tx),
        };
        (sleeper, rx)
    }

    pub fn slept(&self) -> Vec<Duration> {
        self.slept.lock().unwrap().clone()
    }
}

impl Sleeper for FakeSleeper {
    fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()> {
        let index = {
            let mut slept = self.slept.lock().unwrap();
            slept.push(duration);
            slept.len() - 1
        };
        if let Some(entered) = &self.entered {
            let _ = entered.send(index);
        }
        if self.block_at == Some(index) {
            future::pending().boxed()
        } else {
            future::ready(()).boxed()
        }
    }
}

/// Scripted behaviour of one fake process.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Attempt {
    /// Exits with `code` after `runs_for` of fake time.
    Exit { code: ExitCode, runs_for: Duration },
    /// Runs until asked to terminate.
    UntilKilled,
    /// Ignores termination requests, only a forcible kill stops it.
    IgnoresTermination,
}

impl Attempt {
    pub fn quick(code: ExitCode) -> Self {
        Attempt::Exit {
            code,
            runs_for: Duration::from_millis(100),
        }
    }
}

pub(crate) struct FakeProcess {
    attempt: Attempt,
    clock: Option<FakeClock>,
    exited: Option<ExitCode>,
}

impl FakeProcess {
    pub fn detached(attempt: Attempt) -> Self {
        Self {
            attempt,
            clock: None,
            exited: None,
        }
    }
}

impl ProcessHandle for FakeProcess {
    fn wait(&mut self) -> BoxFuture<'_, io::Result<ExitCode>> {
        if let Some(code) = self.exited {
            return future::ready(Ok(code)).boxed();
        }
        match self.attempt {
            Attempt::Exit { code, runs_for } => {
                if let Some(clock) = &self.clock {
                    clock.advance(runs_for);
                }
                self.exited = Some(code);
                future::ready(Ok(code)).boxed()
            }
            Attempt::UntilKilled | Attempt::IgnoresTermination => future::pending().boxed(),
        }
    }

    fn request_termination(&mut self) -> io::Result<()> {
        if let Attempt::UntilKilled = self.attempt {
            self.exited.get_or_insert(143);
        }
        Ok(())
    }

    fn kill(&mut self) -> BoxFuture<'_, io::Result<()>> {
        self.exited.get_or_insert(137);
        future::ready(Ok(())).boxed()
    }
}

/// Hands out fake processes following a script. Once the script runs out,
/// the last entry repeats.
pub(crate) struct FakeStarter {
    script: Mutex<VecDeque<Attempt>>,
    last: Mutex<Option<Attempt>>,
    clock: FakeClock,
    launches: Mutex<Vec<LaunchCommand>>,
    fail: bool,
}

impl FakeStarter {
    pub fn new(clock: &FakeClock, script: Vec<Attempt>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::default(),
            clock: clock.clone(),
            launches: Mutex::default(),
            fail: false,
        }
    }

    pub fn exits(clock: &FakeClock, codes: &[ExitCode]) -> Self {
        Self::new(clock, codes.iter().copied().map(Attempt::quick).collect())
    }

    pub fn failing(clock: &FakeClock) -> Self {
        Self {
            fail: true,
            ..Self::new(clock, vec![])
        }
    }

    pub fn launches(&self) -> usize {
        self.launches.lock().unwrap().len()
    }

    pub fn last_launch(&self) -> Option<LaunchCommand> {
        self.launches.lock().unwrap().last().cloned()
    }
}

impl ProcessStarter for FakeStarter {
    fn start(&self, command: &LaunchCommand) -> io::Result<Box<dyn ProcessHandle>> {
        if self.fail {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no such program"));
        }
        let attempt = {
            let mut last = self.last.lock().unwrap();
            let next = self.script.lock().unwrap().pop_front().or(*last);
            *last = next;
            next
        };
        let attempt = attempt.ok_or_else(|| io::Error::new(io::ErrorKind::Other, "empty script"))?;
        self.launches.lock().unwrap().push(command.clone());
        Ok(Box::new(FakeProcess {
            attempt,
            clock: Some(self.clock.clone()),
            exited: None,
        }))
    }
}
