use futures::future::{BoxFuture, FutureExt};
use std::time::{Duration, Instant};

/// Source of the current time, used to measure how long an attempt ran.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Delay primitive used between relaunches.
///
/// The supervisor races the returned future against cancellation, so an
/// implementation only has to finish eventually.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()> {
        tokio::time::sleep(duration).boxed()
    }
}
