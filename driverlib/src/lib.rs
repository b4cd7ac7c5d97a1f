pub mod clock;
pub mod config;
mod control;
pub mod controller;
pub mod descriptor;
pub mod errors;
mod events;
pub mod launcher;
pub mod process;
mod runner;
pub mod stager;
pub mod supervisor;
#[cfg(test)]
mod testing;
pub mod types;

pub use config::RunnerConfig;
pub use controller::ControllerChannel;
pub use descriptor::{CommandTemplate, JobDescriptor};
pub use errors::DriverError;
pub use events::{DriverOutcome, DriverState, DriverStateChanged, DriverStatus};
pub use runner::{DriverRunner, DriverRunnerBuilder};
