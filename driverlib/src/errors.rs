use std::{io, path::PathBuf, result};
use thiserror::Error;

/// Operational failures of a supervised job.
///
/// Exit codes are never represented here, only genuine I/O, transfer and
/// process-creation failures.
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("failed to create working directory {path:?}")]
    CreateWorkDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot derive an artifact file name from {0:?}")]
    InvalidArtifactLocation(String),
    #[error("failed to fetch {location}")]
    Transfer {
        location: String,
        #[source]
        source: io::Error,
    },
    #[error("did not see expected artifact {file} in {dir:?}")]
    ArtifactMissing { file: String, dir: PathBuf },
    #[error("invalid command: {0}")]
    CommandBuild(String),
    #[error("failed to launch {program}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("failed waiting for driver process")]
    Wait(#[source] io::Error),
    #[error("failed to terminate driver process")]
    Terminate(#[source] io::Error),
}

pub type Result<T> = result::Result<T, DriverError>;
