use crate::types::{Args, Envs, Program};

/// Program, arguments and environment of a driver, before placeholder substitution.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandTemplate {
    pub program: Program,
    pub args: Args,
    pub envs: Envs,
    pub classpath: Vec<String>,
}

impl CommandTemplate {
    pub fn new(program: impl Into<Program>, args: Args) -> Self {
        Self {
            program: program.into(),
            args,
            ..Self::default()
        }
    }
}

/// Immutable description of a submitted driver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobDescriptor {
    /// Where the driver's artifact lives, as a path or `file://` URL.
    pub artifact_url: String,
    pub command: CommandTemplate,
    pub memory_mb: u64,
    pub cores: u32,
    /// Relaunch the driver when it exits non-zero.
    pub supervise: bool,
}

impl JobDescriptor {
    pub fn new(artifact_url: impl Into<String>, command: CommandTemplate) -> Self {
        Self {
            artifact_url: artifact_url.into(),
            command,
            memory_mb: 1024,
            cores: 1,
            supervise: false,
        }
    }

    pub fn supervised(mut self, supervise: bool) -> Self {
        self.supervise = supervise;
        self
    }

    pub fn with_memory_mb(mut self, memory_mb: u64) -> Self {
        self.memory_mb = memory_mb;
        self
    }
}
