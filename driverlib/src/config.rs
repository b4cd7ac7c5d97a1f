use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_TERMINATE_TIMEOUT: Duration = Duration::from_secs(10);

/// Host-level settings shared by every runner on a worker.
#[derive(Clone, Debug)]
pub struct RunnerConfig {
    /// Root under which each job gets its own directory.
    pub work_dir: PathBuf,
    /// Callback address substituted for `{{WORKER_URL}}`.
    pub worker_url: String,
    pub runtime_home: Option<PathBuf>,
    pub extra_classpath: Vec<String>,
    /// Grace period between a termination request and a forcible kill.
    /// Zero kills immediately.
    pub terminate_timeout: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("work"),
            worker_url: String::new(),
            runtime_home: None,
            extra_classpath: Vec::new(),
            terminate_timeout: DEFAULT_TERMINATE_TIMEOUT,
        }
    }
}

impl RunnerConfig {
    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    pub fn with_worker_url(mut self, worker_url: impl Into<String>) -> Self {
        self.worker_url = worker_url.into();
        self
    }

    pub fn with_runtime_home(mut self, runtime_home: Option<PathBuf>) -> Self {
        self.runtime_home = runtime_home;
        self
    }

    pub fn with_extra_classpath(mut self, extra_classpath: Vec<String>) -> Self {
        self.extra_classpath = extra_classpath;
        self
    }

    pub fn with_terminate_timeout(mut self, terminate_timeout: Duration) -> Self {
        self.terminate_timeout = terminate_timeout;
        self
    }
}
