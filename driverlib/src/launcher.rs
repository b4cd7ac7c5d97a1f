use crate::config::RunnerConfig;
use crate::descriptor::{CommandTemplate, JobDescriptor};
use crate::errors::{DriverError, Result};
use crate::types::{Args, Envs, Program};

use std::borrow::Cow;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Stdio;

pub const WORKER_URL_PLACEHOLDER: &str = "{{WORKER_URL}}";
pub const USER_JAR_PLACEHOLDER: &str = "{{USER_JAR}}";

const HEADER_DIVIDER_WIDTH: usize = 40;
const REDACTED: &str = "*********(redacted)";
const SENSITIVE_KEYS: [&str; 3] = ["password", "secret", "token"];

/// A concrete command line, not yet bound to a directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutableCommand {
    pub program: Program,
    pub args: Args,
    pub envs: Envs,
}

/// Turns a job's command template into an executable command.
pub trait CommandBuilder: Send + Sync {
    fn build(
        &self,
        template: &CommandTemplate,
        memory_mb: u64,
        runtime_home: Option<&Path>,
        substitute: &dyn Fn(&str) -> String,
        extra_classpath: &[String],
    ) -> Result<ExecutableCommand>;
}

/// Substitutes placeholders in program and arguments, and exports the
/// memory hint, runtime home and classpath through the environment.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultCommandBuilder;

impl CommandBuilder for DefaultCommandBuilder {
    fn build(
        &self,
        template: &CommandTemplate,
        memory_mb: u64,
        runtime_home: Option<&Path>,
        substitute: &dyn Fn(&str) -> String,
        extra_classpath: &[String],
    ) -> Result<ExecutableCommand> {
        let program = substitute(&template.program);
        if program.trim().is_empty() {
            return Err(DriverError::CommandBuild("empty program".into()));
        }
        let args = template.args.iter().map(|arg| substitute(arg.as_str())).collect();

        let mut envs = template.envs.clone();
        envs.push(("DRIVER_MEMORY_MB".into(), memory_mb.to_string()));
        if let Some(home) = runtime_home {
            envs.push(("DRIVER_HOME".into(), home.display().to_string()));
        }
        let classpath: Vec<&str> = template
            .classpath
            .iter()
            .chain(extra_classpath)
            .map(String::as_str)
            .collect();
        if !classpath.is_empty() {
            envs.push(("CLASSPATH".into(), classpath.join(":")));
        }

        Ok(ExecutableCommand {
            program,
            args,
            envs,
        })
    }
}

/// A command bound to a job's working directory, with its output files.
#[derive(Clone, Debug)]
pub struct LaunchCommand {
    pub program: Program,
    pub args: Args,
    pub envs: Envs,
    pub dir: PathBuf,
}

impl LaunchCommand {
    pub fn new(command: ExecutableCommand, dir: PathBuf) -> Self {
        Self {
            program: command.program,
            args: command.args,
            envs: command.envs,
            dir,
        }
    }

    pub fn stdout_path(&self) -> PathBuf {
        self.dir.join("stdout")
    }

    pub fn stderr_path(&self) -> PathBuf {
        self.dir.join("stderr")
    }

    /// The command line as `"prog" "arg" ...`, with sensitive values redacted.
    pub fn display_redacted(&self) -> String {
        std::iter::once(Cow::Borrowed(self.program.as_str()))
            .chain(self.args.iter().map(|arg| redact(arg)))
            .map(|part| format!("\"{}\"", part))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn header(&self) -> String {
        format!(
            "Launch Command: {}\n{}\n\n",
            self.display_redacted(),
            "=".repeat(HEADER_DIVIDER_WIDTH)
        )
    }

    /// Opens `stdout` and `stderr` in append mode and writes a launch header
    /// to `stderr`. Called once per attempt, so both files accumulate.
    pub fn open_streams(&self) -> io::Result<(Stdio, Stdio)> {
        let stdout = open_append(&self.stdout_path())?;
        let mut stderr = open_append(&self.stderr_path())?;
        stderr.write_all(self.header().as_bytes())?;
        stderr.flush()?;
        Ok((stdout.into(), stderr.into()))
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

fn redact(arg: &str) -> Cow<'_, str> {
    if let Some((lhs, _)) = arg.split_once('=') {
        let key = lhs.strip_prefix("-D").or_else(|| lhs.strip_prefix("--"));
        if let Some(key) = key {
            let key = key.to_ascii_lowercase();
            if SENSITIVE_KEYS.iter().any(|s| key.contains(s)) {
                return Cow::Owned(format!("{}={}", lhs, REDACTED));
            }
        }
    }
    Cow::Borrowed(arg)
}

/// Builds the launch command for a job whose artifact is staged at `artifact`.
pub fn prepare(
    job: &JobDescriptor,
    config: &RunnerConfig,
    builder: &dyn CommandBuilder,
    work_dir: &Path,
    artifact: &Path,
) -> Result<LaunchCommand> {
    let artifact = artifact.display().to_string();
    let substitute = |arg: &str| {
        arg.replace(WORKER_URL_PLACEHOLDER, &config.worker_url)
            .replace(USER_JAR_PLACEHOLDER, &artifact)
    };
    let command = builder.build(
        &job.command,
        job.memory_mb,
        config.runtime_home.as_deref(),
        &substitute,
        &config.extra_classpath,
    )?;
    Ok(LaunchCommand::new(command, work_dir.to_path_buf()))
}
