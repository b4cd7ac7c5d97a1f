use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Supervise a driver process the way a cluster worker would
#[derive(Debug, Parser)]
#[clap(name = "driverctl")]
pub struct ArgParser {
    /// Root directory under which each driver gets its own working directory
    #[clap(long = "work-dir", env = "DRIVER_WORK_DIR", default_value = "work")]
    pub work_dir: PathBuf,
    /// Callback address substituted for {{WORKER_URL}}
    #[clap(long = "worker-url", env = "DRIVER_WORKER_URL", default_value = "")]
    pub worker_url: String,
    /// Runtime installation exported to the driver as DRIVER_HOME
    #[clap(long = "runtime-home", env = "DRIVER_HOME")]
    pub runtime_home: Option<PathBuf>,
    /// Seconds between a termination request and a forcible kill
    #[clap(
        long = "terminate-timeout-secs",
        env = "DRIVER_TERMINATE_TIMEOUT_SECS",
        default_value = "10"
    )]
    pub terminate_timeout_secs: u64,
    /// The sub-command to use
    #[clap(subcommand)]
    pub sub_command: SubCommand,
}

#[derive(Clone, Debug, PartialEq, Eq, Subcommand)]
pub enum SubCommand {
    /// stage, launch and supervise a driver until it reaches a terminal state
    Run {
        #[clap(long)]
        /// path or file:// URL of the driver artifact
        artifact: String,

        #[clap(long = "job-id")]
        /// driver id, defaults to a random one
        job_id: Option<String>,

        #[clap(long)]
        /// relaunch the driver with backoff when it exits non-zero
        supervise: bool,

        #[clap(long = "memory-mb", default_value = "1024")]
        /// memory hint exported as DRIVER_MEMORY_MB
        memory_mb: u64,

        #[clap(long, multiple_values = true)]
        /// classpath entries exported as CLASSPATH
        classpath: Vec<String>,

        #[clap(long = "env", multiple_values = true, parse(try_from_str = var_eq_val))]
        /// list of environment variables
        envs: Vec<(String, String)>,

        #[clap(last = true, required = true)]
        /// program and arguments; {{WORKER_URL}} and {{USER_JAR}} are substituted
        command: Vec<String>,
    },
}

/// try_from_str parse function for command env variables
fn var_eq_val(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((var, val)) if !var.is_empty() => Ok((var.to_string(), val.to_string())),
        _ => Err("Required format is VAR=VAL".to_string()),
    }
}
