mod arg_parser;
mod driver_cli;

use arg_parser::{ArgParser, SubCommand};
use driver_cli::DriverCli;
use driverlib::RunnerConfig;

use clap::Parser;
use std::{error, process, time::Duration};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = ArgParser::parse();
    let config = RunnerConfig::default()
        .with_work_dir(args.work_dir)
        .with_worker_url(args.worker_url)
        .with_runtime_home(args.runtime_home)
        .with_terminate_timeout(Duration::from_secs(args.terminate_timeout_secs));
    let cli = DriverCli::new(config);

    match args.sub_command {
        SubCommand::Run {
            artifact,
            job_id,
            supervise,
            memory_mb,
            classpath,
            envs,
            command,
        } => {
            let job_id = job_id.unwrap_or_else(|| format!("driver-{}", uuid::Uuid::new_v4()));
            let job = driver_cli::job_descriptor(artifact, supervise, memory_mb, classpath, envs, command);
            let update = cli.run(job_id, job).await?;
            match &update.exception {
                Some(e) => println!("{} {}: {}", update.job_id, update.state, e),
                None => println!("{} {}", update.job_id, update.state),
            }
            process::exit(driver_cli::exit_status(update.state));
        }
    }
}
