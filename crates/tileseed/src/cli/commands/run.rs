//! Run command

use std::sync::Arc;

use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use tileseed_clients::{HeartbeatClient, JobManagerClient, JobTrackerClient, MapproxyConfigClient};
use tileseed_core::WorkerConfig;
use tileseed_engine::{SeedOperationExecutor, TaskDispatcher, TokioProcessRunner, TracingReporter, Worker};

use crate::cli::Cli;

/// Poll the job queue and seed until interrupted
#[derive(Debug, Args)]
pub struct RunCommand {
    /// Override the idle polling interval in milliseconds
    #[arg(long)]
    pub interval_ms: Option<u64>,
}

impl RunCommand {
    /// Execute the run command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        let (mut config, config_path) = cli.load_config()?;
        let _guard = crate::init_tracing(&config.logging, cli.log_level.as_deref());
        if let Some(interval_ms) = self.interval_ms {
            config.queue.dequeue_interval_ms = interval_ms;
        }
        info!(config = %config_path.display(), "executing run command");

        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(self.execute_async(config))
    }

    async fn execute_async(&self, config: WorkerConfig) -> anyhow::Result<()> {
        let dispatcher = Arc::new(build_dispatcher(&config)?);
        let worker = Worker::new(dispatcher, config.queue.dequeue_interval());

        let shutdown = CancellationToken::new();
        tokio::spawn(wait_for_shutdown(shutdown.clone()));

        let handled = worker.run(shutdown).await;
        info!(handled, "shutdown complete");
        Ok(())
    }
}

/// Wire the HTTP clients and the process runner into a dispatcher
pub(crate) fn build_dispatcher(config: &WorkerConfig) -> anyhow::Result<TaskDispatcher> {
    let queue = JobManagerClient::new(&config.queue, &config.http)?;
    let heartbeat = HeartbeatClient::new(&config.queue, &config.http)?;
    let tracker = JobTrackerClient::new(&config.job_tracker, &config.http)?;
    let proxy = MapproxyConfigClient::new(&config.mapproxy, &config.http)?;

    let executor = SeedOperationExecutor::new(
        config.mapproxy.clone(),
        config.seeding.clone(),
        Arc::new(proxy),
        Arc::new(TokioProcessRunner::from_config(&config.mapproxy)),
        Arc::new(TracingReporter),
    );

    Ok(TaskDispatcher::new(
        config,
        Arc::new(queue),
        Arc::new(tracker),
        Arc::new(heartbeat),
        executor,
    ))
}

/// Cancel `shutdown` on Ctrl-C or SIGTERM
async fn wait_for_shutdown(shutdown: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGTERM");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("shutdown requested, finishing current task");
    shutdown.cancel();
}
