//! Per sub-task seed execution

use std::sync::Arc;
use std::time::Instant;

use tileseed_clients::ProxyConfigSource;
use tileseed_core::config::{MapproxyConfig, SeedingConfig};
use tileseed_core::{CacheType, NormalizedSeedTask, ProxyConfig, SeedTask};
use tracing::{debug, info, instrument};

use crate::buffer::buffer_geometry;
use crate::classify::{classify_failure, classify_line, FailureKind, OutputClass};
use crate::error::{ProcessError, Result, SeedError};
use crate::materialize::ConfigMaterializer;
use crate::process::{Cancellation, CommandRunner, SeedCommand};
use crate::reporter::{SeedEvent, SeedReporter};
use crate::retry::BboxRetryPolicy;

/// Runs one seed or cleanup request against the seeding tool
#[derive(Clone)]
pub struct SeedOperationExecutor {
    mapproxy: MapproxyConfig,
    seeding: SeedingConfig,
    proxy: Arc<dyn ProxyConfigSource>,
    runner: Arc<dyn CommandRunner>,
    reporter: Arc<dyn SeedReporter>,
    materializer: ConfigMaterializer,
}

impl SeedOperationExecutor {
    pub fn new(
        mapproxy: MapproxyConfig,
        seeding: SeedingConfig,
        proxy: Arc<dyn ProxyConfigSource>,
        runner: Arc<dyn CommandRunner>,
        reporter: Arc<dyn SeedReporter>,
    ) -> Self {
        let materializer = ConfigMaterializer::new(mapproxy.clone(), reporter.clone());
        Self {
            mapproxy,
            seeding,
            proxy,
            runner,
            reporter,
            materializer,
        }
    }

    /// Validate, materialize and run one sub-task.
    ///
    /// Nothing is written or started until the mode, timestamp, zoom range
    /// and the fresh proxy configuration have all been checked.
    #[instrument(skip_all, fields(job_id = %job_id, task_id = %task_id, layer_id = %task.layer_id, mode = %task.mode))]
    pub async fn run_sub_task(&self, task: &SeedTask, job_id: &str, task_id: &str) -> Result<()> {
        let started = Instant::now();
        let result = self.execute(task).await;

        match &result {
            Ok(()) => self.reporter.report(&SeedEvent::Completed {
                layer_id: task.layer_id.clone(),
                duration: started.elapsed(),
            }),
            Err(e) => self.reporter.report(&SeedEvent::Failed {
                layer_id: task.layer_id.clone(),
                duration: started.elapsed(),
                error: e.to_string(),
            }),
        }
        result
    }

    async fn execute(&self, task: &SeedTask) -> Result<()> {
        let mode = task
            .seed_mode()
            .ok_or_else(|| SeedError::UnsupportedMode(task.mode.clone()))?;

        self.reporter.report(&SeedEvent::Started {
            layer_id: task.layer_id.clone(),
            mode: mode.to_string(),
        });

        let task = task.normalize(mode, self.seeding.refresh_before_years_offset)?;
        debug!(refresh_before = %task.refresh_before, "normalized sub-task");

        let raw = self.proxy.get_config().await.map_err(SeedError::ConfigFetch)?;
        let proxy = ProxyConfig::parse(raw)?;
        proxy.validate_target(&task.layer_id, &task.grid, CacheType::Redis)?;

        self.materializer.write_proxy_config(&proxy).await?;
        self.materializer.write_coverage(&task.geometry, None).await?;
        self.materializer.write_seed_spec(&task).await?;

        self.seed_with_bbox_retry(&task).await
    }

    /// Run the tool, growing the coverage each time it rejects the bbox.
    ///
    /// Every retry buffers the original geometry; only the coverage file is
    /// rewritten and the same specification is reused.
    async fn seed_with_bbox_retry(&self, task: &NormalizedSeedTask) -> Result<()> {
        let command = SeedCommand::seed(&self.mapproxy, task.mode, task.skip_uncached);
        let policy = BboxRetryPolicy::from_config(&self.seeding);
        let mut retry = policy.start();

        loop {
            let error = match self.run_once(&command, retry.attempt() + 1).await {
                Ok(()) => {
                    info!(layer_id = %task.layer_id, mode = %task.mode, "seeding tool finished");
                    return Ok(());
                }
                Err(e) => e,
            };

            if classify_failure(&error.to_string()) != FailureKind::InvalidBbox {
                return Err(SeedError::Process {
                    mode: task.mode.to_string(),
                    layer_id: task.layer_id.clone(),
                    source: error,
                });
            }

            let Some(buffer_meters) = retry.advance() else {
                return Err(SeedError::ExceededMaxRetries {
                    layer_id: task.layer_id.clone(),
                    max_retries: policy.max_retries,
                });
            };

            self.reporter.report(&SeedEvent::BboxRetry {
                attempt: retry.attempt(),
                buffer_meters,
            });
            let buffered = buffer_geometry(&task.geometry, buffer_meters);
            self.materializer
                .write_coverage(&buffered, Some(buffer_meters))
                .await?;
        }
    }

    async fn run_once(&self, command: &SeedCommand, attempt: u32) -> std::result::Result<(), ProcessError> {
        self.reporter.report(&SeedEvent::ProcessStarted {
            command: command.to_string(),
            attempt,
        });

        let cancellation = Cancellation::new();
        let reporter = self.reporter.clone();
        let mut on_line = |line: &str| match classify_line(line) {
            OutputClass::Progress => reporter.report(&SeedEvent::Progress {
                line: line.to_string(),
            }),
            OutputClass::Fatal(reason) | OutputClass::ConfigurationError(reason) => {
                if !cancellation.is_cancelled() {
                    reporter.report(&SeedEvent::Aborted {
                        reason: reason.clone(),
                    });
                }
                cancellation.cancel(reason);
            }
            OutputClass::Informational => debug!("{}", line),
        };

        self.runner.run(command, &mut on_line, &cancellation).await
    }
}
