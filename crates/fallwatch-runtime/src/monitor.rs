//! Async monitor driver
//!
//! Drains the ingestion buffer on a tokio task and feeds each sample through
//! the pipeline to completion. Sample faults are logged and skipped; they
//! never stop the monitor.

use std::sync::Arc;

use fallwatch_core::{FallwatchError, FallwatchResult, RecordSink};
use fallwatch_detect::PerceptionSample;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::{CycleReport, FallPipeline, IngestBuffer, MonitorConfig, PipelineStats};

/// Monitor driver
#[derive(Debug)]
pub struct Monitor {
    pipeline: FallPipeline,
    ingest: Arc<IngestBuffer<PerceptionSample>>,
    reports: Option<mpsc::UnboundedSender<CycleReport>>,
}

impl Monitor {
    pub fn new(pipeline: FallPipeline, ingest_capacity: usize) -> Self {
        Monitor {
            pipeline,
            ingest: Arc::new(IngestBuffer::new(ingest_capacity)),
            reports: None,
        }
    }

    /// Build the pipeline and buffer from configuration
    pub fn from_config(config: &MonitorConfig, sink: Arc<dyn RecordSink>) -> FallwatchResult<Self> {
        let pipeline = FallPipeline::from_config(config)?.with_sink(sink);
        Ok(Self::new(pipeline, config.ingest_capacity))
    }

    /// Forward every completed cycle to a channel
    pub fn with_reports(mut self, reports: mpsc::UnboundedSender<CycleReport>) -> Self {
        self.reports = Some(reports);
        self
    }

    /// Producer handle; push samples from any task or thread
    pub fn ingest(&self) -> Arc<IngestBuffer<PerceptionSample>> {
        Arc::clone(&self.ingest)
    }

    pub fn pipeline(&self) -> &FallPipeline {
        &self.pipeline
    }

    pub fn stats(&self) -> &PipelineStats {
        self.pipeline.stats()
    }

    /// Process one sample directly, bypassing the buffer. Rejected samples
    /// are logged and yield `None`.
    pub async fn step(&mut self, sample: &PerceptionSample) -> Option<CycleReport> {
        match self.pipeline.tick(sample).await {
            Ok(outcome) => {
                let cycle = outcome.cycle?;
                let closed = self
                    .reports
                    .as_ref()
                    .is_some_and(|reports| reports.send(cycle.clone()).is_err());
                if closed {
                    debug!(snapshot = %cycle.snapshot_id(), "report receiver closed, forwarding stopped");
                    self.reports = None;
                }
                Some(cycle)
            }
            Err(FallwatchError::Invariant(violation)) => {
                error!(%violation, "pipeline invariant violated");
                None
            }
            Err(e) => {
                warn!(error = %e, "sample skipped");
                None
            }
        }
    }

    /// Drain the buffer until shutdown is signalled or the buffer is closed
    /// and empty. Returns the final statistics.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> PipelineStats {
        info!(subject = %self.pipeline.subject(), capacity = self.ingest.capacity(), "monitor started");
        let ingest = Arc::clone(&self.ingest);

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                sample = ingest.recv() => match sample {
                    Some(sample) => {
                        self.step(&sample).await;
                    }
                    None => break,
                },
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        let stats = self.pipeline.stats().clone();
        info!(
            ticks = stats.ticks,
            cycles = stats.cycles,
            skipped = stats.skipped_cycles,
            dropped = ingest.dropped(),
            "monitor stopped"
        );
        stats
    }
}
