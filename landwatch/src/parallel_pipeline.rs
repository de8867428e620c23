// THEORY:
// An analysis is CPU-bound and fully independent of every other analysis, so
// parallelism is simply "many pipelines at once". The pool keeps N long-lived
// worker tasks behind a single dispatcher that hands out work round-robin. Each
// worker moves the actual run onto tokio's blocking threads so the async
// executor never stalls on pixel loops. Answers come back over oneshot channels.

use crate::error::{Error, Result};
use crate::pipeline::{AnalysisResult, ChangeDetectionPipeline, PipelineConfig};
use futures::future::join_all;
use image::RgbImage;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub struct AnalysisTask {
    pub reference: RgbImage,
    pub current: RgbImage,
    pub result_sender: oneshot::Sender<Result<AnalysisResult>>,
}

pub struct AnalysisPool {
    task_sender: mpsc::UnboundedSender<AnalysisTask>,
    workers: Vec<JoinHandle<()>>,
}

impl AnalysisPool {
    /// Spawns `workers` workers (at least one). Must be called inside a tokio runtime.
    pub fn new(config: PipelineConfig, workers: usize) -> Self {
        let worker_count = workers.max(1);
        let (task_sender, mut task_receiver) = mpsc::unbounded_channel::<AnalysisTask>();

        let (worker_senders, worker_receivers): (Vec<_>, Vec<_>) = (0..worker_count)
            .map(|_| mpsc::unbounded_channel::<AnalysisTask>())
            .unzip();

        // Dispatcher
        tokio::spawn(async move {
            let mut worker_idx = 0;
            while let Some(task) = task_receiver.recv().await {
                if worker_senders[worker_idx].send(task).is_err() {
                    warn!(worker = worker_idx, "analysis worker is gone, dropping task");
                }
                worker_idx = (worker_idx + 1) % worker_count;
            }
        });

        let pipeline = ChangeDetectionPipeline::new(config);
        let workers = worker_receivers
            .into_iter()
            .enumerate()
            .map(|(worker, mut worker_receiver)| {
                let pipeline = pipeline.clone();
                tokio::spawn(async move {
                    while let Some(task) = worker_receiver.recv().await {
                        debug!(worker, "analysis task received");
                        let outcome =
                            Self::run(pipeline.clone(), task.reference, task.current).await;
                        let _ = task.result_sender.send(outcome);
                    }
                })
            })
            .collect();

        Self { task_sender, workers }
    }

    /// One worker per logical CPU.
    pub fn with_default_workers(config: PipelineConfig) -> Self {
        Self::new(config, num_cpus::get())
    }

    async fn run(
        pipeline: ChangeDetectionPipeline,
        reference: RgbImage,
        current: RgbImage,
    ) -> Result<AnalysisResult> {
        tokio::task::spawn_blocking(move || pipeline.analyze(reference, current))
            .await
            .map_err(|e| Error::InternalInvariant(format!("analysis task failed: {e}")))?
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub async fn analyze(&self, reference: RgbImage, current: RgbImage) -> Result<AnalysisResult> {
        let (result_sender, result_receiver) = oneshot::channel();

        let task = AnalysisTask {
            reference,
            current,
            result_sender,
        };

        self.task_sender.send(task).map_err(|_| Error::PoolClosed)?;

        result_receiver.await.map_err(|_| Error::PoolClosed)?
    }

    /// Runs every pair concurrently; results keep the input order.
    pub async fn analyze_batch(
        &self,
        pairs: Vec<(RgbImage, RgbImage)>,
    ) -> Vec<Result<AnalysisResult>> {
        join_all(
            pairs
                .into_iter()
                .map(|(reference, current)| self.analyze(reference, current)),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::RiskLevel;
    use image::Rgb;

    fn block_pair(size: u32, block: u32) -> (RgbImage, RgbImage) {
        let reference = RgbImage::from_pixel(size, size, Rgb([200, 200, 200]));
        let mut current = reference.clone();
        let start = (size - block) / 2;
        for y in start..start + block {
            for x in start..start + block {
                current.put_pixel(x, y, Rgb([100, 100, 100]));
            }
        }
        (reference, current)
    }

    #[tokio::test]
    async fn worker_count_is_at_least_one() {
        let pool = AnalysisPool::new(PipelineConfig::default(), 0);
        assert_eq!(pool.worker_count(), 1);
        let default_pool = AnalysisPool::with_default_workers(PipelineConfig::default());
        assert_eq!(default_pool.worker_count(), num_cpus::get().max(1));
    }

    #[tokio::test]
    async fn pool_matches_the_sequential_pipeline() {
        let pool = AnalysisPool::new(PipelineConfig::default(), 2);
        let (reference, current) = block_pair(200, 40);

        let pooled = pool.analyze(reference.clone(), current.clone()).await.unwrap();
        let direct = ChangeDetectionPipeline::default().analyze(reference, current).unwrap();

        assert_eq!(pooled.deviations, direct.deviations);
        assert_eq!(pooled.summary, direct.summary);
    }

    #[tokio::test]
    async fn batch_keeps_input_order() {
        let pool = AnalysisPool::new(PipelineConfig::default(), 3);
        let quiet = (
            RgbImage::from_pixel(64, 64, Rgb([20, 20, 20])),
            RgbImage::from_pixel(64, 64, Rgb([20, 20, 20])),
        );
        let results = pool
            .analyze_batch(vec![block_pair(100, 30), quiet.clone(), block_pair(100, 30), quiet])
            .await;

        assert_eq!(results.len(), 4);
        let counts: Vec<usize> = results
            .iter()
            .map(|result| result.as_ref().unwrap().deviations.len())
            .collect();
        assert_eq!(counts, vec![1, 0, 1, 0]);
        assert_eq!(results[1].as_ref().unwrap().summary.risk_level, RiskLevel::Low);
    }

    #[tokio::test]
    async fn stage_errors_come_back_through_the_pool() {
        let pool = AnalysisPool::new(PipelineConfig::default(), 1);
        let err = pool
            .analyze(RgbImage::new(0, 0), RgbImage::new(4, 4))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Dimension { .. }));
    }
}
