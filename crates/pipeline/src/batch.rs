//! Sequential batch application of one transform across selected images.

use crate::invoker::TransformInvoker;
use crate::replace::{ReplacementCoordinator, VerificationStatus};
use crate::services::{AssetStore, DeliveryProbe, GalleryStore, ProcessingEngine};
use core_types::{ImageRef, ProcessedImage, ProcessingStatus, TransformParameters};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Fixed gap between items so the batch never overwhelms the processing
/// backend. Items run strictly one at a time.
pub const BATCH_PACING: Duration = Duration::from_millis(500);

/// Observation hooks for per-item progress, invoked on every status
/// transition.
#[derive(Default)]
pub struct BatchCallbacks {
    pub on_status: Option<Box<dyn Fn(&str, &ProcessingStatus) + Send + Sync>>,
}

impl BatchCallbacks {
    fn notify(&self, image_id: &str, status: &ProcessingStatus) {
        if let Some(cb) = &self.on_status {
            cb(image_id, status);
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchItem {
    pub image: ImageRef,
    pub status: ProcessingStatus,
    pub preview: Option<ProcessedImage>,
    pub replacement: Option<ImageRef>,
}

/// The state of one batch pass; feed it back to [`BatchOrchestrator::replace_completed`]
/// to commit the successful previews.
#[derive(Debug)]
pub struct BatchRun {
    pub items: Vec<BatchItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    pub image_id: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub completed: usize,
    pub failed: usize,
    pub failures: Vec<BatchFailure>,
}

impl BatchRun {
    pub fn summary(&self) -> BatchSummary {
        let mut completed = 0;
        let mut failures = Vec::new();
        for item in &self.items {
            match &item.status {
                ProcessingStatus::Completed => completed += 1,
                ProcessingStatus::Failed(message) => failures.push(BatchFailure {
                    image_id: item.image.id.clone(),
                    message: message.clone(),
                }),
                _ => {}
            }
        }
        BatchSummary {
            completed,
            failed: failures.len(),
            failures,
        }
    }
}

/// Applies one transform to each selected image, strictly sequentially with
/// [`BATCH_PACING`] between items. A failing item is recorded and the batch
/// moves on; nothing aborts early.
pub struct BatchOrchestrator<E> {
    invoker: TransformInvoker<E>,
    pacing: Duration,
}

impl<E: ProcessingEngine> BatchOrchestrator<E> {
    pub fn new(invoker: TransformInvoker<E>) -> Self {
        Self {
            invoker,
            pacing: BATCH_PACING,
        }
    }

    /// Preview pass: every image gets a preview attempt; statuses end
    /// terminal (`Completed` with a preview, or `Failed`).
    pub async fn run(
        &self,
        images: &[ImageRef],
        parameters: &TransformParameters,
        callbacks: &BatchCallbacks,
    ) -> BatchRun {
        let mut items: Vec<BatchItem> = images
            .iter()
            .map(|image| BatchItem {
                image: image.clone(),
                status: ProcessingStatus::Pending,
                preview: None,
                replacement: None,
            })
            .collect();

        for (index, item) in items.iter_mut().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.pacing).await;
            }

            item.status = ProcessingStatus::Processing;
            callbacks.notify(&item.image.id, &item.status);

            match self.invoker.preview(&item.image, parameters, None).await {
                Ok(preview) => {
                    debug!("batch preview ready for {}", item.image.id);
                    item.preview = Some(preview);
                    item.status = ProcessingStatus::Completed;
                }
                Err(err) => {
                    warn!("batch preview failed for {}: {err}", item.image.id);
                    item.status = ProcessingStatus::Failed(err.to_string());
                }
            }
            callbacks.notify(&item.image.id, &item.status);
        }

        let run = BatchRun { items };
        let summary = run.summary();
        info!(
            "batch preview pass done: {} completed, {} failed",
            summary.completed, summary.failed
        );
        run
    }

    /// Replacement pass: commits only the items holding a `Completed`
    /// preview, with the same sequential pacing discipline. Statuses are
    /// re-entered for this pass; items that previously failed are skipped
    /// untouched.
    pub async fn replace_completed<A, G, P>(
        &self,
        run: &mut BatchRun,
        coordinator: &ReplacementCoordinator<A, G, P>,
        gallery_id: &str,
        callbacks: &BatchCallbacks,
    ) -> BatchSummary
    where
        A: AssetStore,
        G: GalleryStore,
        P: DeliveryProbe,
    {
        let mut first = true;
        for item in run.items.iter_mut() {
            let preview = match (&item.status, &item.preview) {
                (ProcessingStatus::Completed, Some(preview)) => preview.clone(),
                _ => continue,
            };
            if !first {
                tokio::time::sleep(self.pacing).await;
            }
            first = false;

            item.status = ProcessingStatus::Processing;
            callbacks.notify(&item.image.id, &item.status);

            match coordinator.commit(gallery_id, &item.image, &preview).await {
                Ok(outcome) => {
                    if let VerificationStatus::Unverified(reason) = &outcome.verification {
                        warn!(
                            "replacement for {} committed but unverified: {reason}",
                            item.image.id
                        );
                    }
                    item.replacement = Some(outcome.replacement);
                    item.status = ProcessingStatus::Completed;
                }
                Err(err) => {
                    warn!("replacement failed for {}: {err}", item.image.id);
                    item.status = ProcessingStatus::Failed(err.to_string());
                }
            }
            callbacks.notify(&item.image.id, &item.status);
        }

        let summary = run.summary();
        info!(
            "batch replacement pass done: {} completed, {} failed",
            summary.completed, summary.failed
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        sample_image, FakeAssets, FakeEngine, FakeGalleries, FakeProbe,
    };
    use std::sync::{Arc, Mutex};

    fn extension_params() -> TransformParameters {
        TransformParameters::CanvasExtension {
            desired_height: 1200,
            padding_fraction: 0.05,
            white_threshold: 90,
        }
    }

    fn orchestrator(engine: &Arc<FakeEngine>) -> BatchOrchestrator<FakeEngine> {
        BatchOrchestrator::new(TransformInvoker::new(Arc::clone(engine)))
    }

    fn images(n: usize) -> Vec<ImageRef> {
        (1..=n).map(|i| sample_image(&format!("img-{i}"))).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn one_failure_does_not_halt_the_batch() {
        let engine = Arc::new(FakeEngine::default());
        engine.fail_on_call(2);
        let orchestrator = orchestrator(&engine);

        let run = orchestrator
            .run(&images(3), &extension_params(), &BatchCallbacks::default())
            .await;

        assert_eq!(run.items[0].status, ProcessingStatus::Completed);
        assert!(matches!(run.items[1].status, ProcessingStatus::Failed(_)));
        assert_eq!(run.items[2].status, ProcessingStatus::Completed);
        assert_eq!(engine.calls(), 3);

        let summary = run.summary();
        assert_eq!(summary.completed, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failures[0].image_id, "img-2");
    }

    #[tokio::test(start_paused = true)]
    async fn items_run_sequentially_with_pacing() {
        let engine = Arc::new(FakeEngine::default());
        let orchestrator = orchestrator(&engine);

        let started = tokio::time::Instant::now();
        orchestrator
            .run(&images(3), &extension_params(), &BatchCallbacks::default())
            .await;
        // two 500ms gaps between three items
        assert_eq!(started.elapsed(), Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn statuses_transition_through_processing() {
        let engine = Arc::new(FakeEngine::default());
        let orchestrator = orchestrator(&engine);

        let seen: Arc<Mutex<Vec<(String, ProcessingStatus)>>> = Arc::default();
        let sink = Arc::clone(&seen);
        let callbacks = BatchCallbacks {
            on_status: Some(Box::new(move |id, status| {
                sink.lock().unwrap().push((id.to_string(), status.clone()));
            })),
        };

        orchestrator
            .run(&images(1), &extension_params(), &callbacks)
            .await;

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                ("img-1".to_string(), ProcessingStatus::Processing),
                ("img-1".to_string(), ProcessingStatus::Completed),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn replacement_pass_commits_only_completed_items() {
        let engine = Arc::new(FakeEngine::default());
        engine.fail_on_call(2);
        let orchestrator = orchestrator(&engine);

        let mut run = orchestrator
            .run(&images(3), &extension_params(), &BatchCallbacks::default())
            .await;

        let assets = Arc::new(FakeAssets::default());
        let galleries = Arc::new(FakeGalleries::default());
        let coordinator = ReplacementCoordinator::new(
            Arc::clone(&assets),
            Arc::clone(&galleries),
            Arc::new(FakeProbe::default()),
        );

        let summary = orchestrator
            .replace_completed(&mut run, &coordinator, "gal-1", &BatchCallbacks::default())
            .await;

        assert_eq!(summary.completed, 2);
        assert_eq!(assets.uploads(), 2);
        let swapped: Vec<String> = galleries
            .swaps()
            .iter()
            .map(|(_, original, _)| original.clone())
            .collect();
        assert_eq!(swapped, vec!["img-1", "img-3"]);
        assert!(run.items[0].replacement.is_some());
        assert!(run.items[1].replacement.is_none());
    }
}
