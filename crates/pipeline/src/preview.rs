//! Debounced, cancellable live preview generation.

use crate::services::{PreferenceStore, ProcessingEngine, SourceStager};
use crate::Result;
use core_types::{
    ImageDimensions, ImageRef, ProcessedImage, ScaleMultiplier, TransformParameters,
};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Trailing-edge debounce: a parameter change within the window resets the
/// timer; only silence for the full window fires a generation.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(300);

/// A published preview. `sequence` ties the frame to the parameter change
/// that produced it.
#[derive(Debug, Clone)]
pub struct PreviewFrame {
    pub sequence: u64,
    pub image: ProcessedImage,
}

#[derive(Clone)]
struct PreviewInput {
    image: ImageRef,
    parameters: TransformParameters,
    dimensions: Option<ImageDimensions>,
}

/// Generates low-cost local previews while the user slides parameters.
///
/// A monotonic sequence number decides whether a finished generation is
/// still the latest request; stale results are discarded, never displayed
/// over fresher ones. The debounce timer is an explicit task handle and is
/// cancelled by the next request; an already-fired generation is left to
/// finish and filtered by sequence instead (no request-cancellation
/// contract exists with the engine).
pub struct LivePreviewController<E, S, P> {
    engine: Arc<E>,
    stager: Arc<S>,
    preferences: Arc<P>,
    sequence: AtomicU64,
    frames: watch::Sender<Option<PreviewFrame>>,
    pending: Mutex<Option<JoinHandle<()>>>,
    last_input: Mutex<Option<PreviewInput>>,
    debounce: Duration,
}

impl<E, S, P> LivePreviewController<E, S, P>
where
    E: ProcessingEngine + 'static,
    S: SourceStager + 'static,
    P: PreferenceStore + 'static,
{
    pub fn new(engine: Arc<E>, stager: Arc<S>, preferences: Arc<P>) -> Arc<Self> {
        let (frames, _) = watch::channel(None);
        Arc::new(Self {
            engine,
            stager,
            preferences,
            sequence: AtomicU64::new(0),
            frames,
            pending: Mutex::new(None),
            last_input: Mutex::new(None),
            debounce: DEBOUNCE_WINDOW,
        })
    }

    /// Receiver for published frames. The latest frame wins; intermediate
    /// frames may be skipped by slow consumers.
    pub fn subscribe(&self) -> watch::Receiver<Option<PreviewFrame>> {
        self.frames.subscribe()
    }

    /// Record a parameter change and (re)arm the debounce timer.
    pub async fn request_preview(
        self: &Arc<Self>,
        image: &ImageRef,
        parameters: &TransformParameters,
        dimensions: Option<ImageDimensions>,
    ) {
        let input = PreviewInput {
            image: image.clone(),
            parameters: parameters.clone(),
            dimensions,
        };
        *self.last_input.lock().await = Some(input.clone());

        if !self.preferences.live_preview_enabled() {
            return;
        }

        let sequence = self.next_sequence();
        let mut pending = self.pending.lock().await;
        if let Some(timer) = pending.take() {
            timer.abort();
        }

        let controller = Arc::clone(self);
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(controller.debounce).await;
            if !controller.is_current(sequence) {
                return;
            }
            let inner = Arc::clone(&controller);
            tokio::spawn(async move {
                inner.generate(sequence, input).await;
            });
        }));
    }

    /// Persisted user preference. Re-enabling regenerates immediately from
    /// the last valid parameter set, outside the debounce window.
    pub async fn set_enabled(self: &Arc<Self>, enabled: bool) -> Result<()> {
        self.preferences.set_live_preview_enabled(enabled)?;
        if !enabled {
            return Ok(());
        }

        let input = self.last_input.lock().await.clone();
        if let Some(input) = input {
            let sequence = self.next_sequence();
            let controller = Arc::clone(self);
            tokio::spawn(async move {
                controller.generate(sequence, input).await;
            });
        }
        Ok(())
    }

    pub fn enabled(&self) -> bool {
        self.preferences.live_preview_enabled()
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, AtomicOrdering::SeqCst) + 1
    }

    fn is_current(&self, sequence: u64) -> bool {
        self.sequence.load(AtomicOrdering::SeqCst) == sequence
    }

    async fn generate(&self, sequence: u64, input: PreviewInput) {
        let request = match engine::params::build_request(
            &input.parameters,
            input.dimensions.as_ref(),
            ScaleMultiplier::One,
        ) {
            Ok(request) => request,
            Err(err) => {
                debug!("skipping preview, parameters invalid: {err}");
                return;
            }
        };

        let source = match self.stager.stage(&input.image.url).await {
            Ok(token) => token,
            Err(err) => {
                warn!("failed to stage preview source: {err}");
                return;
            }
        };

        let output = match self.engine.process(&source, &request, false).await {
            Ok(output) => output,
            Err(err) => {
                warn!("preview generation failed: {err}");
                return;
            }
        };

        if !self.is_current(sequence) {
            debug!("discarding stale preview result (sequence {sequence})");
            return;
        }

        let image = ProcessedImage {
            source_image_id: input.image.id.clone(),
            payload: output.payload,
            dimensions: output.dimensions,
            elapsed_ms: output.elapsed_ms,
        };
        let _ = self.frames.send(Some(PreviewFrame { sequence, image }));
    }
}
