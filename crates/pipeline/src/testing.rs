//! In-memory collaborator fakes with injectable failures and call counters.

use crate::services::{
    AssetStore, DeliveryProbe, EngineOutput, GalleryStore, PreferenceStore, ProcessingEngine,
    SourceStager,
};
use crate::{PipelineError, Result};
use app_settings::ProcessingMethod;
use async_trait::async_trait;
use core_types::{
    EngineRequest, ImageDimensions, ImageRef, OrderedImageEntry, ProcessedImage, ProcessedPayload,
};
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub(crate) fn sample_image(id: &str) -> ImageRef {
    ImageRef {
        id: id.to_string(),
        url: format!("https://imagedelivery.net/acct/{id}/public"),
        filename: format!("{id}.jpg"),
        metadata: Default::default(),
    }
}

pub(crate) fn processed_for(id: &str) -> ProcessedImage {
    ProcessedImage {
        source_image_id: id.to_string(),
        payload: ProcessedPayload::Url(format!("https://processed.example/{id}")),
        dimensions: Some(ImageDimensions {
            width: 1920,
            height: 1080,
        }),
        elapsed_ms: 42,
    }
}

#[derive(Default)]
pub(crate) struct FakeEngine {
    calls: AtomicUsize,
    fail_remaining: AtomicUsize,
    fail_calls: Mutex<HashSet<usize>>,
    delays: Mutex<VecDeque<Duration>>,
    last_call: Mutex<Option<(String, EngineRequest, bool)>>,
}

impl FakeEngine {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Fail the next `n` calls.
    pub fn fail_next(&self, n: usize) {
        self.fail_remaining.store(n, Ordering::SeqCst);
    }

    /// Fail call number `n` (1-based).
    pub fn fail_on_call(&self, n: usize) {
        self.fail_calls.lock().expect("fake poisoned").insert(n);
    }

    /// Per-call artificial latency, consumed in call order.
    pub fn set_delays(&self, delays: &[Duration]) {
        *self.delays.lock().expect("fake poisoned") = delays.iter().copied().collect();
    }

    pub fn last_call(&self) -> Option<(String, EngineRequest, bool)> {
        self.last_call.lock().expect("fake poisoned").clone()
    }
}

#[async_trait]
impl ProcessingEngine for FakeEngine {
    async fn process(
        &self,
        processing_url: &str,
        request: &EngineRequest,
        upload: bool,
    ) -> Result<EngineOutput> {
        let call_no = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        *self.last_call.lock().expect("fake poisoned") =
            Some((processing_url.to_string(), request.clone(), upload));

        let delay = self.delays.lock().expect("fake poisoned").pop_front();
        if let Some(delay) = delay {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        let numbered_failure = self
            .fail_calls
            .lock()
            .expect("fake poisoned")
            .contains(&call_no);
        let counted_failure = self
            .fail_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if numbered_failure || counted_failure {
            return Err(PipelineError::RemoteProcessing(
                "synthetic engine failure".to_string(),
            ));
        }

        Ok(EngineOutput {
            payload: ProcessedPayload::Url(format!("https://processed.example/{call_no}")),
            dimensions: Some(ImageDimensions {
                width: 1920,
                height: 1080,
            }),
            elapsed_ms: 5,
            uploaded: if upload {
                Some(sample_image(&format!("uploaded-{call_no}")))
            } else {
                None
            },
        })
    }
}

#[derive(Default)]
pub(crate) struct FakeAssets {
    uploads: AtomicUsize,
    fail_remaining: AtomicUsize,
    delay: Option<Duration>,
}

impl FakeAssets {
    pub fn with_upload_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Successful uploads performed.
    pub fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn fail_next(&self, n: usize) {
        self.fail_remaining.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl AssetStore for FakeAssets {
    async fn upload(&self, image: &ProcessedImage, filename: &str) -> Result<ImageRef> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let failing = self
            .fail_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(PipelineError::Upload(
                "synthetic upload failure".to_string(),
            ));
        }

        self.uploads.fetch_add(1, Ordering::SeqCst);
        let id = format!("{}-replacement", image.source_image_id);
        Ok(ImageRef {
            id: id.clone(),
            url: format!("https://imagedelivery.net/acct/{id}/public"),
            filename: filename.to_string(),
            metadata: Default::default(),
        })
    }
}

#[derive(Default)]
pub(crate) struct FakeGalleries {
    swaps: Mutex<Vec<(String, String, String)>>,
    persists: Mutex<Vec<Vec<OrderedImageEntry>>>,
    fail_swaps_remaining: AtomicUsize,
    fail_persists_remaining: AtomicUsize,
}

impl FakeGalleries {
    /// Recorded swaps as (gallery, original, replacement).
    pub fn swaps(&self) -> Vec<(String, String, String)> {
        self.swaps.lock().expect("fake poisoned").clone()
    }

    /// Every successfully persisted ordering, oldest first.
    pub fn persisted(&self) -> Vec<Vec<OrderedImageEntry>> {
        self.persists.lock().expect("fake poisoned").clone()
    }

    pub fn fail_next_swaps(&self, n: usize) {
        self.fail_swaps_remaining.store(n, Ordering::SeqCst);
    }

    pub fn fail_next_persists(&self, n: usize) {
        self.fail_persists_remaining.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl GalleryStore for FakeGalleries {
    async fn replace_image(
        &self,
        gallery_id: &str,
        original_image_id: &str,
        replacement_id: &str,
    ) -> Result<ImageRef> {
        let failing = self
            .fail_swaps_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(PipelineError::Swap {
                image_id: original_image_id.to_string(),
                message: "synthetic swap failure".to_string(),
            });
        }

        self.swaps.lock().expect("fake poisoned").push((
            gallery_id.to_string(),
            original_image_id.to_string(),
            replacement_id.to_string(),
        ));
        Ok(sample_image(replacement_id))
    }

    async fn persist_order(&self, _gallery_id: &str, entries: &[OrderedImageEntry]) -> Result<()> {
        let failing = self
            .fail_persists_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(PipelineError::OrderPersist(
                "synthetic persist failure".to_string(),
            ));
        }
        self.persists
            .lock()
            .expect("fake poisoned")
            .push(entries.to_vec());
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakeProbe {
    probes: AtomicUsize,
    fail_remaining: AtomicUsize,
}

impl FakeProbe {
    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn fail_next(&self, n: usize) {
        self.fail_remaining.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl DeliveryProbe for FakeProbe {
    async fn probe(&self, _url: &str) -> std::result::Result<(), String> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .fail_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            Err("synthetic probe failure".to_string())
        } else {
            Ok(())
        }
    }
}

#[derive(Default)]
pub(crate) struct FakeStager;

#[async_trait]
impl SourceStager for FakeStager {
    async fn stage(&self, image_url: &str) -> Result<String> {
        Ok(format!("cached:{image_url}"))
    }
}

pub(crate) struct FakePreferences {
    live_preview: AtomicBool,
    method: Mutex<ProcessingMethod>,
}

impl Default for FakePreferences {
    fn default() -> Self {
        Self {
            live_preview: AtomicBool::new(true),
            method: Mutex::new(ProcessingMethod::Cloud),
        }
    }
}

impl FakePreferences {
    pub fn disabled() -> Self {
        Self {
            live_preview: AtomicBool::new(false),
            ..Self::default()
        }
    }
}

impl PreferenceStore for FakePreferences {
    fn live_preview_enabled(&self) -> bool {
        self.live_preview.load(Ordering::SeqCst)
    }

    fn set_live_preview_enabled(&self, enabled: bool) -> Result<()> {
        self.live_preview.store(enabled, Ordering::SeqCst);
        Ok(())
    }

    fn processing_method(&self) -> ProcessingMethod {
        *self.method.lock().expect("fake poisoned")
    }

    fn set_processing_method(&self, method: ProcessingMethod) -> Result<()> {
        *self.method.lock().expect("fake poisoned") = method;
        Ok(())
    }
}
