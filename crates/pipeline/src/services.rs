//! Contracts for the external collaborators the pipeline talks to. The
//! implementations behind these traits (REST services, delivery network,
//! asset store) are out of scope; HTTP-backed clients live in
//! [`crate::remote`].

use crate::Result;
use app_settings::{AppSettings, ProcessingMethod};
use async_trait::async_trait;
use core_types::{
    EngineRequest, ImageDimensions, ImageRef, OrderedImageEntry, ProcessedImage, ProcessedPayload,
};

/// What the processing engine hands back for one transform invocation.
#[derive(Debug, Clone)]
pub struct EngineOutput {
    pub payload: ProcessedPayload,
    pub dimensions: Option<ImageDimensions>,
    pub elapsed_ms: u64,
    /// Present only when the call asked the engine to persist the result
    /// to the delivery network.
    pub uploaded: Option<ImageRef>,
}

/// The remote transform engine. `upload = false` is the preview path and
/// must leave all stored state untouched; `upload = true` additionally
/// persists the result and returns the new asset identity.
#[async_trait]
pub trait ProcessingEngine: Send + Sync {
    async fn process(
        &self,
        processing_url: &str,
        request: &EngineRequest,
        upload: bool,
    ) -> Result<EngineOutput>;
}

/// The asset store behind the delivery network.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Upload processed bytes/URL, obtaining a new stable image identity.
    async fn upload(&self, image: &ProcessedImage, filename: &str) -> Result<ImageRef>;
}

/// The gallery service owning image membership and ordering.
#[async_trait]
pub trait GalleryStore: Send + Sync {
    /// Swap the gallery's reference from `original_image_id` to
    /// `replacement_id` in one persisted write. Atomicity is this
    /// collaborator's contract; the pipeline depends on it.
    async fn replace_image(
        &self,
        gallery_id: &str,
        original_image_id: &str,
        replacement_id: &str,
    ) -> Result<ImageRef>;

    /// Persist a full ordering. The collaborator rejects partial or
    /// invalid permutations.
    async fn persist_order(&self, gallery_id: &str, entries: &[OrderedImageEntry]) -> Result<()>;
}

/// Post-swap availability check against the delivery network.
#[async_trait]
pub trait DeliveryProbe: Send + Sync {
    async fn probe(&self, url: &str) -> std::result::Result<(), String>;
}

/// Stages source bytes for the live preview path, returning a
/// cached-local-path token the preview engine can read cheaply.
#[async_trait]
pub trait SourceStager: Send + Sync {
    async fn stage(&self, image_url: &str) -> Result<String>;
}

/// Session-spanning user preferences consumed by the pipeline.
pub trait PreferenceStore: Send + Sync {
    fn live_preview_enabled(&self) -> bool;
    fn set_live_preview_enabled(&self, enabled: bool) -> Result<()>;
    fn processing_method(&self) -> ProcessingMethod;
    fn set_processing_method(&self, method: ProcessingMethod) -> Result<()>;
}

/// Preferences backed by the on-disk settings file (registry on Windows).
#[derive(Debug, Default)]
pub struct DiskPreferences;

impl PreferenceStore for DiskPreferences {
    fn live_preview_enabled(&self) -> bool {
        AppSettings::load()
            .map(|s| s.live_preview_enabled)
            .unwrap_or(true)
    }

    fn set_live_preview_enabled(&self, enabled: bool) -> Result<()> {
        let mut settings = AppSettings::load().unwrap_or_default();
        settings.set_live_preview_enabled(enabled);
        settings.save()?;
        Ok(())
    }

    fn processing_method(&self) -> ProcessingMethod {
        AppSettings::load()
            .map(|s| s.processing_method)
            .unwrap_or_default()
    }

    fn set_processing_method(&self, method: ProcessingMethod) -> Result<()> {
        let mut settings = AppSettings::load().unwrap_or_default();
        settings.set_processing_method(method);
        settings.save()?;
        Ok(())
    }
}
