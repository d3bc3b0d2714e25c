//! Client-side orchestration for the gallery image transform pipeline:
//! preview and commit invocation against the remote processing engine,
//! debounced live preview, atomic gallery replacement, sequential batch
//! processing, and manual/sorted gallery ordering.

use thiserror::Error;

pub mod batch;
pub mod invoker;
pub mod ordering;
pub mod preview;
pub mod remote;
pub mod replace;
pub mod services;

#[cfg(test)]
pub(crate) mod testing;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Raised before any network call; surfaced verbatim, never retried.
    #[error("validation failed: {0}")]
    Validation(#[from] engine::EngineError),

    /// The processing engine rejected or failed the transform.
    #[error("processing engine failed: {0}")]
    RemoteProcessing(String),

    /// Asset upload failed after a successful transform; the computed
    /// result stays with the caller so upload can be retried without
    /// recomputing.
    #[error("asset upload failed: {0}")]
    Upload(String),

    /// The gallery-reference swap failed after a successful upload. The
    /// uploaded asset now exists unreferenced; reported distinctly so
    /// operators can reconcile.
    #[error("gallery swap failed for image {image_id}: {message}")]
    Swap { image_id: String, message: String },

    /// Reorder write failed; local state has been rolled back to the last
    /// persisted order.
    #[error("order persistence failed: {0}")]
    OrderPersist(String),

    /// A commit for this (gallery, image) pair is already mid-flight.
    #[error("a replacement for image {image_id} is already in progress")]
    CommitInFlight { image_id: String },

    /// A commit for this pair started less than the lockout window ago.
    #[error("replacement for image {image_id} was submitted {since_ms}ms ago; duplicate ignored")]
    CommitLockout { image_id: String, since_ms: u64 },

    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("source cache error: {0}")]
    Cache(#[from] media_cache::CacheError),

    #[error("settings error: {0}")]
    Settings(#[from] app_settings::AppSettingsError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

pub use batch::{BatchCallbacks, BatchItem, BatchOrchestrator, BatchRun, BatchSummary};
pub use invoker::TransformInvoker;
pub use ordering::OrderingEngine;
pub use preview::{LivePreviewController, PreviewFrame};
pub use replace::{CommitOutcome, ReplacementCoordinator, VerificationStatus};
pub use services::{
    AssetStore, DeliveryProbe, EngineOutput, GalleryStore, PreferenceStore, ProcessingEngine,
    SourceStager,
};
