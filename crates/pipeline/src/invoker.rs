//! Uniform invocation path for the three transform kinds.

use crate::services::{EngineOutput, ProcessingEngine};
use crate::Result;
use core_types::{
    ImageDimensions, ImageRef, ProcessedImage, ScaleMultiplier, TransformParameters,
};
use std::sync::Arc;
use tracing::debug;

/// Issues preview and commit-path requests against the processing engine.
///
/// Every call validates locally, resolves the processing URL (so the engine
/// reads pristine source bytes, not whatever variant the UI shows), and
/// returns an ephemeral result. The source image is never mutated. Failures
/// are surfaced typed and never retried here: a retry is a user action,
/// since it changes billed compute.
pub struct TransformInvoker<E> {
    engine: Arc<E>,
}

impl<E: ProcessingEngine> TransformInvoker<E> {
    pub fn new(engine: Arc<E>) -> Self {
        Self { engine }
    }

    /// Base-resolution preview. Leaves all stored state untouched.
    pub async fn preview(
        &self,
        image: &ImageRef,
        parameters: &TransformParameters,
        source: Option<&ImageDimensions>,
    ) -> Result<ProcessedImage> {
        let (processed, _) = self
            .run(image, parameters, source, ScaleMultiplier::One, false)
            .await?;
        Ok(processed)
    }

    /// Preview at 2x/4x output resolution. Target dimensions scale; the
    /// composition established at base resolution does not.
    pub async fn preview_high_res(
        &self,
        image: &ImageRef,
        parameters: &TransformParameters,
        source: Option<&ImageDimensions>,
        multiplier: ScaleMultiplier,
    ) -> Result<ProcessedImage> {
        let (processed, _) = self
            .run(image, parameters, source, multiplier, false)
            .await?;
        Ok(processed)
    }

    /// Commit-path processing: the engine also persists the result to the
    /// delivery network and returns the new asset identity.
    pub async fn process_for_commit(
        &self,
        image: &ImageRef,
        parameters: &TransformParameters,
        source: Option<&ImageDimensions>,
        multiplier: ScaleMultiplier,
    ) -> Result<(ProcessedImage, Option<ImageRef>)> {
        self.run(image, parameters, source, multiplier, true).await
    }

    async fn run(
        &self,
        image: &ImageRef,
        parameters: &TransformParameters,
        source: Option<&ImageDimensions>,
        multiplier: ScaleMultiplier,
        upload: bool,
    ) -> Result<(ProcessedImage, Option<ImageRef>)> {
        let request = engine::params::build_request(parameters, source, multiplier)?;
        let processing_url = engine::variant::processing_url(&image.url);
        debug!(
            "invoking {} for image {} at {}x",
            request.kind().as_str(),
            image.id,
            request.scale_multiplier
        );

        let EngineOutput {
            payload,
            dimensions,
            elapsed_ms,
            uploaded,
        } = self.engine.process(&processing_url, &request, upload).await?;

        Ok((
            ProcessedImage {
                source_image_id: image.id.clone(),
                payload,
                dimensions,
                elapsed_ms,
            },
            uploaded,
        ))
    }
}
