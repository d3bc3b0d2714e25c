//! HTTP-backed collaborator clients.

use crate::services::{
    AssetStore, DeliveryProbe, EngineOutput, GalleryStore, ProcessingEngine, SourceStager,
};
use crate::{PipelineError, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use core_types::{EngineRequest, ImageDimensions, ImageRef, OrderedImageEntry, ProcessedImage, ProcessedPayload};
use media_cache::SourceCache;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const PROCESSING_TIMEOUT: Duration = Duration::from_secs(120);
const API_TIMEOUT: Duration = Duration::from_secs(30);
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

fn client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProcessBody<'a> {
    source_url: &'a str,
    upload_to_cloudflare: bool,
    #[serde(flatten)]
    request: &'a EngineRequest,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProcessResponse {
    result_url: Option<String>,
    result_base64: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    #[serde(default)]
    elapsed_ms: u64,
    asset: Option<AssetRecord>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetRecord {
    id: String,
    url: String,
    #[serde(default)]
    filename: String,
}

impl AssetRecord {
    fn into_image_ref(self) -> ImageRef {
        ImageRef {
            id: self.id,
            url: self.url,
            filename: self.filename,
            metadata: Default::default(),
        }
    }
}

/// Client for the remote transform engine.
pub struct HttpProcessingEngine {
    client: reqwest::Client,
    base_url: String,
}

impl HttpProcessingEngine {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: client(PROCESSING_TIMEOUT),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ProcessingEngine for HttpProcessingEngine {
    async fn process(
        &self,
        processing_url: &str,
        request: &EngineRequest,
        upload: bool,
    ) -> Result<EngineOutput> {
        let endpoint = format!("{}/transforms/{}", self.base_url, request.kind().as_str());
        debug!("POST {endpoint} source={processing_url} upload={upload}");

        let response = self
            .client
            .post(&endpoint)
            .json(&ProcessBody {
                source_url: processing_url,
                upload_to_cloudflare: upload,
                request,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(PipelineError::RemoteProcessing(format!(
                "engine returned {status}: {detail}"
            )));
        }

        let body: ProcessResponse = response.json().await?;
        let payload = match (body.result_url, body.result_base64) {
            (Some(url), _) => ProcessedPayload::Url(url),
            (None, Some(b64)) => ProcessedPayload::Bytes(
                general_purpose::STANDARD
                    .decode(b64)
                    .map_err(|e| PipelineError::RemoteProcessing(format!("bad result encoding: {e}")))?,
            ),
            (None, None) => {
                return Err(PipelineError::RemoteProcessing(
                    "engine returned no result".to_string(),
                ))
            }
        };

        let dimensions = match (body.width, body.height) {
            (Some(width), Some(height)) => Some(ImageDimensions { width, height }),
            _ => None,
        };

        Ok(EngineOutput {
            payload,
            dimensions,
            elapsed_ms: body.elapsed_ms,
            uploaded: body.asset.map(AssetRecord::into_image_ref),
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadBody<'a> {
    source_image_id: &'a str,
    filename: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data_base64: Option<String>,
}

/// Client for the asset store behind the delivery network.
pub struct HttpAssetStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAssetStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: client(API_TIMEOUT),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl AssetStore for HttpAssetStore {
    async fn upload(&self, image: &ProcessedImage, filename: &str) -> Result<ImageRef> {
        let (source_url, data_base64) = match &image.payload {
            ProcessedPayload::Url(url) => (Some(url.as_str()), None),
            ProcessedPayload::Bytes(bytes) => {
                (None, Some(general_purpose::STANDARD.encode(bytes)))
            }
        };

        let response = self
            .client
            .post(format!("{}/assets", self.base_url))
            .json(&UploadBody {
                source_image_id: &image.source_image_id,
                filename,
                source_url,
                data_base64,
            })
            .send()
            .await
            .map_err(|e| PipelineError::Upload(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(PipelineError::Upload(format!(
                "asset store returned {status}: {detail}"
            )));
        }

        let record: AssetRecord = response
            .json()
            .await
            .map_err(|e| PipelineError::Upload(e.to_string()))?;
        Ok(record.into_image_ref())
    }
}

/// Client for the gallery service.
pub struct HttpGalleryStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGalleryStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: client(API_TIMEOUT),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplaceBody<'a> {
    replacement_id: &'a str,
}

#[derive(Serialize)]
struct OrderBody<'a> {
    entries: &'a [OrderedImageEntry],
}

#[async_trait]
impl GalleryStore for HttpGalleryStore {
    async fn replace_image(
        &self,
        gallery_id: &str,
        original_image_id: &str,
        replacement_id: &str,
    ) -> Result<ImageRef> {
        let endpoint = format!(
            "{}/galleries/{gallery_id}/images/{original_image_id}/replacement",
            self.base_url
        );
        let swap_failed = |message: String| PipelineError::Swap {
            image_id: original_image_id.to_string(),
            message,
        };

        let response = self
            .client
            .post(endpoint)
            .json(&ReplaceBody { replacement_id })
            .send()
            .await
            .map_err(|e| swap_failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(swap_failed(format!("gallery returned {status}: {detail}")));
        }

        let record: AssetRecord = response
            .json()
            .await
            .map_err(|e| swap_failed(e.to_string()))?;
        Ok(record.into_image_ref())
    }

    async fn persist_order(&self, gallery_id: &str, entries: &[OrderedImageEntry]) -> Result<()> {
        let response = self
            .client
            .put(format!("{}/galleries/{gallery_id}/order", self.base_url))
            .json(&OrderBody { entries })
            .send()
            .await
            .map_err(|e| PipelineError::OrderPersist(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(PipelineError::OrderPersist(format!(
                "gallery returned {status}: {detail}"
            )));
        }
        Ok(())
    }
}

/// GET-based availability probe with a cache-busting query parameter, so a
/// post-swap read never hits a stale CDN entry.
pub struct HttpDeliveryProbe {
    client: reqwest::Client,
}

impl HttpDeliveryProbe {
    pub fn new() -> Self {
        Self {
            client: client(PROBE_TIMEOUT),
        }
    }
}

impl Default for HttpDeliveryProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeliveryProbe for HttpDeliveryProbe {
    async fn probe(&self, url: &str) -> std::result::Result<(), String> {
        let separator = if url.contains('?') { '&' } else { '?' };
        let busted = format!("{url}{separator}cb={}", chrono::Utc::now().timestamp_millis());

        let response = self
            .client
            .get(&busted)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(format!("delivery returned {status}"))
        }
    }
}

/// Stager that keeps pristine source bytes in the local [`SourceCache`],
/// fetching them from the delivery network at most once per URL.
pub struct CachedSourceStager {
    client: reqwest::Client,
    cache: Arc<SourceCache>,
}

impl CachedSourceStager {
    pub fn new(cache: Arc<SourceCache>) -> Self {
        Self {
            client: client(API_TIMEOUT),
            cache,
        }
    }
}

#[async_trait]
impl SourceStager for CachedSourceStager {
    async fn stage(&self, image_url: &str) -> Result<String> {
        let source = engine::variant::processing_url(image_url);
        if let Some(path) = self.cache.lookup(&source)? {
            return Ok(path.to_string_lossy().into_owned());
        }

        let response = self.client.get(&source).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::RemoteProcessing(format!(
                "source fetch returned {status}"
            )));
        }
        let bytes = response.bytes().await?;
        let path = self.cache.store(&source, &bytes)?;
        Ok(path.to_string_lossy().into_owned())
    }
}
