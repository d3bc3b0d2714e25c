//! Turns a confirmed preview into a durable gallery mutation.

use crate::services::{AssetStore, DeliveryProbe, GalleryStore};
use crate::{PipelineError, Result};
use core_types::{ImageRef, ProcessedImage};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Minimum gap between commit attempts on the same (gallery, image) pair.
/// Guards against duplicate submissions from repeated user input before the
/// UI visibly updates.
pub const COMMIT_LOCKOUT: Duration = Duration::from_secs(2);

const VERIFY_RETRY_DELAY: Duration = Duration::from_millis(750);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommitPhase {
    Idle,
    Uploading,
    Swapping,
    Verifying,
}

#[derive(Debug)]
struct CommitSlot {
    phase: CommitPhase,
    last_attempt: Instant,
}

/// Post-swap availability outcome. `Unverified` is a warning: the swap has
/// committed and is never rolled back over a propagation-delay read failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationStatus {
    Verified,
    Unverified(String),
}

#[derive(Debug, Clone)]
pub struct CommitOutcome {
    pub original_image_id: String,
    pub replacement: ImageRef,
    pub verification: VerificationStatus,
}

/// Runs the commit state machine `Idle → Uploading → Swapping → Verifying`
/// per (gallery, image) key, with one explicit state per key instead of
/// per-flow boolean flags.
pub struct ReplacementCoordinator<A, G, P> {
    assets: Arc<A>,
    galleries: Arc<G>,
    probe: Arc<P>,
    slots: Mutex<HashMap<(String, String), CommitSlot>>,
    lockout: Duration,
    verify_retry_delay: Duration,
}

impl<A, G, P> ReplacementCoordinator<A, G, P>
where
    A: AssetStore,
    G: GalleryStore,
    P: DeliveryProbe,
{
    pub fn new(assets: Arc<A>, galleries: Arc<G>, probe: Arc<P>) -> Self {
        Self {
            assets,
            galleries,
            probe,
            slots: Mutex::new(HashMap::new()),
            lockout: COMMIT_LOCKOUT,
            verify_retry_delay: VERIFY_RETRY_DELAY,
        }
    }

    /// Upload the processed result, atomically swap the gallery reference,
    /// then verify availability.
    ///
    /// Rejects while an earlier commit for the same pair is mid-flight, and
    /// within [`COMMIT_LOCKOUT`] of the most recent attempt's start. Either
    /// upload and swap both take effect, or the caller observes neither.
    pub async fn commit(
        &self,
        gallery_id: &str,
        original: &ImageRef,
        processed: &ProcessedImage,
    ) -> Result<CommitOutcome> {
        let key = (gallery_id.to_string(), original.id.clone());

        {
            let mut slots = self.slots.lock().await;
            if let Some(slot) = slots.get(&key) {
                if slot.phase != CommitPhase::Idle {
                    return Err(PipelineError::CommitInFlight {
                        image_id: original.id.clone(),
                    });
                }
                let since = slot.last_attempt.elapsed();
                if since < self.lockout {
                    return Err(PipelineError::CommitLockout {
                        image_id: original.id.clone(),
                        since_ms: since.as_millis() as u64,
                    });
                }
            }
            slots.insert(
                key.clone(),
                CommitSlot {
                    phase: CommitPhase::Uploading,
                    last_attempt: Instant::now(),
                },
            );
        }

        let uploaded = match self.assets.upload(processed, &original.filename).await {
            Ok(uploaded) => uploaded,
            Err(err) => {
                self.transition(&key, CommitPhase::Idle).await;
                return Err(match err {
                    PipelineError::Upload(_) => err,
                    other => PipelineError::Upload(other.to_string()),
                });
            }
        };
        debug!(
            "uploaded replacement {} for image {}",
            uploaded.id, original.id
        );

        self.transition(&key, CommitPhase::Swapping).await;
        let replacement = match self
            .galleries
            .replace_image(gallery_id, &original.id, &uploaded.id)
            .await
        {
            Ok(replacement) => replacement,
            Err(err) => {
                self.transition(&key, CommitPhase::Idle).await;
                return Err(match err {
                    PipelineError::Swap { .. } => err,
                    other => PipelineError::Swap {
                        image_id: original.id.clone(),
                        message: other.to_string(),
                    },
                });
            }
        };

        self.transition(&key, CommitPhase::Verifying).await;
        let verification = self.verify(&replacement.url).await;
        self.transition(&key, CommitPhase::Idle).await;

        Ok(CommitOutcome {
            original_image_id: original.id.clone(),
            replacement,
            verification,
        })
    }

    /// One probe, one retry after a short delay. Failure downgrades to a
    /// warning: the swap has already happened.
    async fn verify(&self, url: &str) -> VerificationStatus {
        if self.probe.probe(url).await.is_ok() {
            return VerificationStatus::Verified;
        }
        tokio::time::sleep(self.verify_retry_delay).await;
        match self.probe.probe(url).await {
            Ok(()) => VerificationStatus::Verified,
            Err(reason) => {
                warn!("replacement committed but not yet readable at {url}: {reason}");
                VerificationStatus::Unverified(reason)
            }
        }
    }

    async fn transition(&self, key: &(String, String), to: CommitPhase) {
        let mut slots = self.slots.lock().await;
        if let Some(slot) = slots.get_mut(key) {
            slot.phase = to;
        }
    }
}
