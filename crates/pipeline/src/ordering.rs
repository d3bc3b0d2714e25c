//! Manual and attribute-derived gallery ordering with optimistic persistence.

use crate::services::GalleryStore;
use crate::{PipelineError, Result};
use core_types::{ImageRef, OrderMode, OrderedImageEntry, SortCriterion, SortDirection};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Maintains a gallery's visible image sequence.
///
/// Mutations apply optimistically to local state, then persist. The rollback
/// target on a failed write is the last **persisted** order, tracked
/// explicitly, not whatever order preceded the failing edit.
pub struct OrderingEngine<G> {
    store: Arc<G>,
    gallery_id: String,
    images: Vec<ImageRef>,
    mode: OrderMode,
    last_persisted: Vec<OrderedImageEntry>,
}

impl<G: GalleryStore> OrderingEngine<G> {
    /// Build from the gallery's images and, when present, its persisted
    /// ordering. Without explicit entries the incoming index order stands.
    pub fn new(
        store: Arc<G>,
        gallery_id: impl Into<String>,
        images: Vec<ImageRef>,
        persisted: Option<Vec<OrderedImageEntry>>,
    ) -> Self {
        let mut ordering = Self {
            store,
            gallery_id: gallery_id.into(),
            images,
            mode: OrderMode::Manual,
            last_persisted: Vec::new(),
        };
        if let Some(entries) = persisted {
            ordering.arrange_by(&entries);
        }
        ordering.last_persisted = ordering.entries();
        ordering
    }

    pub fn images(&self) -> &[ImageRef] {
        &self.images
    }

    pub fn mode(&self) -> &OrderMode {
        &self.mode
    }

    /// Current order as dense 0-based entries.
    pub fn entries(&self) -> Vec<OrderedImageEntry> {
        self.images
            .iter()
            .enumerate()
            .map(|(index, image)| OrderedImageEntry {
                image_id: image.id.clone(),
                order: index as u32,
            })
            .collect()
    }

    /// Drag-end: move the image at `from` to `to`, persist optimistically.
    /// While sorted, dragging is a silent no-op; sorting is read-only with
    /// respect to manual placement.
    pub async fn drag_reorder(&mut self, from: usize, to: usize) -> Result<()> {
        if matches!(self.mode, OrderMode::Sorted { .. }) {
            debug!("drag ignored while sorted");
            return Ok(());
        }
        if from >= self.images.len() || to >= self.images.len() {
            return Err(PipelineError::Validation(engine::EngineError::OutOfRange {
                field: "drag_index",
                value: format!("{from}->{to}"),
                expected: "indices within the gallery",
            }));
        }

        let moved = self.images.remove(from);
        self.images.insert(to, moved);
        self.persist_current().await
    }

    /// Switch ordering mode. Leaving sorted mode snapshots the visible
    /// sorted order as the new manual baseline and persists it, so leaving
    /// sort never discards the user's browsing order.
    pub async fn set_mode(&mut self, mode: OrderMode) -> Result<()> {
        if self.mode == mode {
            return Ok(());
        }
        let entering_sort = matches!(mode, OrderMode::Sorted { .. });
        self.mode = mode;
        if entering_sort {
            self.resort_and_persist().await
        } else {
            self.persist_current().await
        }
    }

    /// Change the sort criterion; only meaningful while sorted.
    pub async fn set_criterion(&mut self, criterion: SortCriterion) -> Result<()> {
        if let OrderMode::Sorted { direction, .. } = &self.mode {
            self.mode = OrderMode::Sorted {
                criterion,
                direction: *direction,
            };
            self.resort_and_persist().await
        } else {
            Ok(())
        }
    }

    /// Flip the sort direction; only meaningful while sorted.
    pub async fn set_direction(&mut self, direction: SortDirection) -> Result<()> {
        if let OrderMode::Sorted { criterion, .. } = &self.mode {
            self.mode = OrderMode::Sorted {
                criterion: criterion.clone(),
                direction,
            };
            self.resort_and_persist().await
        } else {
            Ok(())
        }
    }

    /// Reconcile a committed replacement: the image keeps its position under
    /// its new identity. The gallery's own record already changed in the
    /// atomic swap; no extra persist is needed here.
    pub fn apply_replacement(&mut self, original_image_id: &str, replacement: ImageRef) {
        for entry in &mut self.last_persisted {
            if entry.image_id == original_image_id {
                entry.image_id = replacement.id.clone();
            }
        }
        if let Some(slot) = self
            .images
            .iter_mut()
            .find(|image| image.id == original_image_id)
        {
            *slot = replacement;
        }
    }

    async fn resort_and_persist(&mut self) -> Result<()> {
        if let OrderMode::Sorted {
            criterion,
            direction,
        } = &self.mode
        {
            let criterion = criterion.clone();
            let direction = *direction;
            self.images
                .sort_by(|a, b| engine::sort::compare(a, b, &criterion, direction));
        }
        self.persist_current().await
    }

    async fn persist_current(&mut self) -> Result<()> {
        let entries = self.entries();
        if entries == self.last_persisted {
            debug!("order unchanged; skipping persist");
            return Ok(());
        }

        match self.store.persist_order(&self.gallery_id, &entries).await {
            Ok(()) => {
                self.last_persisted = entries;
                Ok(())
            }
            Err(err) => {
                warn!("order persist failed, rolling back to last known-good: {err}");
                let rollback = self.last_persisted.clone();
                self.arrange_by(&rollback);
                Err(match err {
                    PipelineError::OrderPersist(_) => err,
                    other => PipelineError::OrderPersist(other.to_string()),
                })
            }
        }
    }

    /// Reorder `images` to match the given entries; ids the entries don't
    /// know keep their relative order at the end.
    fn arrange_by(&mut self, entries: &[OrderedImageEntry]) {
        let rank: HashMap<&str, u32> = entries
            .iter()
            .map(|entry| (entry.image_id.as_str(), entry.order))
            .collect();
        self.images.sort_by_key(|image| {
            rank.get(image.id.as_str()).copied().unwrap_or(u32::MAX)
        });
    }
}
