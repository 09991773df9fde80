use std::sync::Arc;

use scrollmark_core::{ImageSet, MarkSet, Slot};
use scrollmark_logging::scrollmark_warn;
use serde_json::Value;

use crate::storage::{get_typed, KeyValueStore, StorageError};

/// Screenshots keyed by page URL, kept in their own storage tier because
/// they dwarf everything else.
#[derive(Clone)]
pub struct ImageCache {
    store: Arc<dyn KeyValueStore>,
}

impl ImageCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Images cached for `url`; a malformed entry reads as empty.
    pub async fn get(&self, url: &str) -> Result<ImageSet, StorageError> {
        match get_typed::<ImageSet>(self.store.as_ref(), url).await {
            Ok(images) => Ok(images.unwrap_or_default()),
            Err(StorageError::Malformed { key, source }) => {
                scrollmark_warn!("Ignoring malformed image cache entry for {}: {}", key, source);
                Ok(ImageSet::default())
            }
            Err(err) => Err(err),
        }
    }

    /// Brings the cached images of `url` in line with `marks` after `slot`
    /// was marked: images of empty slots are dropped and `slot` takes
    /// `image`, or loses its old image when there is none. The entry is
    /// deleted once nothing is left.
    pub async fn sync(
        &self,
        url: &str,
        marks: &MarkSet,
        slot: Option<Slot>,
        image: Option<String>,
    ) -> Result<(), StorageError> {
        let mut images = ImageSet::default();
        let current = self.get(url).await?;
        for mark in marks.iter() {
            if Some(mark.index) == slot {
                continue;
            }
            if let Some(existing) = current.get(mark.index) {
                images.set(mark.index, existing.to_string());
            }
        }
        if let (Some(slot), Some(image)) = (slot, image) {
            if marks.get(slot).is_some() {
                images.set(slot, image);
            }
        }

        if images.is_empty() {
            return self.store.delete(url).await;
        }
        let value: Value = serde_json::to_value(&images).map_err(StorageError::Encode)?;
        self.store.set(url, value).await
    }

    pub async fn remove(&self, url: &str) -> Result<(), StorageError> {
        self.store.delete(url).await
    }
}
