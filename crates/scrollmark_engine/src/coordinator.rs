//! Background-side coordination: per-URL persistence, the screenshot cache
//! and the toolbar badge.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use scrollmark_core::{
    normalize_page_url, BadgeView, Capabilities, MarkSet, Message, Reply, Settings, Slot, URLS,
};
use scrollmark_logging::{scrollmark_debug, scrollmark_info, scrollmark_warn};
use serde_json::{Map, Value};

use crate::badge::BadgeSurface;
use crate::bootstrap::{load_settings, load_url_index};
use crate::capture::ScreenshotSource;
use crate::images::ImageCache;
use crate::storage::{KeyValueStore, StorageError};
use crate::TabId;

#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Lifecycle of one tab as seen by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TabPhase {
    #[default]
    Uninitialized,
    /// A page finished loading; its marks are known.
    Loaded,
    /// The page pushed a mark set since it loaded.
    Marked,
    /// The page cleared its marks.
    Cleared,
}

#[derive(Debug, Clone, Default)]
struct TabRecord {
    phase: TabPhase,
    url: Option<String>,
    // Count reported by the live page; `None` until the page reports.
    live_count: Option<usize>,
}

pub struct Coordinator {
    settings: Arc<dyn KeyValueStore>,
    images: ImageCache,
    capture: Arc<dyn ScreenshotSource>,
    badge: Arc<dyn BadgeSurface>,
    capabilities: Capabilities,
    tabs: Mutex<HashMap<TabId, TabRecord>>,
}

impl Coordinator {
    pub fn new(
        settings: Arc<dyn KeyValueStore>,
        images: Arc<dyn KeyValueStore>,
        capture: Arc<dyn ScreenshotSource>,
        badge: Arc<dyn BadgeSurface>,
        capabilities: Capabilities,
    ) -> Self {
        Self {
            settings,
            images: ImageCache::new(images),
            capture,
            badge,
            capabilities,
            tabs: Mutex::new(HashMap::new()),
        }
    }

    pub async fn settings(&self) -> Settings {
        load_settings(self.settings.as_ref()).await
    }

    pub fn tab_phase(&self, tab: TabId) -> TabPhase {
        self.tabs()
            .get(&tab)
            .map(|record| record.phase)
            .unwrap_or_default()
    }

    /// Handles a message a page sent to the background context. Returns the
    /// reply payload, if the message has one.
    pub async fn handle(
        &self,
        tab: TabId,
        message: Message,
    ) -> Result<Option<Reply>, CoordinatorError> {
        match message {
            Message::PushMarks { marks, url, slot } => self.on_marks(tab, marks, &url, slot).await,
            Message::GetFirstMarks { url, .. } => self.on_get_first_marks(tab, &url).await,
            Message::ClearMarks { url, .. } => {
                self.on_clear_marks(tab, &url).await?;
                Ok(None)
            }
            Message::Screenshot { .. } => Ok(self
                .capture_image(tab)
                .await
                .map(|image| Reply::Image { image })),
            Message::GetMarks { .. } | Message::Mark { .. } | Message::Scroll { .. } => {
                scrollmark_warn!("Tab {} sent a page-bound message to the coordinator", tab);
                Ok(None)
            }
        }
    }

    /// A tab finished navigating to `url`.
    pub async fn navigation_completed(&self, tab: TabId, url: &str) -> Result<(), CoordinatorError> {
        let key = normalize_page_url(url);
        let count = self.persisted_count(&key).await?;
        self.record(tab, |record| {
            record.phase = TabPhase::Loaded;
            record.url = Some(key.clone());
            record.live_count = None;
        });
        scrollmark_debug!("Tab {} loaded {} with {} persisted marks", tab, key, count);
        self.render_badge(tab, count);
        Ok(())
    }

    /// A tab became the active one; its badge is rendered from the live
    /// count, or from the persisted set when the page has not reported yet.
    pub async fn tab_activated(&self, tab: TabId) -> Result<(), CoordinatorError> {
        let record = self.tabs().get(&tab).cloned().unwrap_or_default();
        let count = match (record.live_count, record.url) {
            (Some(count), _) => count,
            (None, Some(url)) => self.persisted_count(&url).await?,
            (None, None) => 0,
        };
        self.render_badge(tab, count);
        Ok(())
    }

    pub fn tab_removed(&self, tab: TabId) {
        self.tabs().remove(&tab);
    }

    async fn on_marks(
        &self,
        tab: TabId,
        marks: MarkSet,
        url: &str,
        slot: Option<Slot>,
    ) -> Result<Option<Reply>, CoordinatorError> {
        let key = normalize_page_url(url);
        let count = marks.count();
        self.record(tab, |record| {
            record.phase = TabPhase::Marked;
            record.url = Some(key.clone());
            record.live_count = Some(count);
        });
        self.render_badge(tab, count);

        let image = self.capture_image(tab).await;

        if self.settings().await.permanent_marks {
            self.persist_marks(&key, &marks).await?;
            self.images.sync(&key, &marks, slot, image.clone()).await?;
            scrollmark_info!("Persisted {} marks for {}", count, key);
        }

        Ok(image.map(|image| Reply::Image { image }))
    }

    async fn on_get_first_marks(
        &self,
        tab: TabId,
        url: &str,
    ) -> Result<Option<Reply>, CoordinatorError> {
        let key = normalize_page_url(url);
        let marks = if self.settings().await.permanent_marks {
            self.persisted_marks(&key).await?
        } else {
            None
        };

        let count = marks.as_ref().map_or(0, MarkSet::count);
        self.record(tab, |record| {
            record.phase = TabPhase::Loaded;
            record.url = Some(key.clone());
            record.live_count = Some(count);
        });
        self.render_badge(tab, count);
        Ok(Some(Reply::Marks { marks }))
    }

    async fn on_clear_marks(&self, tab: TabId, url: &str) -> Result<(), CoordinatorError> {
        let key = normalize_page_url(url);
        self.record(tab, |record| {
            record.phase = TabPhase::Cleared;
            record.url = Some(key.clone());
            record.live_count = Some(0);
        });
        self.render_badge(tab, 0);

        let removed_key = key.clone();
        self.settings
            .update(
                URLS,
                Box::new(move |current: Option<Value>| {
                    let mut index = match current {
                        Some(Value::Object(index)) => index,
                        _ => Map::new(),
                    };
                    index.remove(&removed_key);
                    Some(Value::Object(index))
                }),
            )
            .await?;
        self.images.remove(&key).await?;
        scrollmark_info!("Cleared persisted marks for {}", key);
        Ok(())
    }

    /// Stored mark set for `key` with its cached images attached.
    async fn persisted_marks(&self, key: &str) -> Result<Option<MarkSet>, CoordinatorError> {
        let Some(mut marks) = load_url_index(self.settings.as_ref()).await?.remove(key) else {
            return Ok(None);
        };
        let images = self.images.get(key).await?;
        marks.merge_images(&images);
        Ok(Some(marks))
    }

    async fn persisted_count(&self, key: &str) -> Result<usize, CoordinatorError> {
        if !self.settings().await.permanent_marks {
            return Ok(0);
        }
        Ok(load_url_index(self.settings.as_ref())
            .await?
            .get(key)
            .map_or(0, MarkSet::count))
    }

    async fn persist_marks(&self, key: &str, marks: &MarkSet) -> Result<(), CoordinatorError> {
        let entry = serde_json::to_value(marks.without_images()).map_err(StorageError::Encode)?;
        let key = key.to_string();
        self.settings
            .update(
                URLS,
                Box::new(move |current: Option<Value>| {
                    let mut index = match current {
                        Some(Value::Object(index)) => index,
                        _ => Map::new(),
                    };
                    index.insert(key, entry);
                    Some(Value::Object(index))
                }),
            )
            .await?;
        Ok(())
    }

    async fn capture_image(&self, tab: TabId) -> Option<String> {
        if !self.capabilities.capture {
            return None;
        }
        match self.capture.capture_visible_tab(tab).await {
            Ok(image) => Some(image),
            Err(err) => {
                scrollmark_warn!("Screenshot skipped: {}", err);
                None
            }
        }
    }

    fn render_badge(&self, tab: TabId, count: usize) {
        let view = BadgeView::for_count(count, self.capabilities);
        self.badge.render(tab, &view);
    }

    fn record(&self, tab: TabId, change: impl FnOnce(&mut TabRecord)) {
        change(self.tabs().entry(tab).or_default());
    }

    fn tabs(&self) -> MutexGuard<'_, HashMap<TabId, TabRecord>> {
        self.tabs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
