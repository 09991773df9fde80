#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use scrollmark_core::{BadgeView, Capabilities, Position};
use scrollmark_engine::{
    BadgeSurface, CaptureError, Coordinator, KeyValueStore, MemoryStore, ScreenshotSource, TabId,
    Viewport,
};

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(scrollmark_logging::initialize_for_tests);
}

#[derive(Default)]
pub struct FakeViewport {
    position: Mutex<Position>,
    scrolls: Mutex<Vec<Position>>,
}

impl FakeViewport {
    pub fn user_scrolls_to(&self, position: Position) {
        *self.position.lock().unwrap() = position;
    }

    pub fn current(&self) -> Position {
        *self.position.lock().unwrap()
    }

    pub fn scrolls(&self) -> Vec<Position> {
        self.scrolls.lock().unwrap().clone()
    }
}

impl Viewport for FakeViewport {
    fn scroll_position(&self) -> Position {
        self.current()
    }

    fn scroll_to(&self, position: Position) {
        *self.position.lock().unwrap() = position;
        self.scrolls.lock().unwrap().push(position);
    }
}

#[derive(Default)]
pub struct RecordingBadge {
    renders: Mutex<Vec<(TabId, BadgeView)>>,
}

impl RecordingBadge {
    pub fn last(&self, tab: TabId) -> Option<BadgeView> {
        self.renders
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(t, _)| *t == tab)
            .map(|(_, view)| view.clone())
    }
}

impl BadgeSurface for RecordingBadge {
    fn render(&self, tab: TabId, view: &BadgeView) {
        self.renders.lock().unwrap().push((tab, view.clone()));
    }
}

/// Returns `data:image/png;base64,shot-N` with N counting up from 1.
#[derive(Default)]
pub struct CountingCapture {
    taken: AtomicUsize,
}

#[async_trait::async_trait]
impl ScreenshotSource for CountingCapture {
    async fn capture_visible_tab(&self, _tab: TabId) -> Result<String, CaptureError> {
        let n = self.taken.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("data:image/png;base64,shot-{n}"))
    }
}

pub struct Harness {
    pub settings: Arc<MemoryStore>,
    pub images: Arc<MemoryStore>,
    pub badge: Arc<RecordingBadge>,
    pub coordinator: Arc<Coordinator>,
}

impl Harness {
    pub fn new(capabilities: Capabilities) -> Self {
        let settings = Arc::new(MemoryStore::new());
        let images = Arc::new(MemoryStore::new());
        let badge = Arc::new(RecordingBadge::default());
        let coordinator = Arc::new(Coordinator::new(
            settings.clone() as Arc<dyn KeyValueStore>,
            images.clone() as Arc<dyn KeyValueStore>,
            Arc::new(CountingCapture::default()),
            badge.clone(),
            capabilities,
        ));
        Self {
            settings,
            images,
            badge,
            coordinator,
        }
    }
}
