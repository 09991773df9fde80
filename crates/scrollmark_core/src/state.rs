use std::time::Instant;

use url::Url;

use crate::chord::{ChordKind, ChordRecognizer, ChordState, Intent, KeyEvent};
use crate::view_model::{MarkRowView, PageViewModel};
use crate::{MarkSet, Position, Settings, Slot};

/// State of one page view: the chord recognizer, the marks and the settings
/// the page was loaded with. One instance per content-script load.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageState {
    url: String,
    page_key: String,
    settings: Settings,
    chords: ChordRecognizer,
    marks: MarkSet,
    dirty: bool,
}

impl PageState {
    pub fn new(url: impl Into<String>, settings: Settings) -> Self {
        let url = url.into();
        let page_key = normalize_page_url(&url);
        Self {
            url,
            page_key,
            settings,
            chords: ChordRecognizer::new(),
            marks: MarkSet::new(),
            dirty: false,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Key under which this page's marks are persisted.
    pub fn page_key(&self) -> &str {
        &self.page_key
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn marks(&self) -> &MarkSet {
        &self.marks
    }

    pub fn chord_state(&self) -> ChordState {
        self.chords.state()
    }

    pub fn armed(&self, now: Instant) -> Option<ChordKind> {
        self.chords.armed(now)
    }

    pub fn view(&self) -> PageViewModel {
        PageViewModel {
            url: self.url.clone(),
            mark_count: self.marks.count(),
            rows: self
                .marks
                .iter()
                .map(|mark| MarkRowView {
                    slot: mark.index,
                    position: mark.position(),
                    has_image: mark.image.is_some(),
                })
                .collect(),
            dirty: self.dirty,
        }
    }

    /// Returns whether the marks changed since the last call and resets the
    /// flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn handle_key(&mut self, event: &KeyEvent, at: Instant) -> Intent {
        self.chords.handle_key(
            event,
            &self.settings.mark_key.keys,
            &self.settings.scroll_key.keys,
            at,
        )
    }

    pub(crate) fn expire_chord(&mut self, now: Instant) -> bool {
        self.chords.expire(now)
    }

    pub(crate) fn set_mark(&mut self, slot: Slot, position: Position) {
        self.marks.set_mark(slot, position);
        self.dirty = true;
    }

    pub(crate) fn attach_image(&mut self, slot: Slot, image: String) -> bool {
        let attached = self.marks.attach_image(slot, image);
        self.dirty |= attached;
        attached
    }

    pub(crate) fn clear_marks(&mut self) {
        self.marks.clear();
        self.dirty = true;
    }

    pub(crate) fn replace_marks(&mut self, marks: MarkSet) {
        self.marks.replace(marks);
        self.dirty = true;
    }

    pub(crate) fn set_settings(&mut self, settings: Settings) {
        self.settings = settings;
    }
}

/// Storage key for a page URL: the URL without its fragment, so in-page
/// anchors share one mark set. Anything that does not parse as an absolute
/// URL is used as is.
pub fn normalize_page_url(raw: &str) -> String {
    let trimmed = raw.trim();
    match Url::parse(trimmed) {
        Ok(mut url) => {
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => trimmed.to_string(),
    }
}
