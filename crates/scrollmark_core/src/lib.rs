//! Scrollmark core: page-side state machine, mark store and the shared data
//! model. No IO.
mod chord;
mod effect;
mod mark;
mod msg;
mod platform;
mod protocol;
mod settings;
mod state;
mod update;
mod view_model;

pub use chord::{ChordKind, ChordRecognizer, ChordState, Intent, KeyChord, KeyEvent, DISARM_AFTER};
pub use effect::Effect;
pub use mark::{ImageSet, Mark, MarkSet, Position, Slot, SLOT_COUNT};
pub use msg::Msg;
pub use platform::{Browser, Capabilities};
pub use protocol::{Message, Reply};
pub use settings::{
    validate_bindings, ChordBinding, Settings, SettingsError, UrlMarkIndex, CAPTURED_TAB_SIZE,
    DEFAULT_CAPTURED_TAB_SIZE, MARK_KEY, PERMANENT_MARKS, SCROLL_KEY, URLS,
};
pub use state::{normalize_page_url, PageState};
pub use update::update;
pub use view_model::{BadgeView, MarkRowView, PageViewModel, DEFAULT_TITLE};
