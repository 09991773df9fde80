use std::time::Instant;

use crate::{KeyEvent, MarkSet, Position, Settings, Slot};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// Content script finished loading on the page.
    PageLoaded,
    /// Key pressed on the page, with the page scroll offsets at that moment.
    KeyPressed {
        event: KeyEvent,
        at: Instant,
        scroll: Position,
    },
    /// Clock tick; expires an armed chord past its deadline.
    Tick { now: Instant },
    /// Popup asked to mark `slot`.
    MarkRequested { slot: Slot, scroll: Position },
    /// Popup asked to scroll to `slot`.
    ScrollRequested { slot: Slot },
    /// Screenshot requested for `slot` came back. `None` when the platform
    /// could not capture.
    ImageCaptured { slot: Slot, image: Option<String> },
    /// User cleared the marks of this page.
    ClearRequested,
    /// Persisted marks for this page arrived from the coordinator.
    MarksRestored(Option<MarkSet>),
    /// Stored settings changed while the page was open.
    SettingsChanged(Settings),
}
