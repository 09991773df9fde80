use crate::{MarkSet, Position, Slot};

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Scroll the page viewport.
    ScrollTo(Position),
    /// Push the mark set to the coordinator and request a screenshot for
    /// `slot`.
    CaptureScreenshot {
        slot: Slot,
        url: String,
        marks: MarkSet,
    },
    /// Drop the persisted marks and images of `url`.
    ClearPersisted { url: String },
    /// Ask the coordinator for the persisted marks of `url`.
    LoadPersisted { url: String },
    /// Number of occupied slots changed; the badge needs a refresh.
    MarkCountChanged { count: usize },
}
