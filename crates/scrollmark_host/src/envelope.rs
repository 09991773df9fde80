use scrollmark_core::{BadgeView, Message, Reply};
use scrollmark_engine::TabId;
use serde::{Deserialize, Serialize};

/// One frame from the browser: the tab it concerns plus the event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostRequest {
    pub tab: TabId,
    #[serde(flatten)]
    pub event: HostEvent,
}

/// Told apart by field presence, like [`Message`]. Tab lifecycle events
/// come first so a request never shadows them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HostEvent {
    TabActivated { tab_activated: bool },
    NavigationCompleted { navigation_completed: String },
    TabRemoved { tab_removed: bool },
    Message(Message),
}

/// One frame to the browser.
///
/// Every request message gets exactly one `Reply` frame, `reply: null`
/// included, so the extension can settle its pending response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HostFrame {
    Badge {
        tab: TabId,
        badge: BadgeView,
    },
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tab: Option<TabId>,
        error: String,
    },
    Reply {
        tab: TabId,
        reply: Option<Reply>,
    },
}

impl HostFrame {
    pub fn tab(&self) -> Option<TabId> {
        match self {
            HostFrame::Badge { tab, .. } | HostFrame::Reply { tab, .. } => Some(*tab),
            HostFrame::Error { tab, .. } => *tab,
        }
    }
}
