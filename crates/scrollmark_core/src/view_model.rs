use serde::{Deserialize, Serialize};

use crate::{Capabilities, Position, Slot};

/// Toolbar title when no count is shown in it.
pub const DEFAULT_TITLE: &str = "Scrollmark";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageViewModel {
    pub url: String,
    pub mark_count: usize,
    pub rows: Vec<MarkRowView>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkRowView {
    pub slot: Slot,
    pub position: Position,
    pub has_image: bool,
}

/// What the toolbar icon shows for a tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeView {
    /// Badge text; `None` on platforms without badge support, where the
    /// count moves into the title instead.
    pub text: Option<String>,
    pub title: String,
}

impl BadgeView {
    pub fn for_count(count: usize, capabilities: Capabilities) -> Self {
        if capabilities.badge_text {
            let text = if count == 0 {
                String::new()
            } else {
                count.to_string()
            };
            return Self {
                text: Some(text),
                title: DEFAULT_TITLE.to_string(),
            };
        }

        let title = match count {
            0 => DEFAULT_TITLE.to_string(),
            1 => format!("{DEFAULT_TITLE} (1 mark)"),
            n => format!("{DEFAULT_TITLE} ({n} marks)"),
        };
        Self { text: None, title }
    }
}
