use scrollmark_core::BadgeView;

use crate::TabId;

/// Toolbar icon of the extension, per tab.
pub trait BadgeSurface: Send + Sync {
    fn render(&self, tab: TabId, view: &BadgeView);
}
