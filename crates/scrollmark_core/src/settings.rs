use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::chord::KeyChord;
use crate::mark::MarkSet;

/// Storage key of the mark chord binding.
pub const MARK_KEY: &str = "mark_key";
/// Storage key of the scroll chord binding.
pub const SCROLL_KEY: &str = "scroll_key";
/// Storage key of the CSS size used to show captured tabs.
pub const CAPTURED_TAB_SIZE: &str = "captured_tab_size";
/// Storage key of the permanent marks flag.
pub const PERMANENT_MARKS: &str = "permanent_marks";
/// Storage key of the per-URL mark index.
pub const URLS: &str = "urls";

pub const DEFAULT_CAPTURED_TAB_SIZE: &str = "50%";

/// Persisted marks keyed by page URL.
pub type UrlMarkIndex = BTreeMap<String, MarkSet>;

/// A chord together with the label shown in the settings form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChordBinding {
    pub string: String,
    pub keys: KeyChord,
}

impl ChordBinding {
    pub fn new(keys: KeyChord) -> Self {
        Self {
            string: keys.label(),
            keys,
        }
    }

    pub fn default_mark() -> Self {
        Self::new(KeyChord::ctrl(","))
    }

    pub fn default_scroll() -> Self {
        Self::new(KeyChord::ctrl("."))
    }
}

/// User settings visible to the page and the coordinator. The `urls` index
/// is not part of it; only the coordinator reads that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub mark_key: ChordBinding,
    pub scroll_key: ChordBinding,
    pub captured_tab_size: String,
    pub permanent_marks: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mark_key: ChordBinding::default_mark(),
            scroll_key: ChordBinding::default_scroll(),
            captured_tab_size: DEFAULT_CAPTURED_TAB_SIZE.to_string(),
            permanent_marks: false,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        validate_bindings(&self.mark_key, &self.scroll_key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("{name} must hold Control and exactly one printable key, got {label:?}")]
    InvalidChord { name: &'static str, label: String },
    #[error("mark and scroll keys are both bound to {label:?}")]
    DuplicateChords { label: String },
}

/// Checks the rules the settings form enforces before saving.
pub fn validate_bindings(mark: &ChordBinding, scroll: &ChordBinding) -> Result<(), SettingsError> {
    for (name, binding) in [(MARK_KEY, mark), (SCROLL_KEY, scroll)] {
        if !binding.keys.is_valid() {
            return Err(SettingsError::InvalidChord {
                name,
                label: binding.keys.label(),
            });
        }
    }
    if mark.keys == scroll.keys {
        return Err(SettingsError::DuplicateChords {
            label: mark.keys.label(),
        });
    }
    Ok(())
}
