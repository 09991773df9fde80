//! Messages exchanged between the page, the popup and the background
//! coordinator.
//!
//! The extension tells message kinds apart by which fields are present, so
//! both enums are untagged. Variant order matters: serde tries them top to
//! bottom and ignores unknown fields.

use serde::{Deserialize, Serialize};

use crate::mark::{MarkSet, Slot};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
    /// `{ clear_marks: true, url }`, page to background.
    ClearMarks { clear_marks: bool, url: String },
    /// `{ get_first_marks: true, url }`, page to background on load.
    GetFirstMarks { get_first_marks: bool, url: String },
    /// `{ marks, url }`, page to background after marking; asks for a
    /// screenshot. `slot` names the mark the screenshot belongs to.
    PushMarks {
        marks: MarkSet,
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        slot: Option<Slot>,
    },
    /// `{ screenshot: true }`.
    Screenshot { screenshot: bool },
    /// `{ getMarks: true }`, popup to page.
    GetMarks {
        #[serde(rename = "getMarks")]
        get_marks: bool,
    },
    /// `{ mark: slot }`, popup to page.
    Mark { mark: Slot },
    /// `{ scroll: slot }`, popup to page.
    Scroll { scroll: Slot },
}

impl Message {
    pub fn clear_marks(url: impl Into<String>) -> Self {
        Message::ClearMarks {
            clear_marks: true,
            url: url.into(),
        }
    }

    pub fn get_first_marks(url: impl Into<String>) -> Self {
        Message::GetFirstMarks {
            get_first_marks: true,
            url: url.into(),
        }
    }

    pub fn push_marks(marks: MarkSet, url: impl Into<String>, slot: Option<Slot>) -> Self {
        Message::PushMarks {
            marks,
            url: url.into(),
            slot,
        }
    }

    pub fn screenshot() -> Self {
        Message::Screenshot { screenshot: true }
    }

    pub fn get_marks() -> Self {
        Message::GetMarks { get_marks: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reply {
    /// `{ image: dataURI }`.
    Image { image: String },
    /// `{ marks }`; serializes as `{}` when there is nothing to restore.
    Marks {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        marks: Option<MarkSet>,
    },
}
