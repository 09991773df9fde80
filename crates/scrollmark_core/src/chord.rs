//! Two-phase keyboard chord recognition.
//!
//! A configured modifier chord arms either mark mode or scroll mode; a digit
//! pressed before the deadline selects the slot. Only one mode is armed at a
//! time and re-arming always replaces the previous deadline.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::mark::Slot;

/// How long an armed chord waits for its digit.
pub const DISARM_AFTER: Duration = Duration::from_millis(1000);

/// A configured shortcut.
///
/// Stored settings written by older versions may omit `alt` and `shift`;
/// those read back as `false` so equality against a live key event holds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct KeyChord {
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub alt: bool,
    #[serde(default)]
    pub shift: bool,
    pub key: String,
}

impl KeyChord {
    pub fn ctrl(key: impl Into<String>) -> Self {
        Self {
            ctrl: true,
            alt: false,
            shift: false,
            key: key.into(),
        }
    }

    pub fn matches(&self, event: &KeyEvent) -> bool {
        self.ctrl == event.ctrl
            && self.alt == event.alt
            && self.shift == event.shift
            && self.key == event.key
    }

    /// Control must be held and the key must be exactly one printable
    /// character.
    pub fn is_valid(&self) -> bool {
        self.ctrl && single_char(&self.key).is_some_and(|c| !c.is_control() && !c.is_whitespace())
    }

    /// Human readable form, e.g. `Control + Shift + k`.
    pub fn label(&self) -> String {
        let mut parts = Vec::with_capacity(4);
        if self.ctrl {
            parts.push("Control");
        }
        if self.alt {
            parts.push("Alt");
        }
        if self.shift {
            parts.push("Shift");
        }
        if single_char(&self.key).is_some() {
            parts.push(self.key.as_str());
        }
        parts.join(" + ")
    }
}

/// A key press reported by the page.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KeyEvent {
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub alt: bool,
    #[serde(default)]
    pub shift: bool,
    pub key: String,
}

impl KeyEvent {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn with_alt(mut self) -> Self {
        self.alt = true;
        self
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChordKind {
    Mark,
    Scroll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChordState {
    #[default]
    Idle,
    Armed { kind: ChordKind, deadline: Instant },
}

/// What a key press means once chords are taken into account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    None,
    Arm(ChordKind),
    Select { kind: ChordKind, slot: Slot },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChordRecognizer {
    state: ChordState,
}

impl ChordRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ChordState {
        self.state
    }

    /// Interprets one key press at instant `at`.
    ///
    /// Chord matches are checked before digits, so a chord bound to a digit
    /// key re-arms instead of selecting.
    pub fn handle_key(
        &mut self,
        event: &KeyEvent,
        mark_chord: &KeyChord,
        scroll_chord: &KeyChord,
        at: Instant,
    ) -> Intent {
        let matched = if mark_chord.matches(event) {
            Some(ChordKind::Mark)
        } else if scroll_chord.matches(event) {
            Some(ChordKind::Scroll)
        } else {
            None
        };
        if let Some(kind) = matched {
            self.arm(kind, at);
            return Intent::Arm(kind);
        }

        let Some(slot) = single_char(&event.key).and_then(Slot::from_digit) else {
            return Intent::None;
        };
        match self.armed(at) {
            Some(kind) => {
                self.disarm();
                Intent::Select { kind, slot }
            }
            None => {
                self.expire(at);
                Intent::None
            }
        }
    }

    /// Arms `kind`, replacing any armed chord and its deadline.
    pub fn arm(&mut self, kind: ChordKind, at: Instant) {
        self.state = ChordState::Armed {
            kind,
            deadline: at + DISARM_AFTER,
        };
    }

    pub fn disarm(&mut self) {
        self.state = ChordState::Idle;
    }

    /// The chord armed at `now`, if its deadline has not passed.
    pub fn armed(&self, now: Instant) -> Option<ChordKind> {
        match self.state {
            ChordState::Armed { kind, deadline } if now < deadline => Some(kind),
            _ => None,
        }
    }

    /// Drops an armed chord whose deadline has passed. Returns `true` if
    /// something was disarmed.
    pub fn expire(&mut self, now: Instant) -> bool {
        match self.state {
            ChordState::Armed { deadline, .. } if now >= deadline => {
                self.state = ChordState::Idle;
                true
            }
            _ => false,
        }
    }
}

fn single_char(key: &str) -> Option<char> {
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}
