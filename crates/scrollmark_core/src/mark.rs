use std::fmt;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// Number of mark slots, one per decimal digit.
pub const SLOT_COUNT: usize = 10;

/// A mark slot, `0..=9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(into = "u8")]
pub struct Slot(u8);

impl Slot {
    pub fn new(index: u8) -> Option<Self> {
        (usize::from(index) < SLOT_COUNT).then_some(Self(index))
    }

    /// Slot selected by a digit key, if `key` is one.
    pub fn from_digit(key: char) -> Option<Self> {
        key.to_digit(10).and_then(|d| Self::new(d as u8))
    }

    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    pub fn all() -> impl Iterator<Item = Slot> {
        (0..SLOT_COUNT as u8).map(Slot)
    }
}

impl From<Slot> for u8 {
    fn from(slot: Slot) -> Self {
        slot.0
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// The popup sends slots as one-character strings cut from element ids, the
// content script as numbers. Both are accepted.
impl<'de> Deserialize<'de> for Slot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawSlot {
            Number(u64),
            Text(String),
        }

        let slot = match RawSlot::deserialize(deserializer)? {
            RawSlot::Number(n) => u8::try_from(n).ok().and_then(Slot::new),
            RawSlot::Text(text) => text.trim().parse::<u8>().ok().and_then(Slot::new),
        };
        slot.ok_or_else(|| de::Error::custom("slot must be a digit between 0 and 9"))
    }
}

/// Page scroll offsets.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mark {
    pub index: Slot,
    pub x: f64,
    pub y: f64,
    /// Screenshot as a data URI, attached after capture completes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Mark {
    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

/// Marks of one page view, indexed by slot.
///
/// Serialized as a sparse JSON array (`[null, {...}, ...]`); trailing empty
/// slots are omitted. On the way in, each mark lands at its own `index`
/// regardless of where it sits in the array.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Option<Mark>>", into = "Vec<Option<Mark>>")]
pub struct MarkSet {
    slots: [Option<Mark>; SLOT_COUNT],
}

impl MarkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `position` at `slot`, dropping whatever was there including
    /// its image.
    pub fn set_mark(&mut self, slot: Slot, position: Position) {
        self.slots[slot.index()] = Some(Mark {
            index: slot,
            x: position.x,
            y: position.y,
            image: None,
        });
    }

    /// Attaches a screenshot to the mark at `slot`.
    ///
    /// Returns `false` when the slot is empty. An image captured for an
    /// earlier mark that has since been overwritten is still attached to the
    /// current occupant.
    pub fn attach_image(&mut self, slot: Slot, image: String) -> bool {
        match self.slots[slot.index()].as_mut() {
            Some(mark) => {
                mark.image = Some(image);
                true
            }
            None => false,
        }
    }

    /// Where the viewport should go for `slot`; `None` for an empty slot.
    pub fn scroll_target(&self, slot: Slot) -> Option<Position> {
        self.get(slot).map(Mark::position)
    }

    pub fn get(&self, slot: Slot) -> Option<&Mark> {
        self.slots[slot.index()].as_ref()
    }

    pub fn clear(&mut self) {
        self.slots = Default::default();
    }

    pub fn count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn replace(&mut self, marks: MarkSet) {
        *self = marks;
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mark> {
        self.slots.iter().flatten()
    }

    /// Copy of the set with every image stripped, the form stored in the
    /// per-URL index.
    pub fn without_images(&self) -> MarkSet {
        let mut copy = self.clone();
        for mark in copy.slots.iter_mut().flatten() {
            mark.image = None;
        }
        copy
    }

    /// Attaches cached images to the marks occupying the same slots.
    pub fn merge_images(&mut self, images: &ImageSet) {
        for mark in self.slots.iter_mut().flatten() {
            if let Some(image) = images.get(mark.index) {
                mark.image = Some(image.to_owned());
            }
        }
    }
}

impl From<Vec<Option<Mark>>> for MarkSet {
    fn from(marks: Vec<Option<Mark>>) -> Self {
        let mut set = MarkSet::default();
        for mark in marks.into_iter().flatten() {
            let index = mark.index.index();
            set.slots[index] = Some(mark);
        }
        set
    }
}

impl From<MarkSet> for Vec<Option<Mark>> {
    fn from(set: MarkSet) -> Self {
        let mut marks: Vec<Option<Mark>> = set.slots.into_iter().collect();
        while matches!(marks.last(), Some(None)) {
            marks.pop();
        }
        marks
    }
}

/// Cached screenshots for one URL, one optional data URI per slot.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Option<String>>", into = "Vec<Option<String>>")]
pub struct ImageSet {
    slots: [Option<String>; SLOT_COUNT],
}

impl ImageSet {
    pub fn set(&mut self, slot: Slot, image: String) {
        self.slots[slot.index()] = Some(image);
    }

    pub fn get(&self, slot: Slot) -> Option<&str> {
        self.slots[slot.index()].as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }
}

impl From<Vec<Option<String>>> for ImageSet {
    fn from(images: Vec<Option<String>>) -> Self {
        let mut set = ImageSet::default();
        for (slot, image) in set.slots.iter_mut().zip(images) {
            *slot = image;
        }
        set
    }
}

impl From<ImageSet> for Vec<Option<String>> {
    fn from(set: ImageSet) -> Self {
        set.slots.into_iter().collect()
    }
}
