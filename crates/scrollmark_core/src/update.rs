use crate::chord::{ChordKind, Intent};
use crate::{Effect, Msg, PageState, Position, Slot};

/// Pure update function: applies a message to page state and returns any
/// effects.
pub fn update(mut state: PageState, msg: Msg) -> (PageState, Vec<Effect>) {
    let effects = match msg {
        Msg::PageLoaded => {
            if state.settings().permanent_marks {
                vec![Effect::LoadPersisted {
                    url: state.page_key().to_string(),
                }]
            } else {
                Vec::new()
            }
        }
        Msg::KeyPressed { event, at, scroll } => match state.handle_key(&event, at) {
            Intent::Select {
                kind: ChordKind::Mark,
                slot,
            } => mark_slot(&mut state, slot, scroll),
            Intent::Select {
                kind: ChordKind::Scroll,
                slot,
            } => scroll_to_slot(&state, slot),
            Intent::Arm(_) | Intent::None => Vec::new(),
        },
        Msg::Tick { now } => {
            state.expire_chord(now);
            Vec::new()
        }
        Msg::MarkRequested { slot, scroll } => mark_slot(&mut state, slot, scroll),
        Msg::ScrollRequested { slot } => scroll_to_slot(&state, slot),
        Msg::ImageCaptured { slot, image } => {
            // Whatever occupies the slot now receives the image, even if it was
            // re-marked while the capture was in flight.
            if let Some(image) = image {
                state.attach_image(slot, image);
            }
            Vec::new()
        }
        Msg::ClearRequested => {
            state.clear_marks();
            vec![
                Effect::ClearPersisted {
                    url: state.page_key().to_string(),
                },
                Effect::MarkCountChanged { count: 0 },
            ]
        }
        Msg::MarksRestored(Some(marks)) => {
            state.replace_marks(marks);
            vec![Effect::MarkCountChanged {
                count: state.marks().count(),
            }]
        }
        Msg::MarksRestored(None) => Vec::new(),
        Msg::SettingsChanged(settings) => {
            state.set_settings(settings);
            Vec::new()
        }
    };

    (state, effects)
}

fn mark_slot(state: &mut PageState, slot: Slot, scroll: Position) -> Vec<Effect> {
    state.set_mark(slot, scroll);
    vec![
        Effect::MarkCountChanged {
            count: state.marks().count(),
        },
        Effect::CaptureScreenshot {
            slot,
            url: state.page_key().to_string(),
            marks: state.marks().clone(),
        },
    ]
}

fn scroll_to_slot(state: &PageState, slot: Slot) -> Vec<Effect> {
    state
        .marks()
        .scroll_target(slot)
        .map(Effect::ScrollTo)
        .into_iter()
        .collect()
}
